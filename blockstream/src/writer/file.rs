use super::{BlockItemWriter, no_open_block};
use blockstream_core::trace;
use flate2::{Compression, write::GzEncoder};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

const BLOCK_FILE_EXTENSION: &str = "blk";
const COMPRESSED_BLOCK_FILE_EXTENSION: &str = "blk.gz";
const BLOCK_NUMBER_DIGITS: usize = 36;

pub fn block_file_name(number: u64, compressed: bool) -> String {
    let extension = if compressed { COMPRESSED_BLOCK_FILE_EXTENSION } else { BLOCK_FILE_EXTENSION };
    format!("{:0width$}.{}", number, extension, width = BLOCK_NUMBER_DIGITS)
}

/// Parses a file name produced by [`block_file_name`] into the block number and compression flag
pub fn parse_block_file_name(name: &str) -> Option<(u64, bool)> {
    let (digits, compressed) = match name.strip_suffix(COMPRESSED_BLOCK_FILE_EXTENSION) {
        Some(stem) => (stem.strip_suffix('.')?, true),
        None => (name.strip_suffix(BLOCK_FILE_EXTENSION)?.strip_suffix('.')?, false),
    };
    if digits.len() != BLOCK_NUMBER_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, compressed))
}

enum BlockFile {
    Plain(BufWriter<File>),
    Compressed(GzEncoder<BufWriter<File>>),
}

impl BlockFile {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            BlockFile::Plain(writer) => writer,
            BlockFile::Compressed(encoder) => encoder,
        }
    }

    fn finish(self) -> io::Result<()> {
        let mut writer = match self {
            BlockFile::Plain(writer) => writer,
            BlockFile::Compressed(encoder) => encoder.finish()?,
        };
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

/// Writes every block to its own file under a directory.
///
/// Items are framed by their length as a 4 byte little endian prefix.
pub struct FileBlockItemWriter {
    dir: PathBuf,
    compress: bool,
    current: Option<(u64, BlockFile)>,
}

impl FileBlockItemWriter {
    /// Creates `dir` if missing
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, compress, current: None })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn block_path(&self, number: u64) -> PathBuf {
        self.dir.join(block_file_name(number, self.compress))
    }
}

impl BlockItemWriter for FileBlockItemWriter {
    fn open_block(&mut self, number: u64) -> io::Result<()> {
        if let Some((open, _)) = &self.current {
            return Err(io::Error::other(format!("block {open} is still open")));
        }
        let path = self.block_path(number);
        trace!("Opening block file {}", path.display());
        let writer = BufWriter::new(File::create(path)?);
        let file = match self.compress {
            true => BlockFile::Compressed(GzEncoder::new(writer, Compression::default())),
            false => BlockFile::Plain(writer),
        };
        self.current = Some((number, file));
        Ok(())
    }

    fn write_item(&mut self, bytes: &[u8]) -> io::Result<()> {
        let (_, file) = self.current.as_mut().ok_or_else(no_open_block)?;
        let len = u32::try_from(bytes.len()).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "block item exceeds 4 GiB"))?;
        let writer = file.writer();
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(bytes)
    }

    fn close_block(&mut self) -> io::Result<()> {
        let (number, file) = self.current.take().ok_or_else(no_open_block)?;
        file.finish()?;
        trace!("Closed block file of block {}", number);
        Ok(())
    }
}
