//! Reading back and verifying a produced block stream.

use crate::{
    errors::{BlockStreamError, BlockStreamResult},
    model::{BlockItem, BlockItemKind, BlockStreamInfo, TreeKind, block_hash, items::BlockHeader},
    processes::running_hashes::RunningHashWindow,
    writer::parse_block_file_name,
};
use blockstream_core::debug;
use blockstream_hashes::{HASH_SIZE, Hash, ZERO_HASH};
use blockstream_merkle::{NaiveStreamingTreeHasher, leaf_hash};
use flate2::read::GzDecoder;
use itertools::Itertools;
use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

/// A block whose content was checked against its own roots and against the block before it
#[derive(Clone, Debug)]
pub struct VerifiedBlock {
    pub header: BlockHeader,
    pub items: Vec<BlockItem>,
    pub input_root: Hash,
    pub output_root: Hash,
    pub block_hash: Hash,
    /// The info captured by the closing state changes item
    pub info: BlockStreamInfo,
}

impl VerifiedBlock {
    pub fn number(&self) -> u64 {
        self.header.number
    }
}

/// Verifies consecutive blocks, given as the raw items the writer received
#[derive(Default)]
pub struct BlockStreamVerifier {
    previous: Option<(u64, Hash)>,
    // Unknown until a block starting from genesis or a fully verified block was seen
    running: Option<RunningHashWindow>,
}

impl BlockStreamVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify(&mut self, number: u64, frames: &[Vec<u8>]) -> BlockStreamResult<VerifiedBlock> {
        let fail = |reason: String| BlockStreamError::Verification { number, reason };

        let items = frames.iter().map(|frame| BlockItem::from_bytes(frame)).collect::<BlockStreamResult<Vec<_>>>()?;
        let header = match items.first() {
            Some(BlockItem::Header(header)) => header.clone(),
            _ => return Err(fail("the first item is not a block header".to_string())),
        };
        if header.number != number {
            return Err(fail(format!("header carries block number {}", header.number)));
        }
        match self.previous {
            Some((previous_number, previous_hash)) => {
                if number != previous_number + 1 {
                    return Err(fail(format!("follows block {previous_number}")));
                }
                if header.previous_block_hash != previous_hash {
                    return Err(fail(format!("previous block hash {} differs from {}", header.previous_block_hash, previous_hash)));
                }
            }
            None if number == 0 => {
                if header.previous_block_hash != ZERO_HASH {
                    return Err(fail("genesis block has a non zero previous block hash".to_string()));
                }
                self.running = Some(RunningHashWindow::new());
            }
            None => {}
        }

        let mut input = NaiveStreamingTreeHasher::new();
        let mut output = NaiveStreamingTreeHasher::new();
        let mut info = None;
        for (position, (item, frame)) in items.iter().zip(frames).enumerate() {
            if position > 0 && item.kind() == BlockItemKind::Header {
                return Err(fail(format!("a second header found at position {position}")));
            }
            if let BlockItem::StateChanges(changes) = item {
                if let Some(captured) = BlockStreamInfo::from_state_changes(changes)? {
                    if position + 1 != items.len() {
                        return Err(fail("block info is captured before the last item".to_string()));
                    }
                    info = Some(captured);
                }
            }
            match item.kind().tree() {
                Some(TreeKind::Input) => input.add_leaf_hash(leaf_hash(frame))?,
                Some(TreeKind::Output) => output.add_leaf_hash(leaf_hash(frame))?,
                None => {}
            }
            if item.kind() == BlockItemKind::TransactionResult {
                if let Some(window) = self.running.as_mut() {
                    window.push(frame);
                }
            }
        }
        let info = info.ok_or_else(|| fail("the block does not end with its block info".to_string()))?;
        if info.last_block_number != number || info.last_block_hash != header.previous_block_hash {
            return Err(fail(format!(
                "captured block info refers to block {} with hash {}",
                info.last_block_number, info.last_block_hash
            )));
        }
        if number > 0 && info.trailing_block_hashes.len() >= HASH_SIZE {
            let latest = &info.trailing_block_hashes[info.trailing_block_hashes.len() - HASH_SIZE..];
            if latest != header.previous_block_hash.as_slice() {
                return Err(fail("trailing block hashes do not end with the previous block hash".to_string()));
            }
        }
        match &self.running {
            Some(window) if window.latest_hashes() != info.running_hashes => {
                return Err(fail("running hashes differ from the captured block info".to_string()));
            }
            Some(_) => {}
            None => self.running = Some(RunningHashWindow::from_bytes(&info.running_hashes)?),
        }

        let input_root = input.finalize()?;
        let output_root = output.finalize()?;
        let hash = block_hash(&header.previous_block_hash, &input_root, &output_root);
        self.previous = Some((number, hash));
        Ok(VerifiedBlock { header, items, input_root, output_root, block_hash: hash, info })
    }
}

/// Reads the block files of a directory, plain or gzipped, in block number order
pub struct BlockStreamReader {
    dir: PathBuf,
}

impl BlockStreamReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Block files sorted by block number. Files not named after a block are ignored.
    pub fn block_files(&self) -> BlockStreamResult<Vec<(u64, PathBuf, bool)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some((number, compressed)) = name.to_str().and_then(parse_block_file_name) {
                files.push((number, entry.path(), compressed));
            }
        }
        files.sort_by_key(|(number, _, _)| *number);
        if let Some(((number, _, _), _)) = files.iter().tuple_windows().find(|((a, _, _), (b, _, _))| a == b) {
            return Err(BlockStreamError::Verification { number: *number, reason: "found in more than one file".to_string() });
        }
        Ok(files)
    }

    /// The framed items of a single block file
    pub fn read_block(path: &Path, compressed: bool) -> BlockStreamResult<Vec<Vec<u8>>> {
        let mut file = BufReader::new(File::open(path)?);
        let mut bytes = Vec::new();
        if compressed {
            GzDecoder::new(file).read_to_end(&mut bytes)?;
        } else {
            file.read_to_end(&mut bytes)?;
        }
        decode_frames(&bytes).ok_or_else(|| BlockStreamError::Serialization(format!("truncated item frame in {}", path.display())))
    }

    /// Reads and verifies every block of the directory
    pub fn verify_all(&self) -> BlockStreamResult<Vec<VerifiedBlock>> {
        let mut verifier = BlockStreamVerifier::new();
        let mut blocks = Vec::new();
        for (number, path, compressed) in self.block_files()? {
            let frames = Self::read_block(&path, compressed)?;
            blocks.push(verifier.verify(number, &frames)?);
        }
        debug!("Verified {} blocks under {}", blocks.len(), self.dir.display());
        Ok(blocks)
    }
}

fn decode_frames(mut bytes: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let (len, rest) = bytes.split_first_chunk::<4>()?;
        let len = u32::from_le_bytes(*len) as usize;
        if rest.len() < len {
            return None;
        }
        let (frame, rest) = rest.split_at(len);
        frames.push(frame.to_vec());
        bytes = rest;
    }
    Some(frames)
}
