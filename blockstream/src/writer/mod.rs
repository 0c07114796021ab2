//! Durable sinks for the serialized items of each block.

mod file;
mod memory;

use std::io;

pub use file::{FileBlockItemWriter, block_file_name, parse_block_file_name};
pub use memory::{MemoryBlock, MemoryBlockItemWriter};

/// Receives the serialized items of one block at a time, in submission order.
///
/// Writers are append only. A block is durable once `close_block` returns.
pub trait BlockItemWriter: Send + 'static {
    fn open_block(&mut self, number: u64) -> io::Result<()>;

    fn write_item(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn close_block(&mut self) -> io::Result<()>;
}

impl<W: BlockItemWriter + ?Sized> BlockItemWriter for Box<W> {
    fn open_block(&mut self, number: u64) -> io::Result<()> {
        (**self).open_block(number)
    }

    fn write_item(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_item(bytes)
    }

    fn close_block(&mut self) -> io::Result<()> {
        (**self).close_block()
    }
}

pub(crate) fn no_open_block() -> io::Error {
    io::Error::other("no block is open")
}
