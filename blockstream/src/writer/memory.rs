use super::{BlockItemWriter, no_open_block};
use parking_lot::Mutex;
use std::{io, sync::Arc};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryBlock {
    pub number: u64,
    pub items: Vec<Vec<u8>>,
}

/// Keeps closed blocks in memory. Clones share the closed blocks, so a clone kept aside observes what the
/// writer handed to the block stream produced.
#[derive(Clone, Default)]
pub struct MemoryBlockItemWriter {
    closed: Arc<Mutex<Vec<MemoryBlock>>>,
    current: Option<MemoryBlock>,
    remaining_writes: Option<usize>,
}

impl MemoryBlockItemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer failing every item write after the first `writes` succeeded
    pub fn failing_after(writes: usize) -> Self {
        Self { remaining_writes: Some(writes), ..Default::default() }
    }

    pub fn closed_blocks(&self) -> Vec<MemoryBlock> {
        self.closed.lock().clone()
    }

    pub fn last_closed(&self) -> Option<MemoryBlock> {
        self.closed.lock().last().cloned()
    }
}

impl BlockItemWriter for MemoryBlockItemWriter {
    fn open_block(&mut self, number: u64) -> io::Result<()> {
        if let Some(open) = &self.current {
            return Err(io::Error::other(format!("block {} is still open", open.number)));
        }
        self.current = Some(MemoryBlock { number, items: Vec::new() });
        Ok(())
    }

    fn write_item(&mut self, bytes: &[u8]) -> io::Result<()> {
        let block = self.current.as_mut().ok_or_else(no_open_block)?;
        if let Some(remaining) = self.remaining_writes.as_mut() {
            if *remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "memory writer is out of writes"));
            }
            *remaining -= 1;
        }
        block.items.push(bytes.to_vec());
        Ok(())
    }

    fn close_block(&mut self) -> io::Result<()> {
        let block = self.current.take().ok_or_else(no_open_block)?;
        self.closed.lock().push(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_writer() {
        let mut writer = MemoryBlockItemWriter::new();
        let observer = writer.clone();
        writer.open_block(0).unwrap();
        writer.write_item(b"a").unwrap();
        assert!(observer.closed_blocks().is_empty());
        writer.close_block().unwrap();
        assert_eq!(observer.last_closed(), Some(MemoryBlock { number: 0, items: vec![b"a".to_vec()] }));

        let mut failing = MemoryBlockItemWriter::failing_after(1);
        failing.open_block(3).unwrap();
        failing.write_item(b"ok").unwrap();
        assert_eq!(failing.write_item(b"fails").unwrap_err().kind(), io::ErrorKind::WriteZero);
    }
}
