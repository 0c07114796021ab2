use crate::errors::{BlockStreamError, BlockStreamResult};
use blockstream_hashes::{HASH_SIZE, Hash};
use std::collections::VecDeque;

/// Hashes of the most recent blocks, oldest first, bounded by `capacity`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailingBlockHashes {
    hashes: VecDeque<Hash>,
    capacity: usize,
}

impl TrailingBlockHashes {
    pub fn new(capacity: usize) -> Self {
        Self { hashes: VecDeque::with_capacity(capacity), capacity }
    }

    /// Loads a persisted window. Hashes beyond `capacity` are dropped from the front.
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> BlockStreamResult<Self> {
        if bytes.len() % HASH_SIZE != 0 {
            return Err(BlockStreamError::CorruptTrailingHashes(bytes.len()));
        }
        let skip = (bytes.len() / HASH_SIZE).saturating_sub(capacity);
        let mut window = Self::new(capacity);
        for chunk in bytes.chunks_exact(HASH_SIZE).skip(skip) {
            window.hashes.push_back(Hash::from_slice(chunk).map_err(|_| BlockStreamError::CorruptTrailingHashes(bytes.len()))?);
        }
        Ok(window)
    }

    /// The hash of block `target` given the window ends right before block `current`
    pub fn hash_of_block(&self, current: u64, target: u64) -> Option<Hash> {
        let distance = current.checked_sub(target)?;
        if distance == 0 || distance > self.hashes.len() as u64 {
            return None;
        }
        self.hashes.get(self.hashes.len() - distance as usize).copied()
    }

    pub fn push(&mut self, hash: Hash) {
        if self.capacity == 0 {
            return;
        }
        if self.hashes.len() == self.capacity {
            self.hashes.pop_front();
        }
        self.hashes.push_back(hash);
    }

    /// The persisted form of the window once `hash` is appended, leaving `self` untouched
    pub fn hashes_after_latest(&self, hash: Hash) -> Vec<u8> {
        let mut next = self.clone();
        next.push(hash);
        next.to_bytes()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.hashes.iter().flat_map(|hash| hash.as_bytes()).collect()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of(number: u64) -> Hash {
        Hash::sha384_of(number.to_le_bytes())
    }

    #[test]
    fn test_window_bounds() {
        let capacity = 4;
        let mut window = TrailingBlockHashes::new(capacity);
        for current in 0..10u64 {
            for target in 0..12u64 {
                let in_window = target < current && current - target <= (current as usize).min(capacity) as u64;
                let expected = in_window.then(|| hash_of(target));
                assert_eq!(window.hash_of_block(current, target), expected, "current {current}, target {target}");
            }
            window.push(hash_of(current));
            assert!(window.len() <= capacity);
        }
    }

    #[test]
    fn test_hashes_after_latest() {
        let mut window = TrailingBlockHashes::new(2);
        assert_eq!(window.hashes_after_latest(hash_of(0)), hash_of(0).as_slice().to_vec());
        assert!(window.is_empty());
        window.push(hash_of(0));
        window.push(hash_of(1));
        let bytes = window.hashes_after_latest(hash_of(2));
        assert_eq!(bytes, [hash_of(1), hash_of(2)].iter().flat_map(|h| h.as_bytes()).collect::<Vec<_>>());
        assert_eq!(TrailingBlockHashes::from_bytes(&bytes, 2).unwrap().hash_of_block(3, 2), Some(hash_of(2)));
    }

    #[test]
    fn test_from_bytes() {
        let bytes = (0..5u64).flat_map(|i| hash_of(i).as_bytes()).collect::<Vec<_>>();
        // A shrunk window keeps the most recent hashes
        let window = TrailingBlockHashes::from_bytes(&bytes, 3).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window.hash_of_block(5, 2), Some(hash_of(2)));
        assert_eq!(window.hash_of_block(5, 1), None);
        assert_eq!(TrailingBlockHashes::from_bytes(&bytes, 8).unwrap().len(), 5);
        assert!(matches!(TrailingBlockHashes::from_bytes(&bytes[1..], 8), Err(BlockStreamError::CorruptTrailingHashes(239))));
    }
}
