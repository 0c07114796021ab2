use crate::errors::{BlockStreamError, BlockStreamResult};
use blockstream_core::task::{TaskChain, TaskExecutor};
use blockstream_hashes::{HASH_SIZE, Hash, Hasher, HasherBase, Sha384Hasher, ZERO_HASH};
use bytes::Bytes;

pub const RUNNING_HASH_SLOTS: usize = 4;

/// A window over the 4 most recent values of the running hash chain `h[i] = SHA384(h[i - 1] || item_i)`.
///
/// Slots are ordered oldest first. Slots are only absent while the chain is shorter than the window,
/// in which case the leading ones are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunningHashWindow {
    slots: [Option<Hash>; RUNNING_HASH_SLOTS],
}

impl RunningHashWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a window from its persisted form, see [`RunningHashWindow::latest_hashes`]
    pub fn from_bytes(bytes: &[u8]) -> BlockStreamResult<Self> {
        if bytes.len() % HASH_SIZE != 0 || bytes.len() > RUNNING_HASH_SLOTS * HASH_SIZE {
            return Err(BlockStreamError::CorruptRunningHashes(bytes.len()));
        }
        let mut window = Self::new();
        let offset = RUNNING_HASH_SLOTS - bytes.len() / HASH_SIZE;
        for (slot, chunk) in window.slots[offset..].iter_mut().zip(bytes.chunks_exact(HASH_SIZE)) {
            *slot = Some(Hash::from_slice(chunk).map_err(|_| BlockStreamError::CorruptRunningHashes(bytes.len()))?);
        }
        Ok(window)
    }

    /// Folds the next item into the chain and shifts the window
    pub fn push(&mut self, item: &[u8]) -> Hash {
        let mut hasher = Sha384Hasher::new();
        hasher.update(self.latest().unwrap_or(ZERO_HASH)).update(item);
        let next = hasher.finalize();
        self.slots.rotate_left(1);
        self.slots[RUNNING_HASH_SLOTS - 1] = Some(next);
        next
    }

    /// `h[n]`
    pub fn latest(&self) -> Option<Hash> {
        self.slots[RUNNING_HASH_SLOTS - 1]
    }

    /// `h[n - 3]`, present once 4 items were folded
    pub fn n_minus_3(&self) -> Option<Hash> {
        self.slots[0]
    }

    /// Concatenation of the populated slots, oldest first
    pub fn latest_hashes(&self) -> Vec<u8> {
        self.slots.iter().flatten().flat_map(|hash| hash.as_bytes()).collect()
    }
}

/// Folds items into a [`RunningHashWindow`] on the compute pool, strictly in submission order
pub struct RunningHashChain {
    chain: TaskChain<RunningHashWindow, BlockStreamError>,
}

impl RunningHashChain {
    pub fn new(executor: &TaskExecutor, window: RunningHashWindow) -> Self {
        Self { chain: executor.chain(window) }
    }

    pub fn fold(&mut self, item: Bytes) {
        let executor = self.chain.executor().clone();
        self.chain.then(move |mut window| async move {
            window = executor
                .compute(move || {
                    window.push(&item);
                    window
                })
                .await?;
            Ok::<_, BlockStreamError>(window)
        });
    }

    /// Waits for every folded item. Must not be called from within an asynchronous context.
    pub fn join(&mut self) -> BlockStreamResult<&RunningHashWindow> {
        self.chain.join().map(|window| &*window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockstream_core::task::TaskRuntime;

    fn chained(previous: Hash, item: &[u8]) -> Hash {
        let mut bytes = previous.as_slice().to_vec();
        bytes.extend_from_slice(item);
        Hash::sha384_of(&bytes)
    }

    #[test]
    fn test_window_shifts() {
        let mut window = RunningHashWindow::new();
        assert!(window.latest_hashes().is_empty());
        let h1 = window.push(b"result 1");
        assert_eq!(h1, chained(ZERO_HASH, b"result 1"));
        assert_eq!(window.latest_hashes(), h1.as_slice().to_vec());
        assert_eq!(window.n_minus_3(), None);

        let h2 = window.push(b"result 2");
        let h3 = window.push(b"result 3");
        assert_eq!(h3, chained(h2, b"result 3"));
        assert_eq!(window.n_minus_3(), None);
        let h4 = window.push(b"result 4");
        assert_eq!(window.n_minus_3(), Some(h1));
        let h5 = window.push(b"result 5");
        assert_eq!(window.n_minus_3(), Some(h2));
        assert_eq!(window.latest(), Some(h5));
        assert_eq!(window.latest_hashes(), [h2, h3, h4, h5].iter().flat_map(|h| h.as_bytes()).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_bytes() {
        let mut window = RunningHashWindow::new();
        window.push(b"a");
        window.push(b"b");
        let restored = RunningHashWindow::from_bytes(&window.latest_hashes()).unwrap();
        assert_eq!(restored, window);
        // Both continue the same chain
        assert_eq!(restored.clone().push(b"c"), window.push(b"c"));

        assert_eq!(RunningHashWindow::from_bytes(&[]).unwrap(), RunningHashWindow::new());
        assert!(matches!(RunningHashWindow::from_bytes(&[0; 47]), Err(BlockStreamError::CorruptRunningHashes(47))));
        assert!(matches!(RunningHashWindow::from_bytes(&[0; 5 * HASH_SIZE]), Err(BlockStreamError::CorruptRunningHashes(240))));
    }

    #[test]
    fn test_chain_preserves_order() {
        let runtime = TaskRuntime::new(2, 4).unwrap();
        let executor = runtime.executor();
        let mut expected = RunningHashWindow::new();
        let mut chain = RunningHashChain::new(&executor, RunningHashWindow::new());
        for i in 0..100u32 {
            let item = i.to_le_bytes().repeat(i as usize + 1);
            expected.push(&item);
            chain.fold(Bytes::from(item));
        }
        assert_eq!(chain.join().unwrap(), &expected);
        // Folding resumes after a join
        chain.fold(Bytes::from_static(b"tail"));
        expected.push(b"tail");
        assert_eq!(chain.join().unwrap(), &expected);
    }
}
