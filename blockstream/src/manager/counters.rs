use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ProcessingCounters {
    pub items_submitted: AtomicU64,
    pub items_written: AtomicU64,
    pub input_leaves: AtomicU64,
    pub output_leaves: AtomicU64,
    pub blocks_closed: AtomicU64,
}

impl ProcessingCounters {
    pub fn snapshot(&self) -> ProcessingCountersSnapshot {
        ProcessingCountersSnapshot {
            items_submitted: self.items_submitted.load(Ordering::SeqCst),
            items_written: self.items_written.load(Ordering::SeqCst),
            input_leaves: self.input_leaves.load(Ordering::SeqCst),
            output_leaves: self.output_leaves.load(Ordering::SeqCst),
            blocks_closed: self.blocks_closed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingCountersSnapshot {
    pub items_submitted: u64,
    pub items_written: u64,
    pub input_leaves: u64,
    pub output_leaves: u64,
    pub blocks_closed: u64,
}

impl core::ops::Sub for &ProcessingCountersSnapshot {
    type Output = ProcessingCountersSnapshot;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            items_submitted: self.items_submitted.saturating_sub(rhs.items_submitted),
            items_written: self.items_written.saturating_sub(rhs.items_written),
            input_leaves: self.input_leaves.saturating_sub(rhs.input_leaves),
            output_leaves: self.output_leaves.saturating_sub(rhs.output_leaves),
            blocks_closed: self.blocks_closed.saturating_sub(rhs.blocks_closed),
        }
    }
}
