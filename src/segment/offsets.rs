//! Published offset table
//!
//! Maps `index - base_index` to the file offset of the entry frame for the
//! segment currently being written.
//!
//! ## Concurrency
//! - The single writer builds new tables and publishes them through an
//!   `ArcSwap`; readers load whichever table is current without locking
//! - A table is a length over a shared backing array. Growing past capacity
//!   allocates and copies; otherwise the writer stores into slots beyond the
//!   published length, which no reader looks at
//! - Readers load `commit_idx` before the table and never return entries
//!   past it, even when the table already covers them

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

const MIN_CAPACITY: usize = 64;

/// Immutable view of the first `len` offsets
#[derive(Debug, Clone)]
pub(crate) struct OffsetTable {
    slots: Arc<[AtomicU32]>,
    len: usize,
}

impl OffsetTable {
    pub(crate) fn from_offsets(offsets: &[u32]) -> Self {
        let capacity = offsets.len().max(MIN_CAPACITY);
        let mut slots: Vec<AtomicU32> = Vec::with_capacity(capacity);
        slots.extend(offsets.iter().map(|&o| AtomicU32::new(o)));
        slots.resize_with(capacity, || AtomicU32::new(0));
        Self {
            slots: Arc::from(slots),
            len: offsets.len(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, pos: usize) -> Option<u32> {
        if pos >= self.len {
            return None;
        }
        Some(self.slots[pos].load(Ordering::Acquire))
    }

    /// A table one longer than `self`, ending in `offset`
    pub(crate) fn push(&self, offset: u32) -> Self {
        if self.len < self.slots.len() {
            self.slots[self.len].store(offset, Ordering::Release);
            return Self {
                slots: Arc::clone(&self.slots),
                len: self.len + 1,
            };
        }

        let capacity = (self.slots.len() * 2).max(MIN_CAPACITY);
        let mut slots: Vec<AtomicU32> = Vec::with_capacity(capacity);
        slots.extend(
            self.slots[..self.len]
                .iter()
                .map(|s| AtomicU32::new(s.load(Ordering::Acquire))),
        );
        slots.push(AtomicU32::new(offset));
        slots.resize_with(capacity, || AtomicU32::new(0));
        Self {
            slots: Arc::from(slots),
            len: self.len + 1,
        }
    }

    pub(crate) fn to_vec(&self) -> Vec<u32> {
        self.slots[..self.len]
            .iter()
            .map(|s| s.load(Ordering::Acquire))
            .collect()
    }
}

/// State the writer publishes to readers of its tail segment
#[derive(Debug)]
pub(crate) struct TailState {
    commit_idx: AtomicU64,
    offsets: ArcSwap<OffsetTable>,
}

impl TailState {
    pub(crate) fn new(commit_idx: u64, offsets: OffsetTable) -> Self {
        Self {
            commit_idx: AtomicU64::new(commit_idx),
            offsets: ArcSwap::from_pointee(offsets),
        }
    }

    pub(crate) fn commit_idx(&self) -> u64 {
        self.commit_idx.load(Ordering::Acquire)
    }

    pub(crate) fn set_commit_idx(&self, idx: u64) {
        self.commit_idx.store(idx, Ordering::Release);
    }

    pub(crate) fn offsets(&self) -> Arc<OffsetTable> {
        self.offsets.load_full()
    }

    pub(crate) fn publish(&self, table: Arc<OffsetTable>) {
        self.offsets.store(table);
    }
}
