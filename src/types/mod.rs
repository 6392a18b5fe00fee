//! Shared Types
//!
//! Segment identity, log entries and pooled read buffers.
//!
//! ## Responsibilities
//! - Describe a segment the way the caller's metadata store persists it
//! - Carry opaque entry payloads into the writer
//! - Hand read payloads back without copying out of the read buffer

mod buffer;

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use buffer::{BufferPool, PooledBuffer, READ_BUFFER_SIZE};

/// Identity and bounds of a single segment file.
///
/// The caller owns the list of segments; it creates one of these per segment,
/// updates `max_index`, `index_start` and `seal_time` once the writer reports
/// a seal, and hands it back to `Filer::open` on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Unique segment identifier, never reused
    pub id: u64,

    /// Logical index of the first entry (> 0)
    pub base_index: u64,

    /// Lowest index readable from this segment (>= base_index)
    pub min_index: u64,

    /// Highest index present, 0 while unsealed
    pub max_index: u64,

    /// Opaque tag naming the caller's payload encoding
    pub codec: u64,

    /// Soft size limit in bytes; the segment seals once a commit would pass it
    pub size_limit: u32,

    /// File offset of the on-disk offset array, 0 while unsealed
    pub index_start: u64,

    /// Unix millis when the segment was created
    pub create_time: u64,

    /// Unix millis when the segment was sealed, 0 while unsealed
    pub seal_time: u64,
}

impl SegmentInfo {
    pub fn new(id: u64, base_index: u64, size_limit: u32) -> Self {
        Self {
            id,
            base_index,
            min_index: base_index,
            max_index: 0,
            codec: 0,
            size_limit,
            index_start: 0,
            create_time: now_millis(),
            seal_time: 0,
        }
    }

    pub fn with_codec(mut self, codec: u64) -> Self {
        self.codec = codec;
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.index_start > 0
    }

    /// Copy of this info updated with what the writer reported at seal time
    pub fn sealed_at(&self, max_index: u64, index_start: u64) -> Self {
        Self {
            max_index,
            index_start,
            seal_time: now_millis(),
            ..self.clone()
        }
    }

    /// File name: zero-padded base index first so listings sort by base index
    pub fn file_name(&self) -> String {
        segment_file_name(self.base_index, self.id)
    }
}

/// `{base_index:020}-{id:016x}.wal`
pub fn segment_file_name(base_index: u64, id: u64) -> String {
    format!("{:020}-{:016x}.wal", base_index, id)
}

/// A single log entry. `data` is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub index: u64,
    pub data: Bytes,
}

impl LogEntry {
    pub fn new(index: u64, data: impl Into<Bytes>) -> Self {
        Self {
            index,
            data: data.into(),
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
