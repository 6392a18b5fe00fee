//! Segment Reader
//!
//! Random access to the entries of one segment by logical index.
//!
//! Offsets come either from the tail writer's published table (unsealed
//! segments) or from the index frame written at seal time (sealed segments
//! opened through `Filer::open`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, WalError};
use crate::types::{BufferPool, PooledBuffer, SegmentInfo};
use crate::vfs::{read_full, ReadableFile};

use super::frame::{read_header, FrameType, FRAME_HEADER_LEN, MAX_ENTRY_SIZE};
use super::offsets::TailState;

/// Where entry offsets are looked up
enum OffsetSource {
    /// In-memory table shared with the writer
    Tail(Arc<TailState>),

    /// On-disk offset array starting at `index_start`, `count` entries long
    Sealed { index_start: u64, count: u64 },
}

struct ReaderInner {
    info: SegmentInfo,
    file: Arc<dyn ReadableFile>,
    pool: Arc<BufferPool>,
    source: OffsetSource,
    closed: AtomicBool,
}

/// Cloneable, thread-safe reader over one segment
#[derive(Clone)]
pub struct SegmentReader {
    inner: Arc<ReaderInner>,
}

impl SegmentReader {
    pub(crate) fn tail(
        info: SegmentInfo,
        file: Arc<dyn ReadableFile>,
        pool: Arc<BufferPool>,
        tail: Arc<TailState>,
    ) -> Self {
        Self::with_source(info, file, pool, OffsetSource::Tail(tail))
    }

    pub(crate) fn sealed(
        info: SegmentInfo,
        file: Arc<dyn ReadableFile>,
        pool: Arc<BufferPool>,
        index_start: u64,
        count: u64,
    ) -> Self {
        Self::with_source(info, file, pool, OffsetSource::Sealed { index_start, count })
    }

    fn with_source(
        info: SegmentInfo,
        file: Arc<dyn ReadableFile>,
        pool: Arc<BufferPool>,
        source: OffsetSource,
    ) -> Self {
        Self {
            inner: Arc::new(ReaderInner {
                info,
                file,
                pool,
                source,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn info(&self) -> &SegmentInfo {
        &self.inner.info
    }

    /// Highest index this reader will return, 0 when empty
    pub fn last_index(&self) -> u64 {
        match &self.inner.source {
            OffsetSource::Tail(tail) => tail.commit_idx(),
            OffsetSource::Sealed { count, .. } if *count > 0 => {
                self.inner.info.base_index + count - 1
            }
            OffsetSource::Sealed { .. } => 0,
        }
    }

    /// Payload of the entry at `idx`.
    ///
    /// Returns `NotFound` outside the readable range and `Corrupt` when the
    /// bytes at the recorded offset are not a valid entry frame.
    pub fn get_log(&self, idx: u64) -> Result<PooledBuffer> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(WalError::Closed);
        }

        let info = &self.inner.info;
        if idx < info.base_index || idx < info.min_index {
            return Err(WalError::NotFound);
        }
        if info.max_index > 0 && idx > info.max_index {
            return Err(WalError::NotFound);
        }

        let offset = self.offset_of(idx)?;
        self.read_entry(offset).map_err(WalError::surface)
    }

    /// Stop serving reads. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Tail readers share the writer's handle; the writer closes it
        if let OffsetSource::Sealed { .. } = self.inner.source {
            self.inner.file.close()?;
        }
        Ok(())
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    fn offset_of(&self, idx: u64) -> Result<u64> {
        let pos = idx - self.inner.info.base_index;
        match &self.inner.source {
            OffsetSource::Tail(tail) => {
                // Commit index first; the table may run ahead of it
                if idx > tail.commit_idx() {
                    return Err(WalError::NotFound);
                }
                tail.offsets()
                    .get(pos as usize)
                    .map(u64::from)
                    .ok_or(WalError::NotFound)
            }
            OffsetSource::Sealed { index_start, count } => {
                if pos >= *count {
                    return Err(WalError::NotFound);
                }
                let mut word = [0u8; 4];
                let n = read_full(self.inner.file.as_ref(), &mut word, index_start + 4 * pos)?;
                if n < word.len() {
                    return Err(WalError::Corrupt(format!(
                        "index entry for {} past end of file",
                        idx
                    )));
                }
                Ok(u64::from(u32::from_le_bytes(word)))
            }
        }
    }

    fn read_entry(&self, offset: u64) -> Result<PooledBuffer> {
        let pool = &self.inner.pool;
        let mut buf = pool.get();
        let n = read_full(self.inner.file.as_ref(), &mut buf, offset)?;

        let header = match read_header(&buf[..n]) {
            Ok(header) => header,
            Err(e) => {
                pool.put(buf);
                return Err(e);
            }
        };
        if header.typ != FrameType::Entry {
            pool.put(buf);
            return Err(WalError::Corrupt(format!(
                "expected entry frame at offset {}, found {:?}",
                offset, header.typ
            )));
        }
        let len = header.len as usize;
        if len > MAX_ENTRY_SIZE {
            pool.put(buf);
            return Err(WalError::Corrupt(format!(
                "entry frame at offset {} claims {} bytes",
                offset, len
            )));
        }

        let end = FRAME_HEADER_LEN + len;
        if end <= n {
            return Ok(PooledBuffer::pooled(buf, FRAME_HEADER_LEN, end, Arc::clone(pool)));
        }

        // Larger than one pooled read: fetch exactly the payload
        pool.put(buf);
        let mut payload = vec![0u8; len];
        let got = read_full(
            self.inner.file.as_ref(),
            &mut payload,
            offset + FRAME_HEADER_LEN as u64,
        )?;
        if got < len {
            return Err(WalError::Corrupt(format!(
                "entry frame at offset {} truncated",
                offset
            )));
        }
        Ok(PooledBuffer::owned(payload, 0, len))
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("id", &self.inner.info.id)
            .field("base_index", &self.inner.info.base_index)
            .field("sealed", &matches!(self.inner.source, OffsetSource::Sealed { .. }))
            .finish()
    }
}
