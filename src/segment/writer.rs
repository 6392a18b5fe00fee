//! Segment Writer
//!
//! Append path for the tail segment.
//!
//! ## Commit protocol
//! 1. Entry frames are staged in `commit_buf`, the rolling CRC-32C follows
//!    every staged byte
//! 2. If the batch would push the file past `size_limit`, an index frame
//!    holding every entry offset is staged and the segment seals
//! 3. A commit frame carrying the CRC closes the batch
//! 4. One positional write, one fsync, then `commit_idx` is published
//!
//! Any failure before the fsync returns restores the pre-append snapshot, so
//! readers never see a batch that is not durable.

use std::sync::Arc;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::error::{Result, WalError};
use crate::types::{BufferPool, LogEntry, PooledBuffer, SegmentInfo};
use crate::vfs::{write_full, WritableFile};

use super::frame::{
    index_frame_size, write_frame, FrameHeader, FrameType, FRAME_HEADER_LEN, MAX_ENTRY_SIZE,
};
use super::header::FileHeader;
use super::offsets::{OffsetTable, TailState};
use super::reader::SegmentReader;

/// Writer state rebuilt by tail recovery
#[derive(Debug, Default)]
pub(crate) struct RecoveredTail {
    pub offsets: Vec<u32>,
    pub write_offset: u32,
    pub index_start: u64,
}

/// Everything `append` may need to put back on failure
struct Snapshot {
    commit_buf_len: usize,
    crc: u32,
    write_offset: u32,
    offsets: Arc<OffsetTable>,
    index_start: u64,
}

/// Exclusive writer for the tail segment
pub struct SegmentWriter {
    info: SegmentInfo,
    file: Arc<dyn WritableFile>,
    tail: Arc<TailState>,
    reader: SegmentReader,

    /// Frames staged for the next commit
    commit_buf: BytesMut,
    /// CRC-32C of every byte written since the last commit frame
    crc: u32,
    /// File offset `commit_buf` lands at
    write_offset: u32,
    /// Non-zero once sealed
    index_start: u64,
    closed: bool,
}

impl SegmentWriter {
    /// Writer for a brand new file. The file header is staged so it lands
    /// with, and is covered by the CRC of, the first commit.
    pub(crate) fn create(
        info: SegmentInfo,
        file: Arc<dyn WritableFile>,
        pool: Arc<BufferPool>,
    ) -> Self {
        let mut writer = Self::resume(info, file, pool, RecoveredTail::default());
        writer.stage_file_header();
        writer
    }

    /// Writer continuing after the last verified commit of an existing file
    pub(crate) fn resume(
        info: SegmentInfo,
        file: Arc<dyn WritableFile>,
        pool: Arc<BufferPool>,
        state: RecoveredTail,
    ) -> Self {
        let commit_idx = if state.offsets.is_empty() {
            0
        } else {
            info.base_index + state.offsets.len() as u64 - 1
        };
        let tail = Arc::new(TailState::new(
            commit_idx,
            OffsetTable::from_offsets(&state.offsets),
        ));
        let reader = SegmentReader::tail(
            info.clone(),
            Arc::clone(&file).into_readable(),
            pool,
            Arc::clone(&tail),
        );

        Self {
            info,
            file,
            tail,
            reader,
            commit_buf: BytesMut::new(),
            crc: 0,
            write_offset: state.write_offset,
            index_start: state.index_start,
            closed: false,
        }
    }

    fn stage_file_header(&mut self) {
        let header = FileHeader::from_info(&self.info).to_bytes();
        self.commit_buf.extend_from_slice(&header);
        self.crc = crc32c::crc32c_append(self.crc, &header);
    }

    // =========================================================================
    // Append
    // =========================================================================

    /// Durably append a batch of entries.
    ///
    /// Entry indexes must continue exactly from the last appended one. On
    /// return the batch is fsynced and visible to readers. An empty batch
    /// is a no-op.
    pub fn append(&mut self, entries: &[LogEntry]) -> Result<()> {
        self.check_writable()?;
        if entries.is_empty() {
            return Ok(());
        }
        for entry in entries {
            if entry.data.len() > MAX_ENTRY_SIZE {
                return Err(WalError::TooBig {
                    size: entry.data.len(),
                    max: MAX_ENTRY_SIZE,
                });
            }
        }
        self.commit_batch(entries, false)
    }

    /// Seal the segment now, with no further entries. Returns the offset of
    /// the on-disk index. Calling it again returns the same offset.
    pub fn force_seal(&mut self) -> Result<u64> {
        if self.closed {
            return Err(WalError::Closed);
        }
        if self.index_start > 0 {
            return Ok(self.index_start);
        }
        self.commit_batch(&[], true)?;
        Ok(self.index_start)
    }

    fn commit_batch(&mut self, entries: &[LogEntry], force_seal: bool) -> Result<()> {
        let snapshot = self.snapshot();
        match self.stage_and_flush(entries, force_seal) {
            Ok(()) => {
                self.write_offset += self.commit_buf.len() as u32;
                self.commit_buf.clear();
                self.crc = 0;
                if let Some(last) = entries.last() {
                    self.tail.set_commit_idx(last.index);
                }
                trace!(
                    segment_id = self.info.id,
                    entries = entries.len(),
                    write_offset = self.write_offset,
                    "committed batch"
                );
                if self.index_start > 0 {
                    debug!(
                        segment_id = self.info.id,
                        base_index = self.info.base_index,
                        last_index = self.last_index(),
                        index_start = self.index_start,
                        "sealed segment"
                    );
                }
                Ok(())
            }
            Err(e) => {
                self.restore(snapshot);
                Err(e)
            }
        }
    }

    fn stage_and_flush(&mut self, entries: &[LogEntry], force_seal: bool) -> Result<()> {
        let mut offsets = self.tail.offsets();

        // Step 1: Stage entry frames
        for entry in entries {
            let expected = self.info.base_index + offsets.len() as u64;
            if entry.index != expected {
                return Err(WalError::InvalidArgument(format!(
                    "entry index {} is not the next index {}",
                    entry.index, expected
                )));
            }
            let frame_offset = self.pending_end()?;
            self.stage_frame(&FrameHeader::entry(entry.data.len() as u32), &entry.data)?;
            offsets = Arc::new(offsets.push(frame_offset));
        }

        // Step 2: Publish; readers still stop at commit_idx
        self.tail.publish(Arc::clone(&offsets));

        // Step 3: Seal when this commit would overrun the size limit
        let projected = self.write_offset as u64
            + self.commit_buf.len() as u64
            + index_frame_size(offsets.len()) as u64;
        if force_seal || projected > u64::from(self.info.size_limit) {
            self.stage_index(&offsets)?;
        }

        // Step 4: Close the batch with its checksum
        let commit = FrameHeader::commit(self.crc);
        self.stage_frame(&commit, &[])?;
        self.pending_end()?;

        // Step 5: Write and make durable
        write_full(self.file.as_ref(), &self.commit_buf, u64::from(self.write_offset))?;
        self.file.sync()?;
        Ok(())
    }

    fn stage_index(&mut self, offsets: &OffsetTable) -> Result<()> {
        let frame_offset = self.pending_end()?;
        let mut payload = Vec::with_capacity(offsets.len() * 4);
        for offset in offsets.to_vec() {
            payload.extend_from_slice(&offset.to_le_bytes());
        }
        self.stage_frame(&FrameHeader::index(payload.len() as u32), &payload)?;
        self.index_start = u64::from(frame_offset) + FRAME_HEADER_LEN as u64;
        Ok(())
    }

    /// Encode a frame onto `commit_buf`. Only entry and index frames are
    /// covered by the CRC; commit frames end its coverage.
    fn stage_frame(&mut self, header: &FrameHeader, payload: &[u8]) -> Result<()> {
        let start = self.commit_buf.len();
        self.commit_buf.resize(start + header.encoded_size(), 0);
        write_frame(&mut self.commit_buf[start..], header, payload)?;
        if header.typ != FrameType::Commit {
            self.crc = crc32c::crc32c_append(self.crc, &self.commit_buf[start..]);
        }
        Ok(())
    }

    /// File offset of the next staged byte. Every frame must end within
    /// `u32` range so `write_offset` and the offset table never wrap.
    fn pending_end(&self) -> Result<u32> {
        let end = u64::from(self.write_offset) + self.commit_buf.len() as u64;
        u32::try_from(end).map_err(|_| {
            WalError::InvalidArgument(format!("segment {} exceeds 4 GiB", self.info.id))
        })
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            commit_buf_len: self.commit_buf.len(),
            crc: self.crc,
            write_offset: self.write_offset,
            offsets: self.tail.offsets(),
            index_start: self.index_start,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.commit_buf.truncate(snapshot.commit_buf_len);
        self.crc = snapshot.crc;
        self.write_offset = snapshot.write_offset;
        self.tail.publish(snapshot.offsets);
        self.index_start = snapshot.index_start;
    }

    fn check_writable(&self) -> Result<()> {
        if self.closed {
            return Err(WalError::Closed);
        }
        if self.index_start > 0 {
            return Err(WalError::Sealed);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// `(sealed, index_start)`
    pub fn sealed(&self) -> (bool, u64) {
        (self.index_start > 0, self.index_start)
    }

    /// Highest committed index, 0 before the first commit
    pub fn last_index(&self) -> u64 {
        self.tail.commit_idx()
    }

    /// Read a committed entry from this segment
    pub fn get_log(&self, idx: u64) -> Result<PooledBuffer> {
        self.reader.get_log(idx)
    }

    /// Reader handle that can be shared with other threads while this
    /// writer keeps appending
    pub fn reader(&self) -> SegmentReader {
        self.reader.clone()
    }

    pub fn info(&self) -> &SegmentInfo {
        &self.info
    }

    /// File offset where the next commit will be written
    pub fn write_offset(&self) -> u64 {
        u64::from(self.write_offset) + self.commit_buf.len() as u64
    }

    /// fsync the file again. Nothing is staged between appends, so this
    /// never changes what is durable.
    pub fn sync(&self) -> Result<()> {
        if self.closed {
            return Err(WalError::Closed);
        }
        self.file.sync()?;
        Ok(())
    }

    /// Close the file. Readers handed out by `reader()` stop serving too.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader.mark_closed();
        self.file.close()?;
        Ok(())
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("id", &self.info.id)
            .field("base_index", &self.info.base_index)
            .field("last_index", &self.last_index())
            .field("write_offset", &self.write_offset)
            .field("index_start", &self.index_start)
            .finish()
    }
}
