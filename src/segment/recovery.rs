//! Tail Recovery
//!
//! Rebuilds writer state for the unsealed tail segment after a restart.
//!
//! ## Algorithm
//! 1. Decode the file header, but only validate it once a commit is trusted;
//!    a crash before the first commit may leave it torn
//! 2. Walk frames forward. At every commit frame, check its CRC over the
//!    bytes since the previous commit; the first mismatch ends the scan
//! 3. Resume after the last verified commit, or start the file over when
//!    there is none
//!
//! Frames after the accepted commit are never truncated on disk; they are
//! unreachable through the offset table and the next append overwrites them.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Result, WalError};
use crate::types::{BufferPool, SegmentInfo};
use crate::vfs::{read_full, ReadableFile, WritableFile};

use super::frame::{FrameType, FRAME_HEADER_LEN, MAX_ENTRY_SIZE};
use super::header::{FileHeader, FILE_HEADER_LEN};
use super::scan::{checksum_range, FrameScanner};
use super::writer::{RecoveredTail, SegmentWriter};

/// A verified commit frame
#[derive(Debug, Clone, Copy)]
struct CommitRecord {
    /// Offset of the commit frame header
    offset: u64,
    /// Entry frames seen up to this commit
    num_entries: usize,
    /// Index array offset if this commit sealed the segment
    index_start: Option<u64>,
}

impl CommitRecord {
    fn end(&self) -> u64 {
        self.offset + FRAME_HEADER_LEN as u64
    }
}

/// Everything learned from one forward pass
#[derive(Debug, Default)]
struct ScanResult {
    offsets: Vec<u32>,
    /// Last commit whose CRC matched
    last: Option<CommitRecord>,
    /// Offset of a commit frame that failed its CRC, if the scan hit one
    torn_at: Option<u64>,
    /// Offset just past the last well-formed frame
    scanned_to: u64,
}

fn scan(file: &dyn ReadableFile) -> Result<ScanResult> {
    let mut result = ScanResult {
        scanned_to: FILE_HEADER_LEN as u64,
        ..ScanResult::default()
    };
    let mut scanner = FrameScanner::new(file);
    let mut pending_index = None;

    loop {
        let (offset, header) = match scanner.next_frame() {
            Ok(Some(frame)) => frame,
            // End of data, torn header or garbage: nothing durable past here
            Ok(None) | Err(_) => break,
        };
        if offset > u64::from(u32::MAX) {
            break;
        }

        match header.typ {
            FrameType::Entry => {
                if header.len as usize > MAX_ENTRY_SIZE {
                    break;
                }
                result.offsets.push(offset as u32);
            }
            FrameType::Index => {
                pending_index = Some(offset + FRAME_HEADER_LEN as u64);
            }
            FrameType::Commit => {
                let crc_start = result.last.map(|c| c.end()).unwrap_or(0);
                if checksum_range(file, crc_start, offset)? != Some(header.crc) {
                    result.torn_at = Some(offset);
                    break;
                }
                result.last = Some(CommitRecord {
                    offset,
                    num_entries: result.offsets.len(),
                    index_start: pending_index.take(),
                });
            }
            FrameType::Invalid => break,
        }
        result.scanned_to = offset + header.encoded_size() as u64;

        // Nothing is ever written after a sealing commit
        if matches!(result.last, Some(CommitRecord { index_start: Some(_), .. })) {
            break;
        }
    }
    Ok(result)
}

/// Recover the writer for the tail segment described by `info`
pub(crate) fn recover_tail(
    info: SegmentInfo,
    file: Arc<dyn WritableFile>,
    pool: Arc<BufferPool>,
) -> Result<SegmentWriter> {
    let readable = Arc::clone(&file).into_readable();

    let mut header_buf = [0u8; FILE_HEADER_LEN];
    let header_len = read_full(readable.as_ref(), &mut header_buf, 0)?;
    let header = FileHeader::decode(&header_buf[..header_len]);

    let scanned = scan(readable.as_ref())?;
    if let Some(torn_at) = scanned.torn_at {
        warn!(
            segment_id = info.id,
            commit_offset = torn_at,
            rolled_back_to = scanned.last.map(|c| c.offset),
            "commit failed checksum, discarding torn batch"
        );
    }

    // Step 1: Nothing committed, start the file over
    let Some(commit) = scanned.last else {
        if scanned.scanned_to > FILE_HEADER_LEN as u64 {
            warn!(
                segment_id = info.id,
                scanned_to = scanned.scanned_to,
                "no verified commit in tail segment, reinitializing"
            );
        }
        info!(segment_id = info.id, base_index = info.base_index, "recovered empty tail segment");
        return Ok(SegmentWriter::create(info, file, pool));
    };

    // Step 2: Committed data exists, so the header must be ours
    header.map_err(WalError::surface)?.validate(&info)?;

    let mut offsets = scanned.offsets;
    offsets.truncate(commit.num_entries);
    if scanned.scanned_to > commit.end() {
        warn!(
            segment_id = info.id,
            uncommitted_bytes = scanned.scanned_to - commit.end(),
            "ignoring frames written after the last commit"
        );
    }

    let state = RecoveredTail {
        write_offset: commit.end() as u32,
        index_start: commit.index_start.unwrap_or(0),
        offsets,
    };
    info!(
        segment_id = info.id,
        base_index = info.base_index,
        entries = state.offsets.len(),
        write_offset = state.write_offset,
        sealed = state.index_start > 0,
        "recovered tail segment"
    );
    Ok(SegmentWriter::resume(info, file, pool, state))
}
