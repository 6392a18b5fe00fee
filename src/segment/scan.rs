//! Frame scanner
//!
//! Sequential walk over the frames of a segment file, used by tail recovery
//! and by the debugging dump.

use crate::error::Result;
use crate::vfs::{read_full, ReadableFile};

use super::frame::{read_header, FrameHeader, FrameType, FRAME_HEADER_LEN};
use super::header::FILE_HEADER_LEN;

/// Forward-only iterator over frame headers
pub(crate) struct FrameScanner<'a> {
    file: &'a dyn ReadableFile,
    /// Offset of the next frame header
    offset: u64,
}

impl<'a> FrameScanner<'a> {
    /// Start at the first frame, just after the file header
    pub(crate) fn new(file: &'a dyn ReadableFile) -> Self {
        Self {
            file,
            offset: FILE_HEADER_LEN as u64,
        }
    }

    /// Next frame and its absolute offset.
    ///
    /// Returns `Ok(None)` at end of file, on a torn header and on zeroed
    /// space; `Err` when the header bytes are not a valid frame.
    pub(crate) fn next_frame(&mut self) -> Result<Option<(u64, FrameHeader)>> {
        let mut buf = [0u8; FRAME_HEADER_LEN];
        let n = read_full(self.file, &mut buf, self.offset)?;
        if n < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let header = read_header(&buf)?;
        if header.typ == FrameType::Invalid {
            return Ok(None);
        }

        let at = self.offset;
        self.offset += header.encoded_size() as u64;
        Ok(Some((at, header)))
    }

    /// Read the payload of the frame at `frame_offset`. `None` if the file
    /// ends before the payload does.
    pub(crate) fn payload(&self, frame_offset: u64, len: u32) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; len as usize];
        let n = read_full(self.file, &mut buf, frame_offset + FRAME_HEADER_LEN as u64)?;
        if n < buf.len() {
            return Ok(None);
        }
        Ok(Some(buf))
    }
}

/// CRC-32C of `[start, end)` of the file, or `None` if the range runs past
/// the end of the file.
pub(crate) fn checksum_range(file: &dyn ReadableFile, start: u64, end: u64) -> Result<Option<u32>> {
    const CHUNK: usize = 64 * 1024;

    let mut buf = vec![0u8; CHUNK];
    let mut crc = 0u32;
    let mut pos = start;
    while pos < end {
        let want = ((end - pos) as usize).min(CHUNK);
        let n = read_full(file, &mut buf[..want], pos)?;
        if n < want {
            return Ok(None);
        }
        crc = crc32c::crc32c_append(crc, &buf[..n]);
        pos += n as u64;
    }
    Ok(Some(crc))
}
