//! Frame codec
//!
//! Every byte after the file header belongs to a frame:
//!
//! ```text
//! ┌──────────┬──────────────┬──────────────────────┬───────────┬─────────┐
//! │ Type (1) │ Reserved (3) │ Len / CRC-32C (4)    │ Payload   │ Padding │
//! └──────────┴──────────────┴──────────────────────┴───────────┴─────────┘
//! ```
//!
//! Payloads are zero padded to the next multiple of 8 so every frame header
//! starts on an 8-byte boundary. Commit frames carry the rolling CRC in the
//! length slot and have no body.

use crate::error::{Result, WalError};

/// Size of a frame header
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload an entry frame may carry (64 MiB)
pub const MAX_ENTRY_SIZE: usize = 64 * 1024 * 1024;

/// Kind of frame, stored in the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Zeroed bytes: nothing was written here
    Invalid = 0,
    Entry = 1,
    Index = 2,
    Commit = 3,
}

impl FrameType {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(FrameType::Invalid),
            1 => Ok(FrameType::Entry),
            2 => Ok(FrameType::Index),
            3 => Ok(FrameType::Commit),
            other => Err(WalError::Corrupt(format!("unknown frame type {}", other))),
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub typ: FrameType,
    /// Payload length for entry and index frames, 0 otherwise
    pub len: u32,
    /// Rolling checksum for commit frames, 0 otherwise
    pub crc: u32,
}

impl FrameHeader {
    pub fn entry(len: u32) -> Self {
        Self { typ: FrameType::Entry, len, crc: 0 }
    }

    pub fn index(len: u32) -> Self {
        Self { typ: FrameType::Index, len, crc: 0 }
    }

    pub fn commit(crc: u32) -> Self {
        Self { typ: FrameType::Commit, len: 0, crc }
    }

    /// Bytes this frame occupies on disk, header and padding included
    pub fn encoded_size(&self) -> usize {
        match self.typ {
            FrameType::Entry | FrameType::Index => encoded_frame_size(self.len as usize),
            FrameType::Commit | FrameType::Invalid => FRAME_HEADER_LEN,
        }
    }
}

/// Zero bytes needed after `n` payload bytes to reach 8-byte alignment
pub fn padding(n: usize) -> usize {
    (8 - n % 8) & 7
}

/// Header + payload + padding
pub fn encoded_frame_size(n: usize) -> usize {
    FRAME_HEADER_LEN + n + padding(n)
}

/// On-disk size of the index frame for a segment holding `num_entries`
pub fn index_frame_size(num_entries: usize) -> usize {
    encoded_frame_size(num_entries * 4)
}

/// Encode just the 8 header bytes
pub fn encode_header(buf: &mut [u8], header: &FrameHeader) -> Result<()> {
    if buf.len() < FRAME_HEADER_LEN {
        return Err(WalError::ShortBuffer);
    }
    buf[0] = header.typ as u8;
    buf[1..4].fill(0);
    let word = match header.typ {
        FrameType::Commit => header.crc,
        _ => header.len,
    };
    buf[4..8].copy_from_slice(&word.to_le_bytes());
    Ok(())
}

/// Encode a whole frame into `buf`. Returns the number of bytes written.
pub fn write_frame(buf: &mut [u8], header: &FrameHeader, payload: &[u8]) -> Result<usize> {
    let size = header.encoded_size();
    let has_body = matches!(header.typ, FrameType::Entry | FrameType::Index);
    if has_body && payload.len() != header.len as usize {
        return Err(WalError::InvalidArgument(format!(
            "frame length {} does not match payload of {} bytes",
            header.len,
            payload.len()
        )));
    }
    if buf.len() < size {
        return Err(WalError::ShortBuffer);
    }
    encode_header(buf, header)?;
    if has_body {
        let end = FRAME_HEADER_LEN + payload.len();
        buf[FRAME_HEADER_LEN..end].copy_from_slice(payload);
        buf[end..size].fill(0);
    }
    Ok(size)
}

/// Decode a frame header. An all-zero type byte yields an `Invalid` frame
/// rather than an error so scanners can spot the end of written data.
pub fn read_header(buf: &[u8]) -> Result<FrameHeader> {
    if buf.len() < FRAME_HEADER_LEN {
        return Err(WalError::ShortBuffer);
    }
    let typ = FrameType::from_byte(buf[0])?;
    if typ == FrameType::Invalid {
        return Ok(FrameHeader { typ, len: 0, crc: 0 });
    }
    if buf[1..4] != [0, 0, 0] {
        return Err(WalError::Corrupt("non-zero reserved bytes in frame header".to_string()));
    }
    let word = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    Ok(match typ {
        FrameType::Commit => FrameHeader::commit(word),
        _ => FrameHeader { typ, len: word, crc: 0 },
    })
}
