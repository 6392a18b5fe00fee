//! File header codec
//!
//! The first 32 bytes of every segment file:
//!
//! ```text
//! ┌───────────┬──────────────┬─────────────┬────────────────┬─────────┬────────────┐
//! │ Magic (4) │ Reserved (3) │ Version (1) │ BaseIndex (8)  │ ID (8)  │ Codec (8)  │
//! └───────────┴──────────────┴─────────────┴────────────────┴─────────┴────────────┘
//! ```

use crate::error::{Result, WalError};
use crate::types::SegmentInfo;

pub const FILE_HEADER_LEN: usize = 32;
pub const MAGIC: u32 = 0x58EB_6B0D;
pub const FORMAT_VERSION: u8 = 0;

/// Identity of the segment instance a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub base_index: u64,
    pub id: u64,
    pub codec: u64,
}

impl FileHeader {
    pub fn from_info(info: &SegmentInfo) -> Self {
        Self {
            base_index: info.base_index,
            id: info.id,
            codec: info.codec,
        }
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < FILE_HEADER_LEN {
            return Err(WalError::ShortBuffer);
        }
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..7].fill(0);
        buf[7] = FORMAT_VERSION;
        buf[8..16].copy_from_slice(&self.base_index.to_le_bytes());
        buf[16..24].copy_from_slice(&self.id.to_le_bytes());
        buf[24..32].copy_from_slice(&self.codec.to_le_bytes());
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0u8; FILE_HEADER_LEN];
        // Fixed size array, cannot be short
        let _ = self.encode(&mut buf);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FILE_HEADER_LEN {
            return Err(WalError::ShortBuffer);
        }
        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != MAGIC {
            return Err(WalError::Corrupt(format!("bad segment magic {:#010x}", magic)));
        }
        if buf[7] != FORMAT_VERSION {
            return Err(WalError::Corrupt(format!(
                "unsupported segment format version {}",
                buf[7]
            )));
        }
        Ok(Self {
            base_index: read_u64(&buf[8..16]),
            id: read_u64(&buf[16..24]),
            codec: read_u64(&buf[24..32]),
        })
    }

    /// Check the file belongs to the segment the caller asked for
    pub fn validate(&self, info: &SegmentInfo) -> Result<()> {
        if self.base_index != info.base_index {
            return Err(WalError::Corrupt(format!(
                "segment header base index {} does not match expected {}",
                self.base_index, info.base_index
            )));
        }
        if self.id != info.id {
            return Err(WalError::Corrupt(format!(
                "segment header id {:#x} does not match expected {:#x}",
                self.id, info.id
            )));
        }
        if self.codec != info.codec {
            return Err(WalError::Corrupt(format!(
                "segment header codec {} does not match expected {}",
                self.codec, info.codec
            )));
        }
        Ok(())
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_le_bytes(word)
}
