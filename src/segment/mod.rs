//! Segment Module
//!
//! One append-only segment file at a time: format, append, seal, recovery
//! and indexed reads.
//!
//! ## Responsibilities
//! - Frame and file header codecs
//! - Single writer appending CRC-protected batches with fsync per commit
//! - Many readers served lock-free from the writer's published offsets, or
//!   from the on-disk index once sealed
//! - Tail recovery after torn writes
//! - Directory management and debugging dumps
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ File Header (32)                        │
//! ├─────────────────────────────────────────┤
//! │ Entry Frame                             │
//! │ ┌──────────┬──────────┬───────┬───────┐ │
//! │ │ Type/Rsv │ Len (4)  │ Data  │ Pad   │ │
//! │ └──────────┴──────────┴───────┴───────┘ │
//! │ ... more entry frames                   │
//! ├─────────────────────────────────────────┤
//! │ Commit Frame (CRC-32C)                  │
//! ├─────────────────────────────────────────┤
//! │ ... more batches                        │
//! ├─────────────────────────────────────────┤
//! │ Index Frame (u32 offset per entry)      │  only once sealed
//! ├─────────────────────────────────────────┤
//! │ Commit Frame (CRC-32C)                  │
//! └─────────────────────────────────────────┘
//! ```

pub mod frame;
pub mod header;
mod filer;
mod offsets;
mod reader;
mod recovery;
mod scan;
mod writer;

pub use filer::Filer;
pub use frame::{FrameHeader, FrameType, FRAME_HEADER_LEN, MAX_ENTRY_SIZE};
pub use header::{FileHeader, FILE_HEADER_LEN};
pub use reader::SegmentReader;
pub use writer::SegmentWriter;
