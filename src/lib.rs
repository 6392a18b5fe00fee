//! # segwal
//!
//! Append-only write-ahead log segments with:
//! - 8-byte aligned frames and CRC-32C protected commits
//! - Crash recovery that discards torn batches
//! - Single-writer/multi-reader access without locks on the read path
//! - Sealed segments indexed on disk for random reads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Caller                              │
//! │          (owns the segment list / metadata store)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Filer                               │
//! │          create / recover_tail / open / list / dump          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  offsets  ┌─────────────┐
//!   │   Writer    │──────────▶│   Reader    │
//!   │  (Append)   │ commitIdx │  (GetLog)   │
//!   └──────┬──────┘           └──────┬──────┘
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────────────────────────────────┐
//!   │                  VFS                    │
//!   └─────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod types;

pub mod vfs;
pub mod segment;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WalError, Result};
pub use config::Config;
pub use types::{LogEntry, PooledBuffer, SegmentInfo};
pub use segment::{Filer, SegmentReader, SegmentWriter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of segwal
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
