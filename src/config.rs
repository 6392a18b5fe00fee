//! Configuration for segwal
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::types::SegmentInfo;

/// Default soft size limit of a segment file (64 MiB)
pub const DEFAULT_SEGMENT_SIZE: u32 = 64 * 1024 * 1024;

/// Main configuration for a segment directory
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {dir}/
    ///     ├── 00000000000000000001-0000000000000001.wal
    ///     └── 00000000000000004097-0000000000000002.wal
    pub dir: PathBuf,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    /// Size limit given to segments created through `new_segment`
    pub segment_size: u32,

    /// Codec tag written into new segments
    pub codec: u64,

    /// Ask the VFS to zero-fill `size_limit` bytes when creating a segment
    pub preallocate: bool,

    /// fsync the directory after creating or deleting a segment file
    pub sync_dir: bool,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Number of 64 KiB read buffers kept in the shared free-list
    pub read_pool_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./wal"),
            segment_size: DEFAULT_SEGMENT_SIZE,
            codec: 1,
            preallocate: true,
            sync_dir: true,
            read_pool_capacity: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Describe a fresh, unsealed segment using this config's size and codec
    pub fn new_segment(&self, id: u64, base_index: u64) -> SegmentInfo {
        SegmentInfo::new(id, base_index, self.segment_size).with_codec(self.codec)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the segment directory
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dir = path.into();
        self
    }

    /// Set the default segment size limit (in bytes)
    pub fn segment_size(mut self, size: u32) -> Self {
        self.config.segment_size = size;
        self
    }

    /// Set the codec tag for new segments
    pub fn codec(mut self, codec: u64) -> Self {
        self.config.codec = codec;
        self
    }

    /// Enable or disable preallocation on create
    pub fn preallocate(mut self, enabled: bool) -> Self {
        self.config.preallocate = enabled;
        self
    }

    /// Enable or disable directory fsync after create/delete
    pub fn sync_dir(mut self, enabled: bool) -> Self {
        self.config.sync_dir = enabled;
        self
    }

    /// Set how many read buffers the pool retains
    pub fn read_pool_capacity(mut self, count: usize) -> Self {
        self.config.read_pool_capacity = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
