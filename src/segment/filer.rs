//! Segment Filer
//!
//! Owns the directory namespace: maps segment identities to file names and
//! hands out writers and readers.
//!
//! ## Responsibilities
//! - Create new tail segments (preallocated when configured)
//! - Recover the tail segment after a restart
//! - Open sealed segments for reading through their on-disk index
//! - List and delete segment files
//! - Dump committed entries for debugging
//!
//! ## Naming
//! `{base_index:020}-{id:016x}.wal`: the zero-padded base index makes a plain
//! lexicographic listing come back in base index order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{Result, WalError};
use crate::types::{segment_file_name, BufferPool, LogEntry, SegmentInfo};
use crate::vfs::{read_full, OsVfs, ReadableFile, Vfs};

use super::frame::{read_header, FrameType, FRAME_HEADER_LEN};
use super::header::{FileHeader, FILE_HEADER_LEN};
use super::reader::SegmentReader;
use super::recovery::recover_tail;
use super::scan::FrameScanner;
use super::writer::SegmentWriter;

const SEGMENT_SUFFIX: &str = ".wal";

/// Manages the segment files of one directory
pub struct Filer {
    config: Config,
    vfs: Arc<dyn Vfs>,
    pool: Arc<BufferPool>,
}

impl Filer {
    /// Filer over `config.dir` using the given VFS
    pub fn new(config: Config, vfs: Arc<dyn Vfs>) -> Self {
        let pool = BufferPool::new(config.read_pool_capacity);
        Self { config, vfs, pool }
    }

    /// Filer over a local directory, created if missing
    pub fn open_dir(config: Config) -> Result<Self> {
        let vfs = OsVfs::new();
        vfs.create_dir_all(&config.dir)?;
        Ok(Self::new(config, Arc::new(vfs)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read buffer pool shared by every reader this filer opens
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    // =========================================================================
    // Segment Lifecycle
    // =========================================================================

    /// Create the file for a new tail segment and return its writer.
    ///
    /// Nothing but the preallocation reaches the disk until the first append,
    /// which writes the file header along with the first commit.
    pub fn create(&self, info: &SegmentInfo) -> Result<SegmentWriter> {
        validate_info(info)?;
        let name = info.file_name();
        let preallocate = if self.config.preallocate {
            u64::from(info.size_limit)
        } else {
            0
        };

        let file = self.vfs.create(&self.config.dir, &name, preallocate)?;
        if self.config.sync_dir {
            self.vfs.sync_dir(&self.config.dir)?;
        }

        debug!(
            segment_id = info.id,
            base_index = info.base_index,
            size_limit = info.size_limit,
            file = %name,
            "created segment"
        );
        Ok(SegmentWriter::create(info.clone(), file, Arc::clone(&self.pool)))
    }

    /// Reopen the unsealed tail segment, discarding any torn commit
    pub fn recover_tail(&self, info: &SegmentInfo) -> Result<SegmentWriter> {
        validate_info(info)?;
        let file = self.vfs.open_writer(&self.config.dir, &info.file_name())?;
        recover_tail(info.clone(), file, Arc::clone(&self.pool))
    }

    /// Open a sealed segment for reading
    pub fn open(&self, info: &SegmentInfo) -> Result<SegmentReader> {
        validate_info(info)?;
        if !info.is_sealed() {
            return Err(WalError::InvalidArgument(format!(
                "segment {:#x} is not sealed",
                info.id
            )));
        }

        let file = self.vfs.open_reader(&self.config.dir, &info.file_name())?;
        read_file_header(file.as_ref())?.validate(info)?;

        // Index frame header sits just before the offset array
        if info.index_start < (FILE_HEADER_LEN + FRAME_HEADER_LEN) as u64 {
            return Err(WalError::Corrupt(format!(
                "index start {} inside the file header",
                info.index_start
            )));
        }
        let mut buf = [0u8; FRAME_HEADER_LEN];
        let frame_offset = info.index_start - FRAME_HEADER_LEN as u64;
        let n = read_full(file.as_ref(), &mut buf, frame_offset)?;
        let header = read_header(&buf[..n]).map_err(WalError::surface)?;
        if header.typ != FrameType::Index {
            return Err(WalError::Corrupt(format!(
                "expected index frame at offset {}, found {:?}",
                frame_offset, header.typ
            )));
        }
        let count = u64::from(header.len / 4);

        debug!(
            segment_id = info.id,
            base_index = info.base_index,
            entries = count,
            "opened sealed segment"
        );
        Ok(SegmentReader::sealed(
            info.clone(),
            file,
            Arc::clone(&self.pool),
            info.index_start,
            count,
        ))
    }

    /// Segment files present in the directory, as `id -> base_index`
    pub fn list(&self) -> Result<BTreeMap<u64, u64>> {
        let mut segments = BTreeMap::new();
        for name in self.vfs.list_dir(&self.config.dir)? {
            if !name.ends_with(SEGMENT_SUFFIX) {
                continue;
            }
            let (base_index, id) = parse_segment_name(&name)?;
            if segments.insert(id, base_index).is_some() {
                return Err(WalError::Corrupt(format!(
                    "segment id {:#x} appears more than once",
                    id
                )));
            }
        }
        Ok(segments)
    }

    /// Remove a segment file
    pub fn delete(&self, base_index: u64, id: u64) -> Result<()> {
        let name = segment_file_name(base_index, id);
        self.vfs.delete(&self.config.dir, &name)?;
        if self.config.sync_dir {
            self.vfs.sync_dir(&self.config.dir)?;
        }
        debug!(segment_id = id, base_index, file = %name, "deleted segment");
        Ok(())
    }

    // =========================================================================
    // Dump
    // =========================================================================

    /// Deliver committed entries of one segment with `after < index < before`
    /// (a bound of 0 is ignored). Entries are only handed out once their
    /// commit frame has been read; `f` returns `false` to stop early.
    pub fn dump_segment<F>(
        &self,
        base_index: u64,
        id: u64,
        after: u64,
        before: u64,
        mut f: F,
    ) -> Result<()>
    where
        F: FnMut(&SegmentInfo, LogEntry) -> Result<bool>,
    {
        self.dump_one(base_index, id, after, before, &mut f)?;
        Ok(())
    }

    /// Dump every segment in base index order, with the same bounds and
    /// callback contract as `dump_segment`
    pub fn dump_logs<F>(&self, after: u64, before: u64, mut f: F) -> Result<()>
    where
        F: FnMut(&SegmentInfo, LogEntry) -> Result<bool>,
    {
        let mut segments: Vec<(u64, u64)> = self
            .list()?
            .into_iter()
            .map(|(id, base_index)| (base_index, id))
            .collect();
        segments.sort_unstable();

        for (i, &(base_index, id)) in segments.iter().enumerate() {
            if before > 0 && base_index >= before {
                break;
            }
            // Every entry here precedes the next segment's base
            if let Some(&(next_base, _)) = segments.get(i + 1) {
                if after > 0 && next_base <= after.saturating_add(1) {
                    continue;
                }
            }
            if !self.dump_one(base_index, id, after, before, &mut f)? {
                break;
            }
        }
        Ok(())
    }

    /// Returns `false` once the scan should stop across segments too
    fn dump_one<F>(
        &self,
        base_index: u64,
        id: u64,
        after: u64,
        before: u64,
        f: &mut F,
    ) -> Result<bool>
    where
        F: FnMut(&SegmentInfo, LogEntry) -> Result<bool>,
    {
        let file = self
            .vfs
            .open_reader(&self.config.dir, &segment_file_name(base_index, id))?;

        // Created but never committed
        let mut raw = [0u8; FILE_HEADER_LEN];
        let n = read_full(file.as_ref(), &mut raw, 0)?;
        if raw[..n].iter().all(|b| *b == 0) {
            return Ok(true);
        }

        let header = read_file_header(file.as_ref())?;
        let info = SegmentInfo::new(id, base_index, 0).with_codec(header.codec);
        header.validate(&info)?;

        let mut scanner = FrameScanner::new(file.as_ref());
        let mut pending: Vec<(u64, u64, u32)> = Vec::new();
        let mut next_index = base_index;

        loop {
            let (offset, frame) = match scanner.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) | Err(_) => break,
            };
            match frame.typ {
                FrameType::Entry => {
                    pending.push((next_index, offset, frame.len));
                    next_index += 1;
                }
                FrameType::Index => {}
                FrameType::Commit => {
                    for (index, offset, len) in pending.drain(..) {
                        if after > 0 && index <= after {
                            continue;
                        }
                        if before > 0 && index >= before {
                            return Ok(false);
                        }
                        let Some(data) = scanner.payload(offset, len)? else {
                            return Ok(true);
                        };
                        if !f(&info, LogEntry::new(index, data))? {
                            return Ok(false);
                        }
                    }
                }
                FrameType::Invalid => break,
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for Filer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filer")
            .field("dir", &self.config.dir)
            .field("pool", &self.pool)
            .finish()
    }
}

fn validate_info(info: &SegmentInfo) -> Result<()> {
    if info.base_index == 0 {
        return Err(WalError::InvalidArgument(
            "segment base index must be greater than zero".to_string(),
        ));
    }
    if info.min_index < info.base_index {
        return Err(WalError::InvalidArgument(format!(
            "min index {} below base index {}",
            info.min_index, info.base_index
        )));
    }
    Ok(())
}

fn read_file_header(file: &dyn ReadableFile) -> Result<FileHeader> {
    let mut buf = [0u8; FILE_HEADER_LEN];
    let n = read_full(file, &mut buf, 0)?;
    FileHeader::decode(&buf[..n]).map_err(WalError::surface)
}

/// Parse `{base_index:020}-{id:016x}.wal`
fn parse_segment_name(name: &str) -> Result<(u64, u64)> {
    let malformed = || WalError::Corrupt(format!("malformed segment file name {:?}", name));

    let stem = name.strip_suffix(SEGMENT_SUFFIX).ok_or_else(malformed)?;
    let (base, id) = stem.split_once('-').ok_or_else(malformed)?;
    if base.len() != 20 || !base.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    if id.len() != 16 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    let base_index = base.parse::<u64>().map_err(|_| malformed())?;
    let id = u64::from_str_radix(id, 16).map_err(|_| malformed())?;
    Ok((base_index, id))
}
