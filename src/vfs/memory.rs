//! In-memory VFS
//!
//! Files live in a map keyed by path. Intended for tests: it can fail the
//! next N writes or syncs and exposes raw bytes so torn writes and bit rot
//! can be simulated without touching a disk.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ReadableFile, Vfs, WritableFile};

#[derive(Debug, Default)]
struct Faults {
    fail_writes: AtomicUsize,
    fail_syncs: AtomicUsize,
    syncs: AtomicUsize,
}

impl Faults {
    /// Consume one pending failure from `counter`, if any
    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory filesystem with fault injection
#[derive(Debug, Default, Clone)]
pub struct MemVfs {
    files: Arc<RwLock<HashMap<PathBuf, FileData>>>,
    faults: Arc<Faults>,
}

type FileData = Arc<RwLock<Vec<u8>>>;

/// An open handle onto bytes held in memory. Handles opened separately share
/// the bytes but are closed independently.
#[derive(Debug)]
pub struct MemFile {
    data: FileData,
    faults: Arc<Faults>,
    closed: AtomicBool,
}

impl MemFile {
    fn check_open(&self) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::Other, "file closed"));
        }
        Ok(())
    }
}

impl ReadableFile for MemFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.check_open()?;
        let data = self.data.read();
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl WritableFile for MemFile {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.check_open()?;
        if Faults::take(&self.faults.fail_writes) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        let mut data = self.data.write();
        let offset = offset as usize;
        let end = offset + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.check_open()?;
        if Faults::take(&self.faults.fail_syncs) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync failure"));
        }
        self.faults.syncs.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn into_readable(self: Arc<Self>) -> Arc<dyn ReadableFile> {
        self
    }
}

impl MemVfs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, dir: &Path, name: &str) -> io::Result<FileData> {
        self.files
            .read()
            .get(&dir.join(name))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name)))
    }

    fn handle(&self, data: FileData) -> Arc<MemFile> {
        Arc::new(MemFile {
            data,
            faults: Arc::clone(&self.faults),
            closed: AtomicBool::new(false),
        })
    }

    // -------------------------------------------------------------------------
    // Fault Injection
    // -------------------------------------------------------------------------

    /// Fail the next `n` calls to `write_at` on any file
    pub fn fail_next_writes(&self, n: usize) {
        self.faults.fail_writes.store(n, Ordering::Release);
    }

    /// Fail the next `n` calls to `sync` on any file
    pub fn fail_next_syncs(&self, n: usize) {
        self.faults.fail_syncs.store(n, Ordering::Release);
    }

    /// Number of successful file syncs so far
    pub fn sync_count(&self) -> usize {
        self.faults.syncs.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------------
    // Raw Access
    // -------------------------------------------------------------------------

    /// Current bytes of a file
    pub fn contents(&self, dir: &Path, name: &str) -> Option<Vec<u8>> {
        let data = self.lookup(dir, name).ok()?;
        let bytes = data.read().clone();
        Some(bytes)
    }

    /// Overwrite bytes at `offset`, growing the file if needed
    pub fn corrupt(&self, dir: &Path, name: &str, offset: usize, bytes: &[u8]) -> io::Result<()> {
        let data = self.lookup(dir, name)?;
        let mut data = data.write();
        let end = offset + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Cut a file down to `len` bytes
    pub fn truncate(&self, dir: &Path, name: &str, len: usize) -> io::Result<()> {
        self.lookup(dir, name)?.write().truncate(len);
        Ok(())
    }
}

impl Vfs for MemVfs {
    fn create(&self, dir: &Path, name: &str, preallocate: u64) -> io::Result<Arc<dyn WritableFile>> {
        let path = dir.join(name);
        let mut files = self.files.write();
        if files.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", name),
            ));
        }
        let data: FileData = Arc::new(RwLock::new(vec![0u8; preallocate as usize]));
        files.insert(path, Arc::clone(&data));
        Ok(self.handle(data))
    }

    fn open_writer(&self, dir: &Path, name: &str) -> io::Result<Arc<dyn WritableFile>> {
        let data = self.lookup(dir, name)?;
        Ok(self.handle(data))
    }

    fn open_reader(&self, dir: &Path, name: &str) -> io::Result<Arc<dyn ReadableFile>> {
        let data = self.lookup(dir, name)?;
        Ok(self.handle(data))
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let files = self.files.read();
        let mut names: Vec<String> = files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    fn delete(&self, dir: &Path, name: &str) -> io::Result<()> {
        match self.files.write().remove(&dir.join(name)) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", name),
            )),
        }
    }

    fn create_dir_all(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }

    fn sync_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }
}
