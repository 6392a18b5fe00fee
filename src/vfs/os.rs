//! OS VFS
//!
//! `std::fs` backed files with positional I/O.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ReadableFile, Vfs, WritableFile};

/// Files on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsVfs;

impl OsVfs {
    pub fn new() -> Self {
        Self
    }
}

/// A single open file shared by the writer and readers. `close` drops the
/// descriptor even while other handles to this `OsFile` are alive; any
/// later call fails.
#[derive(Debug)]
pub struct OsFile {
    file: RwLock<Option<File>>,
}

impl OsFile {
    fn new(file: File) -> Self {
        Self {
            file: RwLock::new(Some(file)),
        }
    }

    fn with_file<T>(&self, f: impl FnOnce(&File) -> io::Result<T>) -> io::Result<T> {
        match self.file.read().as_ref() {
            Some(file) => f(file),
            None => Err(io::Error::new(io::ErrorKind::Other, "file closed")),
        }
    }
}

impl ReadableFile for OsFile {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.with_file(|file| file.read_at(buf, offset))
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.with_file(|file| file.seek_read(buf, offset))
    }

    fn close(&self) -> io::Result<()> {
        self.file.write().take();
        Ok(())
    }
}

impl WritableFile for OsFile {
    #[cfg(unix)]
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.with_file(|file| file.write_at(buf, offset))
    }

    #[cfg(windows)]
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.with_file(|file| file.seek_write(buf, offset))
    }

    fn sync(&self) -> io::Result<()> {
        self.with_file(|file| file.sync_all())
    }

    fn into_readable(self: Arc<Self>) -> Arc<dyn ReadableFile> {
        self
    }
}

impl Vfs for OsVfs {
    fn create(&self, dir: &Path, name: &str, preallocate: u64) -> io::Result<Arc<dyn WritableFile>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(dir.join(name))?;

        // Sparse zero fill; recovery treats trailing zeros as end of data
        if preallocate > 0 {
            file.set_len(preallocate)?;
        }
        file.sync_all()?;

        Ok(Arc::new(OsFile::new(file)))
    }

    fn open_writer(&self, dir: &Path, name: &str) -> io::Result<Arc<dyn WritableFile>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.join(name))?;
        Ok(Arc::new(OsFile::new(file)))
    }

    fn open_reader(&self, dir: &Path, name: &str) -> io::Result<Arc<dyn ReadableFile>> {
        let file = File::open(dir.join(name))?;
        Ok(Arc::new(OsFile::new(file)))
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, dir: &Path, name: &str) -> io::Result<()> {
        fs::remove_file(dir.join(name))
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    #[cfg(unix)]
    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        File::open(dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }
}
