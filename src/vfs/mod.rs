//! VFS Module
//!
//! The small set of file operations the segment engine needs.
//!
//! ## Responsibilities
//! - Create (optionally preallocated), open, list and delete segment files
//! - Positional reads and writes through a shared `&self` handle, so one file
//!   can serve the writer and any number of concurrent readers
//! - fsync of files and, where supported, of the containing directory
//!
//! Two implementations ship with the crate: `OsVfs` backed by `std::fs`, and
//! `MemVfs`, an in-memory filesystem with fault injection for tests.

mod memory;
mod os;

use std::io;
use std::path::Path;
use std::sync::Arc;

pub use memory::MemVfs;
pub use os::OsVfs;

/// A file that can be read at arbitrary offsets
pub trait ReadableFile: Send + Sync {
    /// Read into `buf` starting at `offset`. Returns the number of bytes read,
    /// 0 at end of file.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    fn close(&self) -> io::Result<()>;
}

/// A file the single segment writer appends to
pub trait WritableFile: ReadableFile {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;

    fn sync(&self) -> io::Result<()>;

    /// View of the same handle for readers
    fn into_readable(self: Arc<Self>) -> Arc<dyn ReadableFile>;
}

/// Directory level operations
pub trait Vfs: Send + Sync {
    /// Create a new file, failing if it already exists. When `preallocate` is
    /// non-zero the file is extended with zeros to that size.
    fn create(&self, dir: &Path, name: &str, preallocate: u64) -> io::Result<Arc<dyn WritableFile>>;

    fn open_writer(&self, dir: &Path, name: &str) -> io::Result<Arc<dyn WritableFile>>;

    fn open_reader(&self, dir: &Path, name: &str) -> io::Result<Arc<dyn ReadableFile>>;

    /// Names of the regular files in `dir`
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>>;

    fn delete(&self, dir: &Path, name: &str) -> io::Result<()>;

    /// Create `dir` and any missing parents
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Make directory entry changes durable. A no-op where unsupported.
    fn sync_dir(&self, dir: &Path) -> io::Result<()>;
}

/// Read until `buf` is full or end of file. Returns bytes read.
pub fn read_full(file: &dyn ReadableFile, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Write all of `buf` at `offset`
pub fn write_full(file: &dyn WritableFile, buf: &[u8], offset: u64) -> io::Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match file.write_at(&buf[written..], offset + written as u64) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
