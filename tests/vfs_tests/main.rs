//! Tests for the VFS implementations

#[path = "../common/mod.rs"]
mod common;


use std::path::Path;

use segwal::vfs::{read_full, write_full, Vfs, WritableFile};

/// Behaviour every VFS must share
pub fn check_vfs_contract(vfs: &dyn Vfs, dir: &Path) {
    vfs.create_dir_all(dir).unwrap();
    assert!(vfs.list_dir(dir).unwrap().is_empty());

    let file = vfs.create(dir, "a.wal", 64).unwrap();
    write_full(file.as_ref(), b"hello", 8).unwrap();
    file.sync().unwrap();

    // Preallocated bytes read back as zeros
    let mut buf = [0xFFu8; 13];
    assert_eq!(read_full(file.clone().into_readable().as_ref(), &mut buf, 0).unwrap(), 13);
    assert_eq!(&buf[..8], &[0u8; 8]);
    assert_eq!(&buf[8..], b"hello");

    // Reads stop at end of file
    let mut tail = [0u8; 16];
    assert_eq!(read_full(file.clone().into_readable().as_ref(), &mut tail, 60).unwrap(), 4);

    // Another handle sees the same bytes
    let reader = vfs.open_reader(dir, "a.wal").unwrap();
    let mut word = [0u8; 5];
    read_full(reader.as_ref(), &mut word, 8).unwrap();
    assert_eq!(&word, b"hello");

    let err = vfs.create(dir, "a.wal", 0).err().unwrap();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);

    vfs.create(dir, "b.wal", 0).unwrap();
    assert_eq!(vfs.list_dir(dir).unwrap(), vec!["a.wal", "b.wal"]);

    vfs.delete(dir, "a.wal").unwrap();
    assert_eq!(vfs.list_dir(dir).unwrap(), vec!["b.wal"]);
    assert_eq!(
        vfs.delete(dir, "a.wal").unwrap_err().kind(),
        std::io::ErrorKind::NotFound
    );
    assert!(vfs.open_writer(dir, "a.wal").is_err());

    vfs.sync_dir(dir).unwrap();
}
