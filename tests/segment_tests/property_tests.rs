//! Property tests for the segment engine
//!
//! Random batches are appended, then the file is cut at an arbitrary point
//! or the bytes after the last commit are replaced. Recovery must land
//! exactly on the last commit that survived.

use proptest::prelude::*;

use segwal::LogEntry;

use crate::common::{info, mem_dir, mem_filer};

fn batches() -> impl Strategy<Value = Vec<Vec<Vec<u8>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..5),
        1..12,
    )
}

/// Bytes that look like a frame header: a known type, zero reserved bytes
fn frame_header() -> impl Strategy<Value = Vec<u8>> {
    (1u8..=3, prop_oneof![0u32..64, any::<u32>()]).prop_map(|(typ, word)| {
        let mut bytes = vec![typ, 0, 0, 0];
        bytes.extend_from_slice(&word.to_le_bytes());
        bytes
    })
}

/// Tail garbage: random bytes, zeros and frame-shaped headers, possibly
/// cut short mid-frame
fn garbage() -> impl Strategy<Value = Vec<u8>> {
    let chunk = prop_oneof![
        prop::collection::vec(any::<u8>(), 0..64),
        (1usize..64).prop_map(|n| vec![0u8; n]),
        frame_header(),
        frame_header(),
    ];
    (prop::collection::vec(chunk, 1..10), any::<prop::sample::Index>()).prop_map(
        |(chunks, cut)| {
            let bytes: Vec<u8> = chunks.concat();
            let keep = cut.index(bytes.len() + 1);
            bytes[..keep].to_vec()
        },
    )
}

/// Turn payload batches into entries numbered from `base`
fn number(batches: &[Vec<Vec<u8>>], base: u64) -> Vec<Vec<LogEntry>> {
    let mut next = base;
    batches
        .iter()
        .map(|batch| {
            batch
                .iter()
                .map(|data| {
                    let e = LogEntry::new(next, data.clone());
                    next += 1;
                    e
                })
                .collect()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_appended_entries_read_back(batches in batches(), base in 1u64..10_000) {
        let (_vfs, filer) = mem_filer();
        let seg = info(1, base, 1024 * 1024);
        let mut writer = filer.create(&seg).unwrap();

        let numbered = number(&batches, base);
        for batch in &numbered {
            writer.append(batch).unwrap();
        }

        for e in numbered.iter().flatten() {
            let buf = writer.get_log(e.index).unwrap();
            prop_assert_eq!(&buf[..], &e.data[..]);
        }
        let total: usize = numbered.iter().map(Vec::len).sum();
        prop_assert_eq!(writer.last_index(), base + total as u64 - 1);
        prop_assert_eq!(writer.write_offset() % 8, 0);
    }

    #[test]
    fn prop_recovery_after_cut(batches in batches(), cut in 0usize..8192) {
        let (vfs, filer) = mem_filer();
        let seg = info(1, 1, 1024 * 1024);
        let mut writer = filer.create(&seg).unwrap();

        // (file offset after the commit, last index it made durable)
        let mut commits = Vec::new();
        for batch in number(&batches, 1) {
            writer.append(&batch).unwrap();
            commits.push((writer.write_offset(), writer.last_index()));
        }
        writer.close().unwrap();

        let file_end = commits.last().map(|c| c.0).unwrap_or(0) as usize;
        let cut = cut.min(file_end);
        vfs.truncate(mem_dir(), &seg.file_name(), cut).unwrap();

        let expected = commits
            .iter()
            .filter(|(end, _)| *end as usize <= cut)
            .map(|(_, last)| *last)
            .max()
            .unwrap_or(0);

        let recovered = filer.recover_tail(&seg).unwrap();
        prop_assert_eq!(recovered.last_index(), expected);
        for (i, e) in number(&batches, 1).iter().flatten().enumerate() {
            let idx = i as u64 + 1;
            if idx <= expected {
                let buf = recovered.get_log(idx).unwrap();
                prop_assert_eq!(&buf[..], &e.data[..]);
            } else {
                prop_assert!(recovered.get_log(idx).unwrap_err().is_not_found());
            }
        }
    }

    #[test]
    fn prop_sealed_segment_reopens(sizes in prop::collection::vec(0usize..400, 1..60)) {
        let (_vfs, filer) = mem_filer();
        let seg = info(1, 1, 2048);
        let mut writer = filer.create(&seg).unwrap();

        let mut written = Vec::new();
        for (i, size) in sizes.iter().enumerate() {
            let data = vec![(i % 256) as u8; *size];
            writer.append(&[LogEntry::new(i as u64 + 1, data.clone())]).unwrap();
            written.push(data);
            if writer.sealed().0 {
                break;
            }
        }
        let index_start = writer.force_seal().unwrap();
        let sealed = seg.sealed_at(writer.last_index(), index_start);
        writer.close().unwrap();

        let reader = filer.open(&sealed).unwrap();
        prop_assert_eq!(reader.last_index(), written.len() as u64);
        for (i, data) in written.iter().enumerate() {
            let buf = reader.get_log(i as u64 + 1).unwrap();
            prop_assert_eq!(&buf[..], &data[..]);
        }
    }

    #[test]
    fn prop_recovery_ignores_tail_garbage(batches in batches(), junk in garbage()) {
        let (vfs, filer) = mem_filer();
        let seg = info(1, 1, 1024 * 1024);
        let mut writer = filer.create(&seg).unwrap();

        let numbered = number(&batches, 1);
        for batch in &numbered {
            writer.append(batch).unwrap();
        }
        let last_index = writer.last_index();
        let offset = writer.write_offset();
        writer.close().unwrap();

        vfs.corrupt(mem_dir(), &seg.file_name(), offset as usize, &junk).unwrap();

        let mut recovered = filer.recover_tail(&seg).unwrap();
        prop_assert_eq!(recovered.last_index(), last_index);
        for e in numbered.iter().flatten() {
            let buf = recovered.get_log(e.index).unwrap();
            prop_assert_eq!(&buf[..], &e.data[..]);
        }
        prop_assert!(recovered.get_log(last_index + 1).unwrap_err().is_not_found());

        // The garbage is overwritten by the next append and never resurfaces
        recovered.append(&[LogEntry::new(last_index + 1, b"next".to_vec())]).unwrap();
        recovered.close().unwrap();
        let again = filer.recover_tail(&seg).unwrap();
        prop_assert_eq!(again.last_index(), last_index + 1);
        prop_assert_eq!(&again.get_log(last_index + 1).unwrap()[..], b"next");
    }
}
