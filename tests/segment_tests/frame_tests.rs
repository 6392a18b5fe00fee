//! Tests for the frame codec
//!
//! These tests verify:
//! - Padding and encoded size arithmetic
//! - Byte layout of entry, index and commit frames
//! - Header decoding, including zeroed and invalid headers

use segwal::segment::frame::{
    encode_header, encoded_frame_size, index_frame_size, padding, read_header, write_frame,
    FrameHeader, FrameType, FRAME_HEADER_LEN,
};
use segwal::WalError;

// =============================================================================
// Size Arithmetic
// =============================================================================

#[test]
fn test_padding_values() {
    assert_eq!(padding(0), 0);
    assert_eq!(padding(1), 7);
    assert_eq!(padding(4), 4);
    assert_eq!(padding(7), 1);
    assert_eq!(padding(8), 0);
    assert_eq!(padding(9), 7);
}

#[test]
fn test_encoded_size_is_aligned_and_minimally_padded() {
    for n in 0..200usize {
        let size = encoded_frame_size(n);
        assert_eq!(size % 8, 0, "size {} for payload {} not aligned", size, n);
        let pad = size - FRAME_HEADER_LEN - n;
        assert!(pad <= 7, "payload {} padded by {}", n, pad);
    }
}

#[test]
fn test_index_frame_size() {
    assert_eq!(index_frame_size(0), 8);
    assert_eq!(index_frame_size(1), 16); // 4 bytes + 4 pad
    assert_eq!(index_frame_size(2), 16);
    assert_eq!(index_frame_size(3), 24);
    assert_eq!(index_frame_size(10), 48);
}

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_write_entry_frame_layout() {
    let mut buf = [0xFFu8; 16];
    let written = write_frame(&mut buf, &FrameHeader::entry(3), b"abc").unwrap();

    assert_eq!(written, 16);
    assert_eq!(buf, [1, 0, 0, 0, 3, 0, 0, 0, b'a', b'b', b'c', 0, 0, 0, 0, 0]);
}

#[test]
fn test_write_commit_frame_layout() {
    let mut buf = [0u8; 8];
    let written = write_frame(&mut buf, &FrameHeader::commit(0xDEADBEEF), &[]).unwrap();

    assert_eq!(written, 8);
    assert_eq!(buf, [3, 0, 0, 0, 0xEF, 0xBE, 0xAD, 0xDE]);
}

#[test]
fn test_write_index_frame_pads_odd_count() {
    let mut payload = Vec::new();
    for offset in [32u32, 48, 64] {
        payload.extend_from_slice(&offset.to_le_bytes());
    }
    let mut buf = vec![0xAAu8; 24];
    write_frame(&mut buf, &FrameHeader::index(12), &payload).unwrap();

    assert_eq!(&buf[..8], &[2, 0, 0, 0, 12, 0, 0, 0]);
    assert_eq!(&buf[8..20], &payload[..]);
    assert_eq!(&buf[20..24], &[0, 0, 0, 0]);
}

#[test]
fn test_write_frame_short_buffer() {
    let mut buf = [0u8; 15];
    let result = write_frame(&mut buf, &FrameHeader::entry(3), b"abc");
    assert!(matches!(result, Err(WalError::ShortBuffer)));

    let mut tiny = [0u8; 4];
    let result = encode_header(&mut tiny, &FrameHeader::commit(1));
    assert!(matches!(result, Err(WalError::ShortBuffer)));
}

#[test]
fn test_write_frame_rejects_length_mismatch() {
    let mut buf = [0u8; 32];
    let result = write_frame(&mut buf, &FrameHeader::entry(5), b"abc");
    assert!(matches!(result, Err(WalError::InvalidArgument(_))));
}

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn test_read_header_round_trip_entry() {
    let mut buf = [0u8; 8];
    encode_header(&mut buf, &FrameHeader::entry(1234)).unwrap();
    let header = read_header(&buf).unwrap();

    assert_eq!(header.typ, FrameType::Entry);
    assert_eq!(header.len, 1234);
    assert_eq!(header.encoded_size(), encoded_frame_size(1234));
}

#[test]
fn test_read_header_commit_carries_crc() {
    let header = read_header(&[3, 0, 0, 0, 0x78, 0x56, 0x34, 0x12]).unwrap();
    assert_eq!(header.typ, FrameType::Commit);
    assert_eq!(header.crc, 0x12345678);
    assert_eq!(header.encoded_size(), 8);
}

#[test]
fn test_read_zeroed_header_is_invalid_frame() {
    let header = read_header(&[0u8; 8]).unwrap();
    assert_eq!(header.typ, FrameType::Invalid);
}

#[test]
fn test_read_unknown_type_is_corrupt() {
    let result = read_header(&[9, 0, 0, 0, 1, 0, 0, 0]);
    assert!(matches!(result, Err(WalError::Corrupt(_))));
}

#[test]
fn test_read_nonzero_reserved_is_corrupt() {
    let result = read_header(&[1, 0, 7, 0, 1, 0, 0, 0]);
    assert!(matches!(result, Err(WalError::Corrupt(_))));
}

#[test]
fn test_read_short_header() {
    let result = read_header(&[1, 0, 0]);
    assert!(matches!(result, Err(WalError::ShortBuffer)));
}
