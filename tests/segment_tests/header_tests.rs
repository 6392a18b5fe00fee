//! Tests for the segment file header

use segwal::segment::{FileHeader, FILE_HEADER_LEN};
use segwal::{SegmentInfo, WalError};

fn sample_info() -> SegmentInfo {
    SegmentInfo::new(0xABCD, 4097, 1024).with_codec(7)
}

#[test]
fn test_header_layout() {
    let bytes = FileHeader::from_info(&sample_info()).to_bytes();

    assert_eq!(bytes.len(), FILE_HEADER_LEN);
    assert_eq!(&bytes[0..4], &[0x0D, 0x6B, 0xEB, 0x58]);
    assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
    assert_eq!(&bytes[8..16], &4097u64.to_le_bytes());
    assert_eq!(&bytes[16..24], &0xABCDu64.to_le_bytes());
    assert_eq!(&bytes[24..32], &7u64.to_le_bytes());
}

#[test]
fn test_header_decode_and_validate() {
    let info = sample_info();
    let bytes = FileHeader::from_info(&info).to_bytes();

    let header = FileHeader::decode(&bytes).unwrap();
    assert_eq!(header.base_index, 4097);
    assert_eq!(header.id, 0xABCD);
    assert_eq!(header.codec, 7);
    header.validate(&info).unwrap();
}

#[test]
fn test_header_mismatch_is_corrupt() {
    let header = FileHeader::from_info(&sample_info());

    let other_id = SegmentInfo::new(0xABCE, 4097, 1024).with_codec(7);
    assert!(header.validate(&other_id).unwrap_err().is_corrupt());

    let other_base = SegmentInfo::new(0xABCD, 1, 1024).with_codec(7);
    assert!(header.validate(&other_base).unwrap_err().is_corrupt());

    let other_codec = SegmentInfo::new(0xABCD, 4097, 1024).with_codec(8);
    assert!(header.validate(&other_codec).unwrap_err().is_corrupt());
}

#[test]
fn test_header_bad_magic() {
    let mut bytes = FileHeader::from_info(&sample_info()).to_bytes();
    bytes[0] ^= 0xFF;
    assert!(FileHeader::decode(&bytes).unwrap_err().is_corrupt());
}

#[test]
fn test_header_unknown_version() {
    let mut bytes = FileHeader::from_info(&sample_info()).to_bytes();
    bytes[7] = 1;
    assert!(FileHeader::decode(&bytes).unwrap_err().is_corrupt());
}

#[test]
fn test_header_short_buffer() {
    let bytes = FileHeader::from_info(&sample_info()).to_bytes();
    assert!(matches!(
        FileHeader::decode(&bytes[..31]),
        Err(WalError::ShortBuffer)
    ));
    let mut small = [0u8; 16];
    assert!(matches!(
        FileHeader::from_info(&sample_info()).encode(&mut small),
        Err(WalError::ShortBuffer)
    ));
}
