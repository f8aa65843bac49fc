use ddda_core::SaveError;
use ddda_core::container::{self, BLOCK_LEN, HEADER_LEN, Header};

const PAYLOAD: &[u8] =
    b"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<class name=\"mSaveData\"/>";

#[test]
fn encode_produces_fixed_size_block() {
    let block = container::encode(PAYLOAD).expect("failed to encode payload");
    assert_eq!(block.len(), BLOCK_LEN);

    let header = Header::parse(&block).expect("failed to parse emitted header");
    assert_eq!(header.version, container::VERSION);
    assert_eq!(header.magic1, container::MAGIC1);
    assert_eq!(header.zero, 0);
    assert_eq!(header.magic2, container::MAGIC2);
    assert_eq!(header.magic3, container::MAGIC3);
    assert_eq!(header.real_size as usize, PAYLOAD.len());

    let data_end = HEADER_LEN + header.compressed_size as usize;
    assert!(block[data_end..].iter().all(|&b| b == 0));
}

#[test]
fn decode_roundtrips_encode() {
    let block = container::encode(PAYLOAD).expect("failed to encode payload");
    let (header, payload) = container::decode(&block).expect("failed to decode block");
    assert_eq!(payload, PAYLOAD);

    let reencoded = container::encode(&payload).expect("failed to re-encode payload");
    assert_eq!(reencoded.len(), BLOCK_LEN);
    let reheader = Header::parse(&reencoded).expect("failed to parse re-emitted header");
    assert_eq!(reheader.real_size, header.real_size);
    assert_eq!(reheader.compressed_size, header.compressed_size);
    assert_eq!(reheader.checksum, header.checksum);

    let data_end = HEADER_LEN + header.compressed_size as usize;
    assert_eq!(reencoded[..data_end], block[..data_end]);
    assert_eq!(reencoded, block);
}

#[test]
fn checksum_is_the_raw_running_value() {
    // Seed with no input: no final complement means the seed comes back.
    assert_eq!(container::checksum(&[]), 0xFFFF_FFFF);
    assert_ne!(container::checksum(b"abc"), container::checksum(b"abd"));
}

#[test]
fn checksum_matches_stored_header_field() {
    let block = container::encode(PAYLOAD).expect("failed to encode payload");
    let header = Header::parse(&block).expect("failed to parse header");
    let data_end = HEADER_LEN + header.compressed_size as usize;
    assert_eq!(
        container::checksum(&block[HEADER_LEN..data_end]),
        header.checksum
    );
}

#[test]
fn flipped_magic_fields_are_format_errors() {
    let block = container::encode(PAYLOAD).expect("failed to encode payload");
    // version, magic1, zero, magic2, magic3
    for offset in [0, 12, 16, 20, 28] {
        let mut corrupt = block.clone();
        corrupt[offset] ^= 0x01;
        let err = container::decode(&corrupt).expect_err("corrupt magic was accepted");
        assert!(
            matches!(err, SaveError::Format { .. }),
            "offset {offset}: expected Format, got {err:?}"
        );
    }
}

#[test]
fn corrupted_payload_is_an_integrity_error() {
    let block = container::encode(PAYLOAD).expect("failed to encode payload");
    let mut corrupt = block.clone();
    corrupt[HEADER_LEN] ^= 0x10;
    let err = container::decode(&corrupt).expect_err("corrupt payload was accepted");
    assert!(matches!(err, SaveError::Integrity { .. }), "got {err:?}");
}

#[test]
fn truncated_block_is_a_decode_error() {
    let block = container::encode(PAYLOAD).expect("failed to encode payload");
    let err = container::decode(&block[..HEADER_LEN + 4]).expect_err("truncated block accepted");
    assert!(matches!(err, SaveError::Decode(_)), "got {err:?}");

    let err = container::decode(&[0u8; 10]).expect_err("short buffer accepted");
    assert!(matches!(err, SaveError::Decode(_)), "got {err:?}");
}

#[test]
fn oversize_payload_is_a_capacity_error() {
    // Pseudo-random bytes do not deflate; anything past the block size must
    // be refused, never truncated.
    let mut state = 0x2545_F491_4F6C_DD1D_u64;
    let mut payload = Vec::with_capacity(BLOCK_LEN + 65536);
    for _ in 0..BLOCK_LEN + 65536 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        payload.push((state >> 33) as u8);
    }
    let err = container::encode(&payload).expect_err("oversize payload accepted");
    assert!(matches!(err, SaveError::Capacity { .. }), "got {err:?}");
}
