//! On-disk container: a fixed 32-byte header, a zlib-compressed payload and
//! zero padding out to a fixed block size.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Result, SaveError};

/// Total on-disk size of a save block, padding included.
pub const BLOCK_LEN: usize = 524288;
/// Eight little-endian u32 fields.
pub const HEADER_LEN: usize = 32;

pub const VERSION: u32 = 21;
pub const MAGIC1: u32 = 860693325;
pub const MAGIC2: u32 = 860700740;
pub const MAGIC3: u32 = 1079398965;

const CRC_POLY: u32 = 0xEDB8_8320;

/// The eight header fields, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub real_size: u32,
    pub compressed_size: u32,
    pub magic1: u32,
    pub zero: u32,
    pub magic2: u32,
    pub checksum: u32,
    pub magic3: u32,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SaveError::Decode(format!(
                "file is {} bytes, the header alone needs {HEADER_LEN}",
                bytes.len()
            )));
        }
        let header = Self {
            version: le_u32(bytes, 0),
            real_size: le_u32(bytes, 4),
            compressed_size: le_u32(bytes, 8),
            magic1: le_u32(bytes, 12),
            zero: le_u32(bytes, 16),
            magic2: le_u32(bytes, 20),
            checksum: le_u32(bytes, 24),
            magic3: le_u32(bytes, 28),
        };
        header.check_constants()?;
        Ok(header)
    }

    fn check_constants(&self) -> Result<()> {
        let checks = [
            ("version", VERSION, self.version),
            ("magic1", MAGIC1, self.magic1),
            ("zero", 0, self.zero),
            ("magic2", MAGIC2, self.magic2),
            ("magic3", MAGIC3, self.magic3),
        ];
        for (field, expected, found) in checks {
            if found != expected {
                return Err(SaveError::Format {
                    field,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let fields = [
            self.version,
            self.real_size,
            self.compressed_size,
            self.magic1,
            self.zero,
            self.magic2,
            self.checksum,
            self.magic3,
        ];
        let mut out = [0u8; HEADER_LEN];
        for (i, field) in fields.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        out
    }
}

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Checksum over the compressed payload: reflected polynomial 0xEDB88320,
/// bitwise loop, seed 0xFFFFFFFF. The format stores the raw running value
/// with no final complement, unlike standard CRC32; this exact variant is
/// required for file compatibility.
pub fn checksum(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC_POLY
            } else {
                crc >> 1
            };
        }
    }
    crc
}

/// Split a save block into its header and the inflated payload bytes.
///
/// Magic mismatches reject the file before anything else is looked at;
/// a checksum mismatch marks it corrupt; inflate failures and truncation
/// surface as decode errors.
pub fn decode(block: &[u8]) -> Result<(Header, Vec<u8>)> {
    let header = Header::parse(block)?;
    let compressed_size = header.compressed_size as usize;
    if compressed_size > BLOCK_LEN - HEADER_LEN {
        return Err(SaveError::Decode(format!(
            "compressed size {compressed_size} exceeds container capacity {}",
            BLOCK_LEN - HEADER_LEN
        )));
    }
    let end = HEADER_LEN + compressed_size;
    if block.len() < end {
        return Err(SaveError::Decode(format!(
            "file is {} bytes, compressed payload ends at {end}",
            block.len()
        )));
    }
    let compressed = &block[HEADER_LEN..end];
    let computed = checksum(compressed);
    if computed != header.checksum {
        return Err(SaveError::Integrity {
            stored: header.checksum,
            computed,
        });
    }
    let mut payload = Vec::with_capacity(header.real_size as usize);
    ZlibDecoder::new(compressed)
        .read_to_end(&mut payload)
        .map_err(|e| SaveError::Decode(format!("zlib inflate failed: {e}")))?;
    Ok((header, payload))
}

/// Pack a payload into a full save block: deflate, header, zero padding.
///
/// Refuses with a capacity error if header plus deflated data would not fit
/// the fixed block; nothing is ever truncated.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    let compressed = encoder.finish()?;

    let needed = HEADER_LEN + compressed.len();
    if needed > BLOCK_LEN {
        return Err(SaveError::Capacity {
            needed,
            max: BLOCK_LEN,
        });
    }

    let header = Header {
        version: VERSION,
        real_size: payload.len() as u32,
        compressed_size: compressed.len() as u32,
        magic1: MAGIC1,
        zero: 0,
        magic2: MAGIC2,
        checksum: checksum(&compressed),
        magic3: MAGIC3,
    };

    let mut block = Vec::with_capacity(BLOCK_LEN);
    block.extend_from_slice(&header.to_bytes());
    block.extend_from_slice(&compressed);
    block.resize(BLOCK_LEN, 0);
    Ok(block)
}
