use crc::{Crc, CRC_8_SMBUS};

use crate::{
    StegoError, StegoResult, CHECKSUM_LEN_BYTES, LENGTH_LEN_BYTES, MAGIC_LEN_BYTES, STEGO_MAGIC,
};

const PREFIX_LEN: usize = MAGIC_LEN_BYTES + LENGTH_LEN_BYTES;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// 8-bit checksum of the header (CRC-8/SMBUS: poly 0x07, init 0x00).
pub fn checksum(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

/// The covert header carried as the client ISN.
///
/// Layout (big-endian): `[magic:8][bit_length:16][checksum:8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CovertHeader {
    pub magic: u8,
    pub bit_length: u16,
    pub checksum: u8,
}

impl CovertHeader {
    pub const SIZE: usize = PREFIX_LEN + CHECKSUM_LEN_BYTES;

    pub fn new(bit_length: u16) -> Self {
        let prefix = Self::prefix_bytes(STEGO_MAGIC, bit_length);
        Self { magic: STEGO_MAGIC, bit_length, checksum: checksum(&prefix) }
    }

    fn prefix_bytes(magic: u8, bit_length: u16) -> [u8; PREFIX_LEN] {
        let len = bit_length.to_be_bytes();
        [magic, len[0], len[1]]
    }

    /// Checksum recomputed from magic and length only.
    pub fn expected_checksum(&self) -> u8 {
        checksum(&Self::prefix_bytes(self.magic, self.bit_length))
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let len = self.bit_length.to_be_bytes();
        [self.magic, len[0], len[1], self.checksum]
    }

    /// Raw unpack, no validation.
    pub fn from_bytes(buf: [u8; Self::SIZE]) -> Self {
        Self {
            magic: buf[0],
            bit_length: u16::from_be_bytes([buf[1], buf[2]]),
            checksum: buf[3],
        }
    }

    pub fn to_isn(&self) -> u32 {
        u32::from_be_bytes(self.to_bytes())
    }
}

/// Build the ISN announcing a payload of `bit_length` bits.
pub fn encode_header(bit_length: u16) -> u32 {
    CovertHeader::new(bit_length).to_isn()
}

/// Unpack an ISN, rejecting foreign traffic and corrupted headers.
pub fn decode_header(isn: u32) -> StegoResult<CovertHeader> {
    let header = CovertHeader::from_bytes(isn.to_be_bytes());
    if header.magic != STEGO_MAGIC {
        return Err(StegoError::WireFormatError);
    }
    if header.checksum != header.expected_checksum() {
        return Err(StegoError::ChecksumMismatch);
    }
    Ok(header)
}
