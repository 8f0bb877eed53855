use alloc::vec::Vec;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{StegoError, StegoResult, BYTE_LEN_BITS, MAX_MESSAGE_BITS};

/// The UTF-8 bytes of a message, read as bits MSB-first.
/// Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MessageBits {
    bytes: Vec<u8>,
}

impl MessageBits {
    /// Fails with `MessageTooLarge` when the bit count overflows the length field.
    pub fn from_bytes(bytes: &[u8]) -> StegoResult<Self> {
        let bits = bytes.len() * BYTE_LEN_BITS;
        if bits > MAX_MESSAGE_BITS {
            return Err(StegoError::MessageTooLarge { bits });
        }
        Ok(Self { bytes: bytes.to_vec() })
    }

    pub fn from_message(msg: &str) -> StegoResult<Self> {
        Self::from_bytes(msg.as_bytes())
    }

    /// Always fits: enforced at construction.
    pub fn bit_len(&self) -> u16 {
        (self.bytes.len() * BYTE_LEN_BITS) as u16
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bytes
            .iter()
            .flat_map(|b| (0..BYTE_LEN_BITS).rev().map(move |i| (b >> i) & 1 == 1))
    }
}
