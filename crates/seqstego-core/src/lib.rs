#![no_std]
#[cfg(feature = "std")]
extern crate std;
extern crate alloc;

use core::net::Ipv4Addr;

pub mod bits;
pub mod header;

pub use bits::MessageBits;
pub use header::{checksum, decode_header, encode_header, CovertHeader};

/// Protocol identifier carried in the top byte of the ISN.
pub const STEGO_MAGIC: u8 = 0xC5;

/// Well-known port the SYN is addressed to (plain HTTP).
pub const SERVICE_PORT: u16 = 80;

/// Ephemeral source ports are drawn from [EPHEMERAL_PORT_MIN, EPHEMERAL_PORT_MAX).
pub const EPHEMERAL_PORT_MIN: u16 = 49152;
pub const EPHEMERAL_PORT_MAX: u16 = 65535;

/// Capacity of the 16-bit length field.
pub const MAX_MESSAGE_BITS: usize = u16::MAX as usize;

pub const BYTE_LEN_BITS: usize = 8;
pub const MAGIC_LEN_BYTES: usize = 1;
pub const LENGTH_LEN_BYTES: usize = 2;
pub const CHECKSUM_LEN_BYTES: usize = 1;

/// TCP control bits as they appear in byte 13 of the header.
pub struct TcpFlags;

impl TcpFlags {
    pub const SYN: u8 = 0x02;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
}

/// The fields of an IPv4/TCP packet the channel reads or writes.
/// Nothing else (options, payload) is ever carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSegment {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: u8,
}

/// Filter a transport applies to inbound packets while observing.
/// Every field must hold for a packet to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCriteria {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags_mask: u8,
    pub flags: u8,
    pub expected_ack: u32,
}

impl MatchCriteria {
    /// A SYN-ACK from `remote:remote_port` to `local:local_port` acknowledging `isn`.
    pub fn syn_ack(local: Ipv4Addr, local_port: u16, remote: Ipv4Addr, remote_port: u16, isn: u32) -> Self {
        Self {
            src: remote,
            dst: local,
            src_port: remote_port,
            dst_port: local_port,
            // Full mask: any extra control bit disqualifies the reply.
            flags_mask: 0xFF,
            flags: TcpFlags::SYN | TcpFlags::ACK,
            expected_ack: isn.wrapping_add(1),
        }
    }

    pub fn matches(&self, seg: &TcpSegment) -> bool {
        seg.src == self.src
            && seg.dst == self.dst
            && seg.src_port == self.src_port
            && seg.dst_port == self.dst_port
            && seg.flags & self.flags_mask == self.flags
            && seg.ack == self.expected_ack
    }
}

pub type StegoResult<T> = Result<T, StegoError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StegoError {
    /// Payload does not fit the 16-bit length field.
    MessageTooLarge { bits: usize },
    /// The local endpoint could not be reserved.
    BindFailure,
    /// No acceptable SYN-ACK inside the wait window.
    HandshakeTimeout,
    InvalidState,
    WireFormatError,
    ChecksumMismatch,
    RngFailure,
    HalError,
}

impl core::fmt::Display for StegoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StegoError::MessageTooLarge { bits } => {
                write!(f, "message is {} bits, limit is {}", bits, MAX_MESSAGE_BITS)
            }
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StegoError {}
