use core::net::Ipv4Addr;
use seqstego_core::TcpSegment;

/// Per-send connection state. Owned by exactly one send operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub local_addr: Ipv4Addr,
    pub remote_addr: Ipv4Addr,
    pub local_port: u16,
    pub remote_port: u16,
    pub sequence: u32,
    pub peer_isn: u32,
}

impl Session {
    pub fn new(local_addr: Ipv4Addr, local_port: u16, remote_addr: Ipv4Addr, remote_port: u16) -> Self {
        Self {
            local_addr,
            remote_addr,
            local_port,
            remote_port,
            sequence: 0,
            peer_isn: 0,
        }
    }

    /// Outbound segment stamped with the current sequence number.
    pub fn segment(&self, flags: u8, ack: u32) -> TcpSegment {
        TcpSegment {
            src: self.local_addr,
            dst: self.remote_addr,
            src_port: self.local_port,
            dst_port: self.remote_port,
            seq: self.sequence,
            ack,
            flags,
        }
    }
}
