#![no_std]
#![forbid(unsafe_code)]

use core::net::Ipv4Addr;
use seqstego_core::{MatchCriteria, StegoError, StegoResult, TcpSegment};

/// Raw IPv4/TCP access (send crafted segments, sniff inbound ones).
/// INVARIANT: `send` and `recv` must not block indefinitely.
pub trait PacketTransport {
    /// Reserve the local endpoint so the host stack does not hand the port
    /// to another socket while the channel is using it.
    fn bind(&mut self, local: Ipv4Addr, port: u16) -> StegoResult<()>;

    /// Drop whatever `bind` acquired. Must be safe to call more than once.
    fn release(&mut self);

    fn send(&mut self, segment: &TcpSegment) -> nb::Result<(), StegoError>;

    /// Next inbound TCP segment, or `WouldBlock` if none arrived recently.
    /// Implementations should wait briefly (tens of ms) before returning
    /// `WouldBlock`; the default `observe` polls this in a tight loop.
    fn recv(&mut self) -> nb::Result<TcpSegment, StegoError>;

    // Default: poll `recv` until the deadline, discarding non-matching traffic.
    // Platforms with kernel-side filtering (BPF) should override.
    fn observe(
        &mut self,
        criteria: &MatchCriteria,
        clock: &dyn PlatformClock,
        timeout_us: u64,
    ) -> StegoResult<Option<TcpSegment>> {
        let start = clock.now_us();
        while clock.now_us().saturating_sub(start) < timeout_us {
            match self.recv() {
                Ok(seg) if criteria.matches(&seg) => return Ok(Some(seg)),
                Ok(_) => continue,
                Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// Source of non-cryptographic randomness (ephemeral port selection).
pub trait EntropySource {
    fn get_random_bytes(&mut self, buf: &mut [u8]) -> StegoResult<()>;
}

/// Monotonic clock.
pub trait PlatformClock {
    fn now_us(&self) -> u64;
}
