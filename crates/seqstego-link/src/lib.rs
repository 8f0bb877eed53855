#![no_std]
extern crate alloc;
use alloc::boxed::Box;
use core::net::Ipv4Addr;

use log::{debug, error, info, warn};

use seqstego_core::{
    CovertHeader, MessageBits, StegoError, StegoResult, EPHEMERAL_PORT_MAX, EPHEMERAL_PORT_MIN,
    SERVICE_PORT,
};
use seqstego_hal::{EntropySource, PacketTransport, PlatformClock};

pub mod handshake;
pub mod session;
pub mod transmit;

pub use handshake::{HandshakeCoordinator, HandshakeState};
pub use session::Session;
pub use transmit::{next_sequence, BitStreamTransmitter};

#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    pub service_port: u16,
    pub handshake_timeout_us: u64,
    /// Half-open range `[lo, hi)` for the source port.
    pub ephemeral_ports: (u16, u16),
}

impl ClientConfig {
    /// Wait window in whole seconds; huge values clamp instead of wrapping.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.handshake_timeout_us = secs.saturating_mul(1_000_000);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_port: SERVICE_PORT,
            handshake_timeout_us: 3_000_000,
            ephemeral_ports: (EPHEMERAL_PORT_MIN, EPHEMERAL_PORT_MAX),
        }
    }
}

/// Outcome of a completed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub local_port: u16,
    pub isn: u32,
    pub peer_isn: u32,
    pub bits_sent: usize,
}

pub struct StegoClient {
    transport: Box<dyn PacketTransport>,
    entropy: Box<dyn EntropySource>,
    clock: Box<dyn PlatformClock>,
    config: ClientConfig,
}

impl StegoClient {
    pub fn new(
        transport: Box<dyn PacketTransport>,
        entropy: Box<dyn EntropySource>,
        clock: Box<dyn PlatformClock>,
        config: ClientConfig,
    ) -> Self {
        Self { transport, entropy, clock, config }
    }

    fn pick_port(&mut self) -> StegoResult<u16> {
        let (lo, hi) = self.config.ephemeral_ports;
        if hi <= lo {
            return Err(StegoError::InvalidState);
        }
        let mut raw = [0u8; 2];
        self.entropy.get_random_bytes(&mut raw)?;
        Ok(lo + u16::from_be_bytes(raw) % (hi - lo))
    }

    /// Smuggle `msg` to `remote` from `local`.
    ///
    /// The endpoint is released on every path once it has been bound.
    /// Nothing is ever reported to the peer on failure.
    pub fn send_message(&mut self, msg: &str, local: Ipv4Addr, remote: Ipv4Addr) -> StegoResult<SendReport> {
        let bits = match MessageBits::from_message(msg) {
            Ok(b) => b,
            Err(e) => {
                warn!("Message is too long for one transmission. Aborting...");
                return Err(e);
            }
        };
        info!("Preparing to transmit message of length {} bit", bits.bit_len());

        let port = self.pick_port()?;
        if let Err(e) = self.transport.bind(local, port) {
            error!("Failed to bind client endpoint {}:{}", local, port);
            self.transport.release();
            return Err(e);
        }
        info!("Client bound to {}:{}", local, port);

        let mut session = Session::new(local, port, remote, self.config.service_port);
        let outcome = self.run(&mut session, &bits);

        self.transport.release();
        info!("Client endpoint released");
        outcome
    }

    fn run(&mut self, session: &mut Session, bits: &MessageBits) -> StegoResult<SendReport> {
        let header = CovertHeader::new(bits.bit_len());
        debug_assert_eq!(header.bit_length, bits.bit_len());
        debug!(
            "Header: magic {:#04x}, length {}, crc {:#04x}",
            header.magic, header.bit_length, header.checksum
        );
        let isn = header.to_isn();

        let mut handshake = HandshakeCoordinator::new(self.config.handshake_timeout_us);
        handshake.begin(&mut *self.transport, session, isn)?;
        handshake.await_syn_ack(&mut *self.transport, &*self.clock, session)?;

        info!("Start transmission!");
        let sent = BitStreamTransmitter::transmit(&mut *self.transport, &handshake, session, bits);
        handshake.close();
        let bits_sent = sent?;

        Ok(SendReport {
            local_port: session.local_port,
            isn,
            peer_isn: session.peer_isn,
            bits_sent,
        })
    }
}
