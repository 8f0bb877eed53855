use log::debug;

use seqstego_core::{MessageBits, StegoError, StegoResult, TcpFlags};
use seqstego_hal::PacketTransport;

use crate::handshake::{HandshakeCoordinator, HandshakeState};
use crate::session::Session;

/// Sequence number carrying bit `i`: advance by `i * 2`, then pin the LSB.
/// All arithmetic wraps mod 2^32.
pub fn next_sequence(current: u32, index: usize, bit: bool) -> u32 {
    let advanced = current.wrapping_add((index as u32).wrapping_mul(2));
    if bit { advanced | 1 } else { advanced & !1 }
}

/// One PSH+ACK per payload bit. Fire-and-forget: nothing is awaited,
/// nothing is retransmitted.
pub struct BitStreamTransmitter;

impl BitStreamTransmitter {
    /// Returns the number of bits sent.
    pub fn transmit<T: PacketTransport + ?Sized>(
        transport: &mut T,
        handshake: &HandshakeCoordinator,
        session: &mut Session,
        bits: &MessageBits,
    ) -> StegoResult<usize> {
        if handshake.state() != HandshakeState::Established {
            return Err(StegoError::InvalidState);
        }

        let ack = session.peer_isn.wrapping_add(1);
        let mut sent = 0;
        for (i, bit) in bits.iter().enumerate() {
            session.sequence = next_sequence(session.sequence, i, bit);

            let seg = session.segment(TcpFlags::PSH | TcpFlags::ACK, ack);
            nb::block!(transport.send(&seg))?;
            debug!("Sent bit {} with seq {}", bit as u8, session.sequence);
            sent += 1;
        }
        Ok(sent)
    }
}
