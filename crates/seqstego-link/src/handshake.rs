use log::{debug, error, info};

use seqstego_core::{MatchCriteria, StegoError, StegoResult, TcpFlags};
use seqstego_hal::{PacketTransport, PlatformClock};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    SynSent,
    Established,
    Closed,
    Failed,
}

/// Drives SYN -> SYN-ACK -> ACK with the covert header as ISN.
/// One SYN, one observation window, no retry.
pub struct HandshakeCoordinator {
    state: HandshakeState,
    timeout_us: u64,
}

impl HandshakeCoordinator {
    pub fn new(timeout_us: u64) -> Self {
        Self { state: HandshakeState::Idle, timeout_us }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Idle -> SynSent.
    pub fn begin<T: PacketTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        session: &mut Session,
        isn: u32,
    ) -> StegoResult<()> {
        if self.state != HandshakeState::Idle {
            return Err(StegoError::InvalidState);
        }

        session.sequence = isn;
        let syn = session.segment(TcpFlags::SYN, 0);
        nb::block!(transport.send(&syn))?;
        self.state = HandshakeState::SynSent;

        info!("Sent SYN with init sequence {:#010x}", isn);
        Ok(())
    }

    /// SynSent -> Established, or Failed when the window elapses.
    pub fn await_syn_ack<T: PacketTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        clock: &dyn PlatformClock,
        session: &mut Session,
    ) -> StegoResult<()> {
        if self.state != HandshakeState::SynSent {
            return Err(StegoError::InvalidState);
        }

        let criteria = MatchCriteria::syn_ack(
            session.local_addr,
            session.local_port,
            session.remote_addr,
            session.remote_port,
            session.sequence,
        );

        let reply = match transport.observe(&criteria, clock, self.timeout_us) {
            Ok(Some(seg)) => seg,
            Ok(None) => {
                error!(
                    "SYN-ACK from {} wasn't received after timeout {} us",
                    session.remote_addr, self.timeout_us
                );
                self.state = HandshakeState::Failed;
                return Err(StegoError::HandshakeTimeout);
            }
            Err(e) => {
                self.state = HandshakeState::Failed;
                return Err(e);
            }
        };
        debug!("Got SYN-ACK. SEQ = {}, ACK = {}", reply.seq, reply.ack);

        session.sequence = session.sequence.wrapping_add(1);
        session.peer_isn = reply.seq;

        let ack = session.segment(TcpFlags::ACK, reply.seq.wrapping_add(1));
        if let Err(e) = nb::block!(transport.send(&ack)) {
            self.state = HandshakeState::Failed;
            return Err(e);
        }

        self.state = HandshakeState::Established;
        Ok(())
    }

    /// Established -> Closed, once the data phase is over.
    pub fn close(&mut self) {
        if self.state == HandshakeState::Established {
            self.state = HandshakeState::Closed;
        }
    }
}
