use seqstego_core::{MatchCriteria, StegoError, StegoResult, TcpFlags, TcpSegment};
use seqstego_hal::{PacketTransport, PlatformClock};
use std::cell::Cell;
use std::collections::VecDeque;
use std::net::Ipv4Addr;

const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const REMOTE: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

struct Replay {
    inbound: VecDeque<TcpSegment>,
    fail_after_drain: bool,
}

impl PacketTransport for Replay {
    fn bind(&mut self, _: Ipv4Addr, _: u16) -> StegoResult<()> { Ok(()) }
    fn release(&mut self) {}
    fn send(&mut self, _: &TcpSegment) -> nb::Result<(), StegoError> { Ok(()) }
    fn recv(&mut self) -> nb::Result<TcpSegment, StegoError> {
        match self.inbound.pop_front() {
            Some(seg) => Ok(seg),
            None if self.fail_after_drain => Err(nb::Error::Other(StegoError::HalError)),
            None => Err(nb::Error::WouldBlock),
        }
    }
}

// Advances 1ms per read so the default observe loop terminates.
struct TickClock { t: Cell<u64> }
impl PlatformClock for TickClock {
    fn now_us(&self) -> u64 {
        let now = self.t.get();
        self.t.set(now + 1_000);
        now
    }
}

fn syn_ack(ack: u32) -> TcpSegment {
    TcpSegment {
        src: REMOTE, dst: LOCAL, src_port: 80, dst_port: 50000,
        seq: 777, ack, flags: TcpFlags::SYN | TcpFlags::ACK,
    }
}

#[test]
fn test_trait_object_safety() {
    let mut dev = Replay { inbound: VecDeque::new(), fail_after_drain: false };
    let obj: &mut dyn PacketTransport = &mut dev;
    assert!(obj.recv().is_err());
}

#[test]
fn test_observe_skips_noise() {
    let criteria = MatchCriteria::syn_ack(LOCAL, 50000, REMOTE, 80, 99);
    let mut noise = syn_ack(100);
    noise.dst_port = 50001;

    let mut dev = Replay {
        inbound: VecDeque::from(vec![noise, syn_ack(100)]),
        fail_after_drain: false,
    };
    let clock = TickClock { t: Cell::new(0) };

    let got = dev.observe(&criteria, &clock, 3_000_000).unwrap();
    assert_eq!(got, Some(syn_ack(100)));
}

#[test]
fn test_observe_times_out() {
    let criteria = MatchCriteria::syn_ack(LOCAL, 50000, REMOTE, 80, 99);
    let mut dev = Replay { inbound: VecDeque::new(), fail_after_drain: false };
    let clock = TickClock { t: Cell::new(0) };

    assert_eq!(dev.observe(&criteria, &clock, 50_000).unwrap(), None);
}

#[test]
fn test_observe_surfaces_hal_error() {
    let criteria = MatchCriteria::syn_ack(LOCAL, 50000, REMOTE, 80, 99);
    let mut dev = Replay { inbound: VecDeque::new(), fail_after_drain: true };
    let clock = TickClock { t: Cell::new(0) };

    assert_eq!(dev.observe(&criteria, &clock, 50_000), Err(StegoError::HalError));
}
