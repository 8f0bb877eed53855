use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use log::{debug, warn};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{self, MutableTcpPacket, TcpPacket};
use pnet::packet::{MutablePacket, Packet};
use pnet::transport::{
    ipv4_packet_iter, transport_channel, TransportChannelType::Layer3, TransportReceiver,
    TransportSender,
};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use seqstego_core::{StegoError, StegoResult, TcpSegment};
use seqstego_hal::{EntropySource, PacketTransport, PlatformClock};

/// 20 IP + 20 TCP, no options, no payload.
pub const FRAME_LEN: usize = 40;
const TTL: u8 = 64;
const WINDOW: u16 = 64240;
// Slice handed to the kernel per recv; observe() loops over these.
const RECV_SLICE: Duration = Duration::from_millis(50);

/// Serialize a segment into a complete IPv4/TCP frame with valid checksums.
pub fn build_frame(seg: &TcpSegment, buffer: &mut [u8; FRAME_LEN]) -> StegoResult<()> {
    let mut ip = MutableIpv4Packet::new(buffer).ok_or(StegoError::WireFormatError)?;
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length(FRAME_LEN as u16);
    ip.set_ttl(TTL);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
    ip.set_source(seg.src);
    ip.set_destination(seg.dst);

    {
        let mut tcp = MutableTcpPacket::new(ip.payload_mut()).ok_or(StegoError::WireFormatError)?;
        tcp.set_source(seg.src_port);
        tcp.set_destination(seg.dst_port);
        tcp.set_sequence(seg.seq);
        tcp.set_acknowledgement(seg.ack);
        tcp.set_flags(seg.flags);
        tcp.set_window(WINDOW);
        tcp.set_data_offset(5);

        let csum = tcp::ipv4_checksum(&tcp.to_immutable(), &seg.src, &seg.dst);
        tcp.set_checksum(csum);
    }

    let csum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(csum);
    Ok(())
}

/// Map a socket error onto the HAL contract: transient conditions
/// (`WouldBlock`, `TimedOut`, EINTR) are retried, the rest are fatal.
pub fn classify_io_error(e: &io::Error) -> nb::Error<StegoError> {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
            nb::Error::WouldBlock
        }
        _ => nb::Error::Other(StegoError::HalError),
    }
}

/// Extract the channel-relevant fields from a raw IPv4 frame.
/// Returns `None` for anything that is not a well-formed IPv4/TCP packet.
pub fn parse_frame(ip: &Ipv4Packet) -> Option<TcpSegment> {
    if ip.get_version() != 4 || ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }
    let tcp = TcpPacket::new(ip.payload())?;
    Some(TcpSegment {
        src: ip.get_source(),
        dst: ip.get_destination(),
        src_port: tcp.get_source(),
        dst_port: tcp.get_destination(),
        seq: tcp.get_sequence(),
        ack: tcp.get_acknowledgement(),
        flags: tcp.get_flags(),
    })
}

/// Raw socket transport (needs CAP_NET_RAW).
pub struct RawTcpTransport {
    tx: TransportSender,
    rx: TransportReceiver,
    reserved: Option<Socket>,
}

impl RawTcpTransport {
    pub fn new() -> anyhow::Result<Self> {
        let (tx, rx) = transport_channel(8192, Layer3(IpNextHeaderProtocols::Tcp))
            .map_err(|e| anyhow::anyhow!("failed to open Layer3 channel: {}. Run as root.", e))?;
        Ok(Self { tx, rx, reserved: None })
    }
}

impl PacketTransport for RawTcpTransport {
    fn bind(&mut self, local: Ipv4Addr, port: u16) -> StegoResult<()> {
        let reserve = || -> io::Result<Socket> {
            let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
            socket.set_reuse_address(true)?;
            let addr: SockAddr = SocketAddr::V4(SocketAddrV4::new(local, port)).into();
            socket.bind(&addr)?;
            Ok(socket)
        };

        match reserve() {
            Ok(socket) => {
                self.reserved = Some(socket);
                Ok(())
            }
            Err(e) => {
                warn!("Port reservation {}:{} failed: {}", local, port, e);
                Err(StegoError::BindFailure)
            }
        }
    }

    fn release(&mut self) {
        // Dropping the socket closes it.
        self.reserved = None;
    }

    fn send(&mut self, seg: &TcpSegment) -> nb::Result<(), StegoError> {
        let mut buffer = [0u8; FRAME_LEN];
        build_frame(seg, &mut buffer)?;
        let ip = Ipv4Packet::new(&buffer).ok_or(nb::Error::Other(StegoError::WireFormatError))?;

        match self.tx.send_to(ip, IpAddr::V4(seg.dst)) {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = classify_io_error(&e);
                if let nb::Error::Other(_) = err {
                    warn!("raw send failed: {}", e);
                }
                Err(err)
            }
        }
    }

    fn recv(&mut self) -> nb::Result<TcpSegment, StegoError> {
        let mut iter = ipv4_packet_iter(&mut self.rx);
        match iter.next_with_timeout(RECV_SLICE) {
            Ok(Some((ip, _))) => match parse_frame(&ip) {
                Some(seg) => Ok(seg),
                None => {
                    debug!("dropping non-TCP frame from {}", ip.get_source());
                    Err(nb::Error::WouldBlock)
                }
            },
            Ok(None) => Err(nb::Error::WouldBlock),
            Err(e) => Err(classify_io_error(&e)),
        }
    }
}

pub struct LinuxEntropy;
impl EntropySource for LinuxEntropy {
    fn get_random_bytes(&mut self, buf: &mut [u8]) -> StegoResult<()> {
        use rand::RngCore;
        rand::thread_rng()
            .try_fill_bytes(buf)
            .map_err(|_| StegoError::RngFailure)
    }
}

pub struct LinuxClock(Instant);
impl LinuxClock { pub fn new() -> Self { Self(Instant::now()) } }
impl Default for LinuxClock { fn default() -> Self { Self::new() } }
impl PlatformClock for LinuxClock {
    fn now_us(&self) -> u64 { self.0.elapsed().as_micros() as u64 }
}
