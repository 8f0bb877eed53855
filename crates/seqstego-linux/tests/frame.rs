use pnet::packet::ipv4::{self, Ipv4Packet};
use pnet::packet::tcp::{self, TcpPacket};
use pnet::packet::Packet;
use seqstego_core::{encode_header, StegoError, TcpFlags, TcpSegment};
use seqstego_hal::{EntropySource, PlatformClock};
use seqstego_linux::{build_frame, classify_io_error, parse_frame, LinuxClock, LinuxEntropy, FRAME_LEN};
use std::net::Ipv4Addr;

fn syn() -> TcpSegment {
    TcpSegment {
        src: Ipv4Addr::new(10, 0, 0, 1),
        dst: Ipv4Addr::new(10, 0, 0, 2),
        src_port: 50123,
        dst_port: 80,
        seq: encode_header(16),
        ack: 0,
        flags: TcpFlags::SYN,
    }
}

#[test]
fn test_frame_carries_isn() {
    let seg = syn();
    let mut buf = [0u8; FRAME_LEN];
    build_frame(&seg, &mut buf).unwrap();

    // Sequence number sits at bytes 4..8 of the TCP header.
    assert_eq!(&buf[24..28], &seg.seq.to_be_bytes());
    assert_eq!(buf[33], TcpFlags::SYN);

    let ip = Ipv4Packet::new(&buf).unwrap();
    assert_eq!(parse_frame(&ip), Some(seg));
}

#[test]
fn test_frame_checksums_valid() {
    let mut seg = syn();
    seg.flags = TcpFlags::PSH | TcpFlags::ACK;
    seg.ack = 0xDEAD_BEEF;
    let mut buf = [0u8; FRAME_LEN];
    build_frame(&seg, &mut buf).unwrap();

    let ip = Ipv4Packet::new(&buf).unwrap();
    assert_eq!(ip.get_checksum(), ipv4::checksum(&ip));
    assert_eq!(ip.get_ttl(), 64);

    let tcp_pkt = TcpPacket::new(ip.payload()).unwrap();
    assert_eq!(tcp_pkt.get_checksum(), tcp::ipv4_checksum(&tcp_pkt, &seg.src, &seg.dst));
    assert!(tcp_pkt.payload().is_empty());
}

#[test]
fn test_parse_rejects_udp() {
    let mut buf = [0u8; FRAME_LEN];
    build_frame(&syn(), &mut buf).unwrap();
    buf[9] = 17; // UDP
    let ip = Ipv4Packet::new(&buf).unwrap();
    assert_eq!(parse_frame(&ip), None);
}

#[test]
fn test_platform_helpers() {
    let mut e = LinuxEntropy;
    let mut buf = [0u8; 2];
    assert!(e.get_random_bytes(&mut buf).is_ok());

    let clock = LinuxClock::new();
    let a = clock.now_us();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(clock.now_us() > a);
}

#[test]
fn test_transient_errors_retry() {
    use std::io::{Error, ErrorKind};

    for kind in [ErrorKind::Interrupted, ErrorKind::WouldBlock, ErrorKind::TimedOut] {
        assert!(matches!(classify_io_error(&Error::from(kind)), nb::Error::WouldBlock));
    }
    assert!(matches!(
        classify_io_error(&Error::from(ErrorKind::PermissionDenied)),
        nb::Error::Other(StegoError::HalError)
    ));
}
