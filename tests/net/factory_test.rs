/*!
 * Socket Factory Tests
 * Domain dispatch, type masking, and protocol resolution
 */

use ai_os_net::core::limits::*;
use ai_os_net::{Credentials, Domain, Role, SetupState, SocketError, SocketFactory, SocketType};
use pretty_assertions::assert_eq;

const CREDS: Credentials = Credentials::new(100, 1000, 1000);

#[test]
fn test_create_local_stream() {
    let factory = SocketFactory::default();
    let socket = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();

    assert_eq!(socket.domain(), Domain::Local);
    assert_eq!(socket.socket_type(), SocketType::Stream);
    assert_eq!(socket.transport().name(), "local");
    assert_eq!(socket.origin(), CREDS);
    assert_eq!(socket.acceptor(), None);
    assert_eq!(socket.role(), Role::Unconnected);
    assert_eq!(socket.setup_state(), SetupState::Unstarted);
    assert!(!socket.is_connected());
}

#[test]
fn test_create_inet_resolves_default_protocol() {
    let factory = SocketFactory::default();

    let tcp = factory.create(CREDS, AF_INET, SOCK_STREAM, 0).unwrap();
    assert_eq!(tcp.transport().name(), "inet");
    assert_eq!(tcp.protocol(), IPPROTO_TCP);

    let udp = factory.create(CREDS, AF_INET, SOCK_DGRAM, IPPROTO_IP).unwrap();
    assert_eq!(udp.protocol(), IPPROTO_UDP);

    let raw = factory.create(CREDS, AF_INET, SOCK_RAW, 1).unwrap();
    assert_eq!(raw.socket_type(), SocketType::Raw);
    assert_eq!(raw.protocol(), 1);
}

#[test]
fn test_unknown_domain_rejected() {
    let factory = SocketFactory::default();

    // AF_UNSPEC
    let err = factory.create(CREDS, 0, SOCK_STREAM, 0).unwrap_err();
    assert_eq!(err, SocketError::AddressFamilyNotSupported(0));
    assert_eq!(err.errno(), 97);

    let err = factory.create(CREDS, 10, SOCK_DGRAM, 0).unwrap_err();
    assert_eq!(err.errno(), 97);
}

#[test]
fn test_unknown_domain_checked_before_type() {
    let factory = SocketFactory::default();
    let err = factory.create(CREDS, 42, 99, 0).unwrap_err();
    assert_eq!(err, SocketError::AddressFamilyNotSupported(42));
}

#[test]
fn test_transport_errors_pass_through() {
    let factory = SocketFactory::default();

    let err = factory.create(CREDS, AF_LOCAL, SOCK_RAW, 0).unwrap_err();
    assert_eq!(err, SocketError::SocketTypeNotSupported(SOCK_RAW));

    let err = factory.create(CREDS, AF_LOCAL, 9, 0).unwrap_err();
    assert_eq!(err.errno(), 94);

    let err = factory
        .create(CREDS, AF_INET, SOCK_STREAM, IPPROTO_UDP)
        .unwrap_err();
    assert_eq!(err, SocketError::ProtocolNotSupported(IPPROTO_UDP));
    assert_eq!(err.errno(), 93);
}

#[test]
fn test_descriptor_flags_are_masked() {
    let factory = SocketFactory::default();

    let socket = factory
        .create(CREDS, AF_LOCAL, SOCK_STREAM | SOCK_NONBLOCK | SOCK_CLOEXEC, 0)
        .unwrap();
    assert_eq!(socket.socket_type(), SocketType::Stream);

    let socket = factory
        .create(CREDS, AF_INET, SOCK_DGRAM | SOCK_CLOEXEC, 0)
        .unwrap();
    assert_eq!(socket.socket_type(), SocketType::Datagram);
}

#[test]
fn test_socket_ids_are_unique() {
    let factory = SocketFactory::default();
    let a = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();
    let b = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_datagram_connect_sets_destination() {
    let factory = SocketFactory::default();
    let sender = factory.create(CREDS, AF_INET, SOCK_DGRAM, 0).unwrap();
    let receiver = factory.create(CREDS, AF_INET, SOCK_DGRAM, 0).unwrap();

    assert_eq!(sender.write(b"x"), Err(SocketError::DestinationRequired));

    sender.connect(&receiver, CREDS).unwrap();
    assert!(sender.is_connected());
    assert_eq!(sender.write(b"ping").unwrap(), 4);

    let mut buf = [0u8; 2];
    // Truncated to the caller's buffer
    assert_eq!(receiver.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf, b"pi");
    assert_eq!(receiver.read(&mut buf), Err(SocketError::WouldBlock));
}

#[test]
fn test_datagram_connect_across_domains_refused() {
    let factory = SocketFactory::default();
    let local = factory.create(CREDS, AF_LOCAL, SOCK_DGRAM, 0).unwrap();
    let inet = factory.create(CREDS, AF_INET, SOCK_DGRAM, 0).unwrap();

    assert_eq!(local.connect(&inet, CREDS), Err(SocketError::ConnectionRefused));
    assert!(!local.is_connected());
}
