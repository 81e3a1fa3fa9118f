/*!
 * Configuration Tests
 * Environment overrides and their effect on created sockets
 */

use ai_os_net::core::limits::*;
use ai_os_net::{
    Credentials, DeviceRegistry, KernelError, SocketConfig, SocketError, SocketFactory,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;

const CREDS: Credentials = Credentials::new(300, 1000, 1000);

const VARS: [&str; 3] = [
    "KERNEL_SOCKET_MAX_BACKLOG",
    "KERNEL_SOCKET_BUFFER_SIZE",
    "KERNEL_SOCKET_DGRAM_QUEUE",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    assert_eq!(SocketConfig::from_env(), SocketConfig::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    env::set_var("KERNEL_SOCKET_MAX_BACKLOG", "4");
    env::set_var("KERNEL_SOCKET_BUFFER_SIZE", " 1024 ");
    env::set_var("KERNEL_SOCKET_DGRAM_QUEUE", "2");

    let config = SocketConfig::from_env();
    clear_env();

    assert_eq!(config.max_backlog, 4);
    assert_eq!(config.stream_buffer_size, 1024);
    assert_eq!(config.datagram_queue_len, 2);
}

#[test]
#[serial]
fn test_from_env_ignores_invalid() {
    clear_env();
    env::set_var("KERNEL_SOCKET_MAX_BACKLOG", "0");
    env::set_var("KERNEL_SOCKET_BUFFER_SIZE", "lots");

    let config = SocketConfig::from_env();
    clear_env();

    assert_eq!(config, SocketConfig::default());
}

#[test]
fn test_max_backlog_applies_to_listen() {
    let config = SocketConfig {
        max_backlog: 2,
        ..Default::default()
    };
    let factory = SocketFactory::new(config, DeviceRegistry::with_loopback()).unwrap();
    let listener = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();
    listener.listen(SOMAXCONN).unwrap();

    assert_eq!(listener.backlog(), 2);
}

#[test]
fn test_stream_buffer_size_limits_writes() {
    let config = SocketConfig {
        stream_buffer_size: 4,
        ..Default::default()
    };
    let factory = SocketFactory::new(config, DeviceRegistry::with_loopback()).unwrap();
    let listener = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();
    listener.listen(1).unwrap();
    let outbound = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();
    outbound.connect(&listener, CREDS).unwrap();

    // Short write, then a full buffer
    assert_eq!(outbound.write(b"abcdef").unwrap(), 4);
    assert_eq!(outbound.write(b"gh"), Err(SocketError::WouldBlock));

    let inbound = listener.accept(CREDS).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(inbound.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], b"abcd");
    assert_eq!(outbound.write(b"gh").unwrap(), 2);
}

#[test]
fn test_datagram_queue_len_limits_sends() {
    let config = SocketConfig {
        datagram_queue_len: 2,
        ..Default::default()
    };
    let factory = SocketFactory::new(config, DeviceRegistry::with_loopback()).unwrap();
    let sender = factory.create(CREDS, AF_INET, SOCK_DGRAM, 0).unwrap();
    let receiver = factory.create(CREDS, AF_INET, SOCK_DGRAM, 0).unwrap();
    sender.connect(&receiver, CREDS).unwrap();

    sender.write(b"1").unwrap();
    sender.write(b"2").unwrap();
    assert_eq!(sender.write(b"3"), Err(SocketError::WouldBlock));
    assert_eq!(receiver.transport().readable(), 2);
}

#[test]
fn test_factory_rejects_zero_capacities() {
    let zeroed = [
        SocketConfig {
            max_backlog: 0,
            ..Default::default()
        },
        SocketConfig {
            stream_buffer_size: 0,
            ..Default::default()
        },
        SocketConfig {
            datagram_queue_len: 0,
            ..Default::default()
        },
    ];

    for config in zeroed {
        let result = SocketFactory::new(config.clone(), DeviceRegistry::with_loopback());
        assert!(
            matches!(result, Err(KernelError::Configuration(_))),
            "{:?} accepted",
            config
        );
    }
}

#[test]
fn test_zero_max_backlog_still_listens() {
    // Direct use of an unvalidated config must not panic
    let config = SocketConfig {
        max_backlog: 0,
        ..Default::default()
    };
    assert_eq!(config.clamp_backlog(4), 1);

    let factory = SocketFactory::default();
    let listener = factory.create(CREDS, AF_LOCAL, SOCK_STREAM, 0).unwrap();
    listener.listen(0).unwrap();
    assert_eq!(listener.backlog(), 1);
}
