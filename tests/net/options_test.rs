/*!
 * Socket Option Tests
 * setsockopt/getsockopt through simulated user memory
 */

use ai_os_net::core::limits::*;
use ai_os_net::{
    Credentials, DeviceRegistry, SimulatedUserMemory, Socket, SocketConfig, SocketError,
    SocketFactory, Timeval, UserMemory, UserPtr,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const CREDS: Credentials = Credentials::new(200, 1000, 1000);

fn socket(factory: &SocketFactory) -> Arc<Socket> {
    factory.create(CREDS, AF_INET, SOCK_DGRAM, 0).unwrap()
}

fn ifname(name: &str) -> [u8; IFNAMSIZ] {
    let mut raw = [0u8; IFNAMSIZ];
    raw[..name.len()].copy_from_slice(name.as_bytes());
    raw
}

fn set_timeout(socket: &Socket, mem: &SimulatedUserMemory, option: i32, tv: Timeval) -> Result<(), SocketError> {
    let ptr = mem.allocate_with(&tv.to_ne_bytes());
    socket.setsockopt(mem, SOL_SOCKET, option, ptr, TIMEVAL_SIZE as u32)
}

fn get_timeout(socket: &Socket, mem: &SimulatedUserMemory, option: i32) -> Timeval {
    let value = mem.allocate(TIMEVAL_SIZE);
    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, TIMEVAL_SIZE as u32).unwrap();

    socket.getsockopt(mem, SOL_SOCKET, option, value, len).unwrap();
    assert_eq!(mem.read_u32(len).unwrap(), TIMEVAL_SIZE as u32);

    let mut raw = [0u8; TIMEVAL_SIZE];
    mem.copy_from_user(value, &mut raw).unwrap();
    Timeval::from_ne_bytes(raw)
}

#[test]
fn test_timeouts_default_to_zero() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    assert_eq!(get_timeout(&socket, &mem, SO_SNDTIMEO), Timeval::ZERO);
    assert_eq!(get_timeout(&socket, &mem, SO_RCVTIMEO), Timeval::ZERO);
    assert_eq!(socket.send_timeout(), None);
    assert_eq!(socket.receive_timeout(), None);
}

#[test]
fn test_send_timeout_round_trip() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let tv = Timeval { tv_sec: 3, tv_usec: 250_000 };
    set_timeout(&socket, &mem, SO_SNDTIMEO, tv).unwrap();

    assert_eq!(get_timeout(&socket, &mem, SO_SNDTIMEO), tv);
    assert_eq!(socket.send_timeout(), Some(Duration::from_millis(3250)));
    // The other direction is untouched
    assert_eq!(get_timeout(&socket, &mem, SO_RCVTIMEO), Timeval::ZERO);
}

#[test]
fn test_receive_timeout_round_trip() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let tv = Timeval::from_duration(Duration::from_secs(10));
    set_timeout(&socket, &mem, SO_RCVTIMEO, tv).unwrap();

    assert_eq!(get_timeout(&socket, &mem, SO_RCVTIMEO), tv);
    assert_eq!(socket.receive_timeout(), Some(Duration::from_secs(10)));
    assert_eq!(socket.send_timeout(), None);
}

#[test]
fn test_timeout_wrong_size() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);
    let ptr = mem.allocate(32);

    let tv = Timeval { tv_sec: 7, tv_usec: 0 };
    set_timeout(&socket, &mem, SO_SNDTIMEO, tv).unwrap();

    for size in [0u32, 8, 15, 17, 32] {
        let err = socket
            .setsockopt(&mem, SOL_SOCKET, SO_SNDTIMEO, ptr, size)
            .unwrap_err();
        assert_eq!(err.errno(), 22, "size {}", size);
    }
    assert_eq!(get_timeout(&socket, &mem, SO_SNDTIMEO), tv);
}

#[test]
fn test_timeout_fault_leaves_value() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let tv = Timeval { tv_sec: 1, tv_usec: 0 };
    set_timeout(&socket, &mem, SO_RCVTIMEO, tv).unwrap();

    let result = socket.setsockopt(&mem, SOL_SOCKET, SO_RCVTIMEO, UserPtr::null(), TIMEVAL_SIZE as u32);
    assert_eq!(result, Err(SocketError::BadAddress));
    assert_eq!(get_timeout(&socket, &mem, SO_RCVTIMEO), tv);
}

#[test]
fn test_getsockopt_short_buffer() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let value = mem.allocate(TIMEVAL_SIZE);
    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, 8).unwrap();

    let err = socket
        .getsockopt(&mem, SOL_SOCKET, SO_SNDTIMEO, value, len)
        .unwrap_err();
    assert_eq!(err.errno(), 22);
}

#[test]
fn test_getsockopt_unreadable_length() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);
    let value = mem.allocate(TIMEVAL_SIZE);

    let result = socket.getsockopt(&mem, SOL_SOCKET, SO_SNDTIMEO, value, UserPtr::null());
    assert_eq!(result, Err(SocketError::BadAddress));
}

#[test]
fn test_getsockopt_read_only_value() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let value = mem.allocate_read_only(&[0u8; TIMEVAL_SIZE]);
    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, TIMEVAL_SIZE as u32).unwrap();

    let result = socket.getsockopt(&mem, SOL_SOCKET, SO_RCVTIMEO, value, len);
    assert_eq!(result, Err(SocketError::BadAddress));
}

#[test]
fn test_bind_to_loopback() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let name = mem.allocate_with(&ifname("lo"));
    socket
        .setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, name, IFNAMSIZ as u32)
        .unwrap();
    assert_eq!(socket.bound_interface().map(|d| d.name().to_string()), Some("lo".to_string()));

    let out = mem.allocate(IFNAMSIZ);
    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, IFNAMSIZ as u32).unwrap();
    socket
        .getsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, out, len)
        .unwrap();

    assert_eq!(mem.read_u32(len).unwrap(), 3);
    assert_eq!(mem.read_bytes(out, 3).unwrap(), b"lo\0".to_vec());
}

#[test]
fn test_bind_to_unknown_device() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let name = mem.allocate_with(&ifname("eth7"));
    let err = socket
        .setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, name, IFNAMSIZ as u32)
        .unwrap_err();
    assert_eq!(err, SocketError::no_such_device("eth7"));
    assert_eq!(err.errno(), 19);
    assert!(socket.bound_interface().is_none());
}

#[test]
fn test_failed_bind_keeps_previous_device() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let lo = mem.allocate_with(&ifname("lo"));
    socket
        .setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, lo, IFNAMSIZ as u32)
        .unwrap();

    let missing = mem.allocate_with(&ifname("eth0"));
    assert!(socket
        .setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, missing, IFNAMSIZ as u32)
        .is_err());
    let unreadable = socket.setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, UserPtr::null(), IFNAMSIZ as u32);
    assert_eq!(unreadable, Err(SocketError::BadAddress));

    assert_eq!(socket.bound_interface().unwrap().name(), "lo");
}

#[test]
fn test_bind_to_device_wrong_size() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);
    let name = mem.allocate_with(b"lo\0");

    let err = socket
        .setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, name, 3)
        .unwrap_err();
    assert_eq!(err.errno(), 22);
}

#[test]
fn test_bind_to_registered_device() {
    let devices = DeviceRegistry::with_loopback();
    devices.register("veth0", 1500).unwrap();
    let factory = SocketFactory::new(SocketConfig::default(), devices.clone()).unwrap();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let name = mem.allocate_with(&ifname("veth0"));
    socket
        .setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, name, IFNAMSIZ as u32)
        .unwrap();
    let device = socket.bound_interface().unwrap();
    assert_eq!(device.name(), "veth0");
    assert_eq!(device.mtu(), 1500);
    drop(device);

    // Removing the device from the registry unbinds the socket
    devices.unregister("veth0");
    assert!(socket.bound_interface().is_none());
}

#[test]
fn test_getsockopt_unbound_device() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let out = mem.allocate(IFNAMSIZ);
    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, IFNAMSIZ as u32).unwrap();

    // Known quirk: no binding is reported as EFAULT, not as an empty name
    let result = socket.getsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, out, len);
    assert_eq!(result, Err(SocketError::BadAddress));
    assert_eq!(mem.read_u32(len).unwrap(), 0);
}

#[test]
fn test_so_error_reads_zero() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let value = mem.allocate_with(&(-1i32).to_ne_bytes());
    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, INT_SIZE as u32).unwrap();

    socket.getsockopt(&mem, SOL_SOCKET, SO_ERROR, value, len).unwrap();
    assert_eq!(mem.read_u32(value).unwrap(), 0);
    assert_eq!(mem.read_u32(len).unwrap(), INT_SIZE as u32);
}

#[test]
fn test_so_error_is_read_only() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);
    let value = mem.allocate(INT_SIZE);

    let err = socket
        .setsockopt(&mem, SOL_SOCKET, SO_ERROR, value, INT_SIZE as u32)
        .unwrap_err();
    assert_eq!(err.errno(), 92);
}

#[test]
fn test_keepalive_accepted_but_not_readable() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);

    let value = mem.allocate_with(&1i32.to_ne_bytes());
    socket
        .setsockopt(&mem, SOL_SOCKET, SO_KEEPALIVE, value, INT_SIZE as u32)
        .unwrap();

    let len = mem.allocate(SOCKLEN_SIZE);
    mem.write_u32(len, INT_SIZE as u32).unwrap();
    let err = socket
        .getsockopt(&mem, SOL_SOCKET, SO_KEEPALIVE, value, len)
        .unwrap_err();
    assert_eq!(
        err,
        SocketError::OptionNotSupported {
            level: SOL_SOCKET,
            option: SO_KEEPALIVE
        }
    );
}

#[test]
fn test_unknown_option_and_level() {
    let factory = SocketFactory::default();
    let mem = SimulatedUserMemory::new();
    let socket = socket(&factory);
    let value = mem.allocate(INT_SIZE);

    // SO_REUSEADDR
    let err = socket
        .setsockopt(&mem, SOL_SOCKET, 2, value, INT_SIZE as u32)
        .unwrap_err();
    assert_eq!(err.errno(), 92);

    let err = socket
        .setsockopt(&mem, IPPROTO_TCP, SO_SNDTIMEO, value, INT_SIZE as u32)
        .unwrap_err();
    assert_eq!(
        err,
        SocketError::OptionNotSupported {
            level: IPPROTO_TCP,
            option: SO_SNDTIMEO
        }
    );
}
