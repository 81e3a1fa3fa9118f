/*!
 * Socket Layer - Main Entry Point
 *
 * Boots the socket layer with the loopback device and drives one local
 * stream connection through its whole lifecycle:
 * - listen / connect / accept
 * - data in both directions
 * - per-socket options
 * - half and full shutdown
 */

use ai_os_net::core::limits::{
    AF_LOCAL, IFNAMSIZ, SHUT_WR, SOCK_CLOEXEC, SOCK_STREAM, SOL_SOCKET, SO_BINDTODEVICE,
    SO_SNDTIMEO, TIMEVAL_SIZE,
};
use ai_os_net::{
    init_tracing, Credentials, DeviceRegistry, KernelError, Shutdown, SimulatedUserMemory,
    SocketConfig, SocketFactory, Timeval, UserMemory,
};
use std::time::Duration;
use tracing::info;

fn main() -> miette::Result<()> {
    init_tracing();

    info!("Socket layer starting...");
    let config = SocketConfig::from_env();

    let devices = DeviceRegistry::with_loopback();
    let factory = SocketFactory::new(config, devices)?;

    let server = Credentials::new(100, 1000, 1000);
    let client = Credentials::new(200, 1001, 1001);

    let listener = factory.create(server, AF_LOCAL, SOCK_STREAM | SOCK_CLOEXEC, 0)?;
    listener.listen(4)?;

    let outbound = factory.create(client, AF_LOCAL, SOCK_STREAM, 0)?;
    outbound.connect(&listener, client)?;

    let inbound = listener.accept(server)?;
    info!(
        origin = %inbound.origin(),
        acceptor = ?inbound.acceptor(),
        role = %inbound.role(),
        "accepted connection"
    );

    outbound.write(b"hello, listener")?;
    let mut buf = [0u8; 64];
    let n = inbound.read(&mut buf)?;
    info!(bytes = n, payload = %String::from_utf8_lossy(&buf[..n]), "received");

    // Options go through a simulated user address space
    let mem = SimulatedUserMemory::new();
    let timeout = mem.allocate_with(&Timeval::from_duration(Duration::from_secs(5)).to_ne_bytes());
    inbound.setsockopt(&mem, SOL_SOCKET, SO_SNDTIMEO, timeout, TIMEVAL_SIZE as u32)?;

    let mut ifname = [0u8; IFNAMSIZ];
    ifname[..2].copy_from_slice(b"lo");
    let name_ptr = mem.allocate_with(&ifname);
    inbound.setsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, name_ptr, IFNAMSIZ as u32)?;

    let out = mem.allocate(IFNAMSIZ);
    let out_len = mem.allocate(4);
    mem.write_u32(out_len, IFNAMSIZ as u32).map_err(KernelError::from)?;
    inbound.getsockopt(&mem, SOL_SOCKET, SO_BINDTODEVICE, out, out_len)?;
    let name_len = mem.read_u32(out_len).map_err(KernelError::from)?;
    info!(
        send_timeout = ?inbound.send_timeout(),
        device = ?inbound.bound_interface().map(|d| d.name().to_string()),
        name_len,
        "options applied"
    );

    outbound.shutdown(Shutdown::from_raw(SHUT_WR)?)?;
    let n = inbound.read(&mut buf)?;
    info!(bytes = n, "peer saw end of stream after half-close");

    inbound.shutdown(Shutdown::Both)?;
    let late_write = inbound.write(b"late");
    info!(
        state = ?inbound.shutdown_state(),
        write = ?late_write,
        "connection shut down"
    );

    info!("Socket layer demo complete");
    Ok(())
}
