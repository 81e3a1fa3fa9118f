/*!
 * Socket Factory
 * Address-family dispatch to the transport constructors
 */

use super::socket::Socket;
use super::types::{Domain, SocketResult};
use crate::core::limits::{SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_TYPE_MASK};
use crate::core::types::{Credentials, KernelResult};
use crate::monitoring::span_operation;
use crate::net::config::SocketConfig;
use crate::net::device::DeviceRegistry;
use crate::net::transport::{InetTransport, LocalTransport, Transport};
use std::sync::Arc;
use tracing::{debug, info};

/// Creates sockets; clones share configuration and the device registry
#[derive(Clone)]
pub struct SocketFactory {
    config: Arc<SocketConfig>,
    devices: DeviceRegistry,
}

impl SocketFactory {
    /// Rejects configurations with zero capacities
    pub fn new(config: SocketConfig, devices: DeviceRegistry) -> KernelResult<Self> {
        config.validate()?;
        info!(
            max_backlog = config.max_backlog,
            stream_buffer_size = config.stream_buffer_size,
            datagram_queue_len = config.datagram_queue_len,
            devices = devices.len(),
            "socket factory initialized"
        );
        Ok(Self {
            config: Arc::new(config),
            devices,
        })
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// `socket(domain, type, protocol)` on behalf of `origin`
    ///
    /// Descriptor flags in `socket_type` are masked off before dispatch.
    /// Unknown families fail before anything is allocated; transport
    /// errors are returned unchanged.
    pub fn create(
        &self,
        origin: Credentials,
        domain: i32,
        socket_type: i32,
        protocol: i32,
    ) -> SocketResult<Arc<Socket>> {
        let span = span_operation("socket_create");
        let _guard = span.enter();

        let result = self.dispatch(origin, domain, socket_type, protocol);
        match &result {
            Ok(socket) => {
                span.record("socket", &socket.id().to_string());
                span.record_result(true);
            }
            Err(e) => span.record_error(&e.to_string()),
        }
        result
    }

    fn dispatch(
        &self,
        origin: Credentials,
        domain: i32,
        socket_type: i32,
        protocol: i32,
    ) -> SocketResult<Arc<Socket>> {
        let domain = Domain::from_raw(domain)?;
        let flags = socket_type & (SOCK_NONBLOCK | SOCK_CLOEXEC);
        if flags != 0 {
            debug!(flags, "descriptor flags left to the fd layer");
        }
        let kind = socket_type & SOCK_TYPE_MASK;

        let (socket_type, protocol, transport) = match domain {
            Domain::Local => {
                let (ty, local) = LocalTransport::create(kind, &self.config)?;
                (ty, protocol, Transport::Local(local))
            }
            Domain::Inet => {
                let (ty, inet) = InetTransport::create(kind, protocol, &self.config)?;
                (ty, inet.protocol(), Transport::Inet(inet))
            }
        };

        let socket = Socket::new(
            domain,
            socket_type,
            protocol,
            origin,
            transport,
            self.devices.clone(),
            Arc::clone(&self.config),
        );
        debug!(socket = socket.id(), ?domain, ?socket_type, protocol, %origin, "socket created");
        Ok(socket)
    }
}

impl Default for SocketFactory {
    fn default() -> Self {
        Self {
            config: Arc::new(SocketConfig::default()),
            devices: DeviceRegistry::with_loopback(),
        }
    }
}
