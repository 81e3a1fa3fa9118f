/*!
 * Internet Transport
 * AF_INET sockets (TCP-, UDP-, and raw-typed) over in-memory loopback channels
 *
 * No routing or protocol state machine lives here; this is the minimum needed
 * to give IPv4 sockets a working data path on the local host.
 */

use super::{Endpoint, TransportOps};
use crate::core::limits::{IPPROTO_IP, IPPROTO_TCP, IPPROTO_UDP};
use crate::core::types::Size;
use crate::net::config::SocketConfig;
use crate::net::socket::{SocketError, SocketResult, SocketType};
use tracing::trace;

pub struct InetTransport {
    endpoint: Endpoint,
    protocol: i32,
}

impl InetTransport {
    /// Resolves protocol 0 to the type's default protocol
    pub fn create(
        socket_type: i32,
        protocol: i32,
        config: &SocketConfig,
    ) -> SocketResult<(SocketType, Self)> {
        let socket_type = SocketType::from_raw(socket_type)?;
        let (protocol, endpoint) = match (socket_type, protocol) {
            (SocketType::Stream, IPPROTO_IP | IPPROTO_TCP) => {
                (IPPROTO_TCP, Endpoint::stream(config.stream_buffer_size))
            }
            (SocketType::Datagram, IPPROTO_IP | IPPROTO_UDP) => {
                (IPPROTO_UDP, Endpoint::datagram(config.datagram_queue_len))
            }
            (SocketType::Raw, protocol) if (0..=255).contains(&protocol) => {
                (protocol, Endpoint::datagram(config.datagram_queue_len))
            }
            (_, protocol) => return Err(SocketError::ProtocolNotSupported(protocol)),
        };
        Ok((socket_type, Self { endpoint, protocol }))
    }

    /// Resolved IP protocol number
    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn new_peer(&self) -> Self {
        Self {
            endpoint: self.endpoint.sibling(),
            protocol: self.protocol,
        }
    }
}

impl TransportOps for InetTransport {
    fn sendto(&self, data: &[u8]) -> SocketResult<Size> {
        self.endpoint.send(data)
    }

    fn recvfrom(&self, buf: &mut [u8]) -> SocketResult<Size> {
        self.endpoint.recv(buf)
    }

    fn shut_down_for_reading(&self) {
        trace!(protocol = self.protocol, "inet transport shut down for reading");
        self.endpoint.shut_down_for_reading();
    }

    fn shut_down_for_writing(&self) {
        trace!(protocol = self.protocol, "inet transport shut down for writing");
        self.endpoint.shut_down_for_writing();
    }

    fn is_connected(&self) -> bool {
        self.endpoint.is_linked()
    }
}
