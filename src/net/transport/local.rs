/*!
 * Local Transport
 * AF_LOCAL sockets over in-memory loopback channels
 */

use super::{Endpoint, TransportOps};
use crate::core::types::Size;
use crate::net::config::SocketConfig;
use crate::net::socket::{SocketError, SocketResult, SocketType};
use tracing::trace;

pub struct LocalTransport {
    endpoint: Endpoint,
}

impl LocalTransport {
    /// Stream and datagram only; the protocol argument is ignored
    pub fn create(socket_type: i32, config: &SocketConfig) -> SocketResult<(SocketType, Self)> {
        let socket_type = SocketType::from_raw(socket_type)?;
        let endpoint = match socket_type {
            SocketType::Stream => Endpoint::stream(config.stream_buffer_size),
            SocketType::Datagram => Endpoint::datagram(config.datagram_queue_len),
            SocketType::Raw => return Err(SocketError::SocketTypeNotSupported(socket_type.as_raw())),
        };
        Ok((socket_type, Self { endpoint }))
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn new_peer(&self) -> Self {
        Self {
            endpoint: self.endpoint.sibling(),
        }
    }
}

impl TransportOps for LocalTransport {
    fn sendto(&self, data: &[u8]) -> SocketResult<Size> {
        self.endpoint.send(data)
    }

    fn recvfrom(&self, buf: &mut [u8]) -> SocketResult<Size> {
        self.endpoint.recv(buf)
    }

    fn shut_down_for_reading(&self) {
        trace!("local transport shut down for reading");
        self.endpoint.shut_down_for_reading();
    }

    fn shut_down_for_writing(&self) {
        trace!("local transport shut down for writing");
        self.endpoint.shut_down_for_writing();
    }

    fn is_connected(&self) -> bool {
        self.endpoint.is_linked()
    }
}
