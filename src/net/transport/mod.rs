/*!
 * Transports
 * Closed set of address-family implementations behind one capability interface
 */

mod channel;
pub mod inet;
pub mod local;

pub(crate) use channel::Endpoint;
pub use inet::InetTransport;
pub use local::LocalTransport;

use crate::core::types::Size;
use crate::net::socket::SocketResult;

/// Operations the socket core invokes on a transport
///
/// The core never calls `sendto` once the socket is shut down for writing,
/// nor `recvfrom` once it is shut down for reading. Each shutdown hook is
/// called at most once per socket.
pub trait TransportOps: Send + Sync {
    fn sendto(&self, data: &[u8]) -> SocketResult<Size>;

    fn recvfrom(&self, buf: &mut [u8]) -> SocketResult<Size>;

    fn shut_down_for_reading(&self);

    fn shut_down_for_writing(&self);

    /// Whether the data path has a peer attached
    fn is_connected(&self) -> bool;
}

/// Transport owned by a socket, selected by address family
pub enum Transport {
    Local(LocalTransport),
    Inet(InetTransport),
    #[cfg(test)]
    Recording(recording::RecordingTransport),
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Local(_) => "local",
            Transport::Inet(_) => "inet",
            #[cfg(test)]
            Transport::Recording(_) => "recording",
        }
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        match self {
            Transport::Local(local) => local.endpoint(),
            Transport::Inet(inet) => inet.endpoint(),
            #[cfg(test)]
            Transport::Recording(recording) => recording.inner().endpoint(),
        }
    }

    /// Unlinked transport of the same variant, used for the accepting side
    /// of a new connection
    pub(crate) fn new_peer(&self) -> Transport {
        match self {
            Transport::Local(local) => Transport::Local(local.new_peer()),
            Transport::Inet(inet) => Transport::Inet(inet.new_peer()),
            #[cfg(test)]
            Transport::Recording(recording) => Transport::Recording(recording.new_peer()),
        }
    }

    /// Bytes or datagrams waiting to be read
    pub fn readable(&self) -> usize {
        self.endpoint().readable()
    }
}

impl TransportOps for Transport {
    fn sendto(&self, data: &[u8]) -> SocketResult<Size> {
        match self {
            Transport::Local(local) => local.sendto(data),
            Transport::Inet(inet) => inet.sendto(data),
            #[cfg(test)]
            Transport::Recording(recording) => recording.sendto(data),
        }
    }

    fn recvfrom(&self, buf: &mut [u8]) -> SocketResult<Size> {
        match self {
            Transport::Local(local) => local.recvfrom(buf),
            Transport::Inet(inet) => inet.recvfrom(buf),
            #[cfg(test)]
            Transport::Recording(recording) => recording.recvfrom(buf),
        }
    }

    fn shut_down_for_reading(&self) {
        match self {
            Transport::Local(local) => local.shut_down_for_reading(),
            Transport::Inet(inet) => inet.shut_down_for_reading(),
            #[cfg(test)]
            Transport::Recording(recording) => recording.shut_down_for_reading(),
        }
    }

    fn shut_down_for_writing(&self) {
        match self {
            Transport::Local(local) => local.shut_down_for_writing(),
            Transport::Inet(inet) => inet.shut_down_for_writing(),
            #[cfg(test)]
            Transport::Recording(recording) => recording.shut_down_for_writing(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Transport::Local(local) => local.is_connected(),
            Transport::Inet(inet) => inet.is_connected(),
            #[cfg(test)]
            Transport::Recording(recording) => recording.is_connected(),
        }
    }
}
