/*!
 * Networking
 * Socket layer, transports, and network devices
 */

pub mod config;
pub mod device;
pub mod socket;
pub mod transport;

pub use config::SocketConfig;
pub use device::{DeviceRegistry, NetworkDevice, LOOPBACK_NAME};
pub use socket::{
    Domain, Role, SetupState, Shutdown, ShutdownState, Socket, SocketError, SocketFactory,
    SocketOption, SocketResult, SocketType, Timeval,
};
pub use transport::{Transport, TransportOps};
