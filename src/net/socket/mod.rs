/*!
 * Socket Module
 * Generic socket layer shared by every transport
 */

pub mod factory;
pub mod options;
pub mod socket;
pub mod types;

// Re-export public API
pub use factory::SocketFactory;
pub use options::{parse_ifname, option_size, SocketOption, Timeval};
pub use socket::{ShutdownState, Socket};
pub use types::{Domain, Role, SetupState, Shutdown, SocketError, SocketId, SocketResult, SocketType};
