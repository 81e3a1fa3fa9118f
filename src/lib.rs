/*!
 * AI-OS Socket Layer
 * Generic socket core (factory, accept queue, options, shutdown) exposed as a library
 */

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod net;

// Re-exports
pub use crate::core::{Credentials, InlineString, KernelError, KernelResult, Pid};
pub use memory::{SimulatedUserMemory, UserFault, UserMemory, UserPtr};
pub use monitoring::{init_tracing, span_operation};
pub use net::{
    DeviceRegistry, Domain, NetworkDevice, Role, SetupState, Shutdown, ShutdownState, Socket,
    SocketConfig, SocketError, SocketFactory, SocketOption, SocketResult, SocketType, Timeval,
};
