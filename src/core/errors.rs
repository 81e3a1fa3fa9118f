/*!
 * Error Types
 * Unified kernel error with miette diagnostics
 */

use crate::core::data_structures::InlineString;
use miette::Diagnostic;
use thiserror::Error;

pub use crate::memory::UserFault;
pub use crate::net::SocketError;

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Socket error: {0}")]
    #[diagnostic(transparent)]
    Socket(#[from] SocketError),

    #[error("User memory fault: {0}")]
    #[diagnostic(
        code(kernel::user_fault),
        help("A user-space pointer did not reference mapped memory.")
    )]
    UserMemory(#[from] UserFault),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(kernel::configuration_error),
        help("Invalid configuration. Review configuration parameters.")
    )]
    Configuration(InlineString),
}

impl KernelError {
    #[inline]
    pub fn configuration(msg: impl Into<InlineString>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::Configuration(err.to_string().into())
    }
}
