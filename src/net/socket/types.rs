/*!
 * Socket Types
 * Classification, lifecycle states, and errors for the generic socket layer
 */

use crate::core::data_structures::InlineString;
use crate::core::limits::{
    AF_INET, AF_LOCAL, SHUT_RD, SHUT_RDWR, SHUT_WR, SOCK_DGRAM, SOCK_RAW, SOCK_STREAM,
};
use crate::memory::UserFault;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Socket identifier, unique for the lifetime of the kernel (used for tracing)
pub type SocketId = u64;

pub type SocketResult<T> = Result<T, SocketError>;

/// Address family a socket was created in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Local,
    Inet,
}

impl Domain {
    pub fn from_raw(domain: i32) -> SocketResult<Self> {
        match domain {
            AF_LOCAL => Ok(Self::Local),
            AF_INET => Ok(Self::Inet),
            other => Err(SocketError::AddressFamilyNotSupported(other)),
        }
    }

    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Local => AF_LOCAL,
            Self::Inet => AF_INET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    Stream,
    Datagram,
    Raw,
}

impl SocketType {
    /// Parse an already-masked type value
    pub fn from_raw(socket_type: i32) -> SocketResult<Self> {
        match socket_type {
            SOCK_STREAM => Ok(Self::Stream),
            SOCK_DGRAM => Ok(Self::Datagram),
            SOCK_RAW => Ok(Self::Raw),
            other => Err(SocketError::SocketTypeNotSupported(other)),
        }
    }

    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Stream => SOCK_STREAM,
            Self::Datagram => SOCK_DGRAM,
            Self::Raw => SOCK_RAW,
        }
    }

    #[inline]
    pub const fn is_connection_oriented(self) -> bool {
        matches!(self, Self::Stream)
    }
}

/// Connection-lifecycle phase of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Role {
    Unconnected = 0,
    Listener = 1,
    Connecting = 2,
    Connected = 3,
    Accepted = 4,
}

impl Role {
    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Listener,
            2 => Self::Connecting,
            3 => Self::Connected,
            4 => Self::Accepted,
            _ => Self::Unconnected,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unconnected => "unconnected",
            Self::Listener => "listener",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of connection establishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SetupState {
    Unstarted = 0,
    InProgress = 1,
    Completed = 2,
}

impl SetupState {
    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::InProgress,
            2 => Self::Completed,
            _ => Self::Unstarted,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directions selected by a `shutdown()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shutdown {
    Read,
    Write,
    Both,
}

impl Shutdown {
    /// Parse a `SHUT_RD | SHUT_WR` bit set
    pub fn from_raw(how: i32) -> SocketResult<Self> {
        match how {
            SHUT_RD => Ok(Self::Read),
            SHUT_WR => Ok(Self::Write),
            SHUT_RDWR => Ok(Self::Both),
            other => Err(SocketError::invalid_argument(format!(
                "shutdown direction {}",
                other
            ))),
        }
    }

    #[inline]
    pub const fn reads(self) -> bool {
        matches!(self, Self::Read | Self::Both)
    }

    #[inline]
    pub const fn writes(self) -> bool {
        matches!(self, Self::Write | Self::Both)
    }
}

/// Socket-layer errors
///
/// Every variant is an ordinary, reportable outcome; [`SocketError::errno`]
/// gives the value the syscall layer hands back to user space.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SocketError {
    #[error("Address family {0} not supported")]
    #[diagnostic(
        code(socket::address_family_not_supported),
        help("Only AF_LOCAL and AF_INET sockets can be created.")
    )]
    AddressFamilyNotSupported(i32),

    #[error("Socket type {0} not supported")]
    #[diagnostic(code(socket::type_not_supported))]
    SocketTypeNotSupported(i32),

    #[error("Protocol {0} not supported for this socket type")]
    #[diagnostic(code(socket::protocol_not_supported))]
    ProtocolNotSupported(i32),

    #[error("Connection refused")]
    #[diagnostic(
        code(socket::connection_refused),
        help("The listener's backlog is full or the target is not listening.")
    )]
    ConnectionRefused,

    #[error("No pending connection")]
    #[diagnostic(
        code(socket::no_pending_connection),
        help("Retry accept() once the listener becomes readable.")
    )]
    NoPendingConnection,

    #[error("Operation would block")]
    #[diagnostic(code(socket::would_block))]
    WouldBlock,

    #[error("Socket is not connected")]
    #[diagnostic(code(socket::not_connected))]
    NotConnected,

    #[error("Socket is already connected")]
    #[diagnostic(code(socket::already_connected))]
    AlreadyConnected,

    #[error("Destination address required")]
    #[diagnostic(code(socket::destination_required))]
    DestinationRequired,

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(socket::invalid_argument))]
    InvalidArgument(InlineString),

    #[error("Bad address")]
    #[diagnostic(
        code(socket::bad_address),
        help("A user-space buffer could not be read or written.")
    )]
    BadAddress,

    #[error("No such device: {0}")]
    #[diagnostic(code(socket::no_such_device))]
    NoSuchDevice(InlineString),

    #[error("Option {option} at level {level} not supported")]
    #[diagnostic(code(socket::option_not_supported))]
    OptionNotSupported { level: i32, option: i32 },

    #[error("Broken pipe")]
    #[diagnostic(code(socket::broken_pipe))]
    BrokenPipe,

    #[error("Operation not supported: {0}")]
    #[diagnostic(code(socket::operation_not_supported))]
    OperationNotSupported(InlineString),
}

impl SocketError {
    #[inline]
    pub fn invalid_argument(msg: impl Into<InlineString>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    #[inline]
    pub fn no_such_device(name: impl Into<InlineString>) -> Self {
        Self::NoSuchDevice(name.into())
    }

    #[inline]
    pub fn operation_not_supported(msg: impl Into<InlineString>) -> Self {
        Self::OperationNotSupported(msg.into())
    }

    /// Linux errno for this error [LINUX-COMPAT]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::AddressFamilyNotSupported(_) => 97, // EAFNOSUPPORT
            Self::SocketTypeNotSupported(_) => 94,    // ESOCKTNOSUPPORT
            Self::ProtocolNotSupported(_) => 93,      // EPROTONOSUPPORT
            Self::ConnectionRefused => 111,           // ECONNREFUSED
            Self::NoPendingConnection | Self::WouldBlock => 11, // EAGAIN
            Self::NotConnected => 107,                // ENOTCONN
            Self::AlreadyConnected => 106,            // EISCONN
            Self::DestinationRequired => 89,          // EDESTADDRREQ
            Self::InvalidArgument(_) => 22,           // EINVAL
            Self::BadAddress => 14,                   // EFAULT
            Self::NoSuchDevice(_) => 19,              // ENODEV
            Self::OptionNotSupported { .. } => 92,    // ENOPROTOOPT
            Self::BrokenPipe => 32,                   // EPIPE
            Self::OperationNotSupported(_) => 95,     // EOPNOTSUPP
        }
    }
}

impl From<UserFault> for SocketError {
    fn from(_: UserFault) -> Self {
        SocketError::BadAddress
    }
}
