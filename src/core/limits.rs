/*!
 * System Limits and Constants
 *
 * Centralized location for socket-layer limits and ABI numbers.
 *
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 * - Performance-relevant defaults are marked with [PERF]
 */

// =============================================================================
// ADDRESS FAMILIES / SOCKET TYPES
// =============================================================================

/// Local (unix-domain) sockets [LINUX-COMPAT]
pub const AF_LOCAL: i32 = 1;
/// IPv4 sockets [LINUX-COMPAT]
pub const AF_INET: i32 = 2;

pub const SOCK_STREAM: i32 = 1;
pub const SOCK_DGRAM: i32 = 2;
pub const SOCK_RAW: i32 = 3;

/// Bits of the `type` argument that select the socket type.
/// Everything above it is per-descriptor flags.
pub const SOCK_TYPE_MASK: i32 = 0xf;
pub const SOCK_NONBLOCK: i32 = 0o4000;
pub const SOCK_CLOEXEC: i32 = 0o2000000;

pub const IPPROTO_IP: i32 = 0;
pub const IPPROTO_TCP: i32 = 6;
pub const IPPROTO_UDP: i32 = 17;

// =============================================================================
// SOCKET OPTIONS
// =============================================================================

/// Generic socket option level [LINUX-COMPAT]
pub const SOL_SOCKET: i32 = 1;

pub const SO_ERROR: i32 = 4;
pub const SO_KEEPALIVE: i32 = 9;
pub const SO_RCVTIMEO: i32 = 20;
pub const SO_SNDTIMEO: i32 = 21;
pub const SO_BINDTODEVICE: i32 = 25;

/// Fixed interface-name buffer size, NUL terminator included [LINUX-COMPAT]
pub const IFNAMSIZ: usize = 16;

/// `struct timeval { i64 tv_sec; i64 tv_usec; }`
pub const TIMEVAL_SIZE: usize = 16;

/// `socklen_t`
pub const SOCKLEN_SIZE: usize = 4;

/// `int`
pub const INT_SIZE: usize = 4;

// =============================================================================
// SHUTDOWN
// =============================================================================

/// Shutdown direction bits, combinable
pub const SHUT_RD: i32 = 1;
pub const SHUT_WR: i32 = 2;
pub const SHUT_RDWR: i32 = SHUT_RD | SHUT_WR;

// =============================================================================
// QUEUES AND BUFFERS
// =============================================================================

/// Upper bound for a listen backlog [LINUX-COMPAT]
pub const SOMAXCONN: usize = 128;

/// Per-direction stream buffer (64KB) [PERF]
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Datagrams held per endpoint before senders see EAGAIN
pub const DEFAULT_DATAGRAM_QUEUE_LEN: usize = 64;

/// Largest datagram accepted by the loopback transports (64KB)
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;
