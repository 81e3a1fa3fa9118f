/*!
 * Core Types
 * Common types used across the kernel
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID type
pub type Pid = u32;

/// User ID type
pub type Uid = u32;

/// Group ID type
pub type Gid = u32;

/// Size type for memory operations
pub type Size = usize;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

/// Identity of a process at a single point in time
///
/// Captured by value: a later change of the process' uid/gid does not
/// affect a record that has already been stamped onto a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    pub pid: Pid,
    pub uid: Uid,
    pub gid: Gid,
}

impl Credentials {
    #[inline]
    pub const fn new(pid: Pid, uid: Uid, gid: Gid) -> Self {
        Self { pid, uid, gid }
    }

    /// Kernel-internal identity (pid 0, root)
    #[inline]
    pub const fn kernel() -> Self {
        Self::new(0, 0, 0)
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid={} uid={} gid={}", self.pid, self.uid, self.gid)
    }
}
