/*!
 * Socket Options
 * Generic (SOL_SOCKET level) setsockopt/getsockopt
 */

use super::socket::Socket;
use super::types::{SocketError, SocketResult};
use crate::core::limits::{
    IFNAMSIZ, INT_SIZE, SOL_SOCKET, SO_BINDTODEVICE, SO_ERROR, SO_KEEPALIVE,
    SO_RCVTIMEO, SO_SNDTIMEO, TIMEVAL_SIZE,
};
use crate::memory::{UserMemory, UserPtr};
use crate::net::device::NetworkDevice;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Options understood at the generic socket level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketOption {
    SendTimeout,
    ReceiveTimeout,
    BindToDevice,
    /// Read-only
    Error,
    /// Accepted, no probing
    KeepAlive,
}

impl SocketOption {
    pub fn from_raw(level: i32, option: i32) -> SocketResult<Self> {
        if level != SOL_SOCKET {
            warn!(level, option, "socket option level not handled by the generic layer");
            return Err(SocketError::OptionNotSupported { level, option });
        }
        match option {
            SO_SNDTIMEO => Ok(Self::SendTimeout),
            SO_RCVTIMEO => Ok(Self::ReceiveTimeout),
            SO_BINDTODEVICE => Ok(Self::BindToDevice),
            SO_ERROR => Ok(Self::Error),
            SO_KEEPALIVE => Ok(Self::KeepAlive),
            _ => Err(Self::unsupported(option)),
        }
    }

    pub const fn as_raw(self) -> i32 {
        match self {
            Self::SendTimeout => SO_SNDTIMEO,
            Self::ReceiveTimeout => SO_RCVTIMEO,
            Self::BindToDevice => SO_BINDTODEVICE,
            Self::Error => SO_ERROR,
            Self::KeepAlive => SO_KEEPALIVE,
        }
    }

    fn unsupported(option: i32) -> SocketError {
        debug!(option, "socket option not implemented at SOL_SOCKET");
        SocketError::OptionNotSupported {
            level: SOL_SOCKET,
            option,
        }
    }
}

/// `struct timeval` as laid out in user memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeval {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

impl Timeval {
    pub const ZERO: Timeval = Timeval {
        tv_sec: 0,
        tv_usec: 0,
    };

    pub fn from_duration(duration: Duration) -> Self {
        Self {
            tv_sec: i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
            tv_usec: i64::from(duration.subsec_micros()),
        }
    }

    /// `None` for a zero (or negative) value, meaning "no timeout"
    pub fn to_duration(self) -> Option<Duration> {
        if self.tv_sec < 0 || self.tv_usec < 0 || (self.tv_sec == 0 && self.tv_usec == 0) {
            return None;
        }
        let secs = self.tv_sec as u64 + (self.tv_usec / 1_000_000) as u64;
        let micros = (self.tv_usec % 1_000_000) as u32;
        Some(Duration::new(secs, micros * 1_000))
    }

    pub fn to_ne_bytes(self) -> [u8; TIMEVAL_SIZE] {
        let mut bytes = [0u8; TIMEVAL_SIZE];
        bytes[..8].copy_from_slice(&self.tv_sec.to_ne_bytes());
        bytes[8..].copy_from_slice(&self.tv_usec.to_ne_bytes());
        bytes
    }

    pub fn from_ne_bytes(bytes: [u8; TIMEVAL_SIZE]) -> Self {
        let mut sec = [0u8; 8];
        let mut usec = [0u8; 8];
        sec.copy_from_slice(&bytes[..8]);
        usec.copy_from_slice(&bytes[8..]);
        Self {
            tv_sec: i64::from_ne_bytes(sec),
            tv_usec: i64::from_ne_bytes(usec),
        }
    }
}

/// Interface name as read from an `IFNAMSIZ` user buffer
///
/// Stops at the first NUL; a buffer without one uses all `IFNAMSIZ` bytes.
pub fn parse_ifname(raw: &[u8; IFNAMSIZ]) -> Result<&str, String> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(IFNAMSIZ);
    std::str::from_utf8(&raw[..end]).map_err(|_| String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Per-socket option values
#[derive(Debug, Default)]
pub(crate) struct OptionStore {
    pub send_timeout: Timeval,
    pub receive_timeout: Timeval,
    /// Non-owning: the device registry controls device lifetime
    pub bound_interface: Option<Weak<NetworkDevice>>,
}

impl Socket {
    /// `setsockopt(level, option, value, value_size)`
    ///
    /// User memory is copied before any state is touched, so a fault leaves
    /// the previous value in place.
    pub fn setsockopt(
        &self,
        mem: &dyn UserMemory,
        level: i32,
        option: i32,
        value: UserPtr,
        value_size: u32,
    ) -> SocketResult<()> {
        let option = SocketOption::from_raw(level, option)?;
        let value_size = value_size as usize;

        match option {
            SocketOption::SendTimeout | SocketOption::ReceiveTimeout => {
                if value_size != TIMEVAL_SIZE {
                    return Err(SocketError::invalid_argument(format!(
                        "timeout option needs {} bytes, got {}",
                        TIMEVAL_SIZE, value_size
                    )));
                }
                let mut raw = [0u8; TIMEVAL_SIZE];
                mem.copy_from_user(value, &mut raw)?;
                let timeout = Timeval::from_ne_bytes(raw);

                let mut inner = self.inner.lock();
                if option == SocketOption::SendTimeout {
                    inner.options.send_timeout = timeout;
                } else {
                    inner.options.receive_timeout = timeout;
                }
                debug!(socket = self.id(), ?option, ?timeout, "timeout updated");
                Ok(())
            }
            SocketOption::BindToDevice => {
                if value_size != IFNAMSIZ {
                    return Err(SocketError::invalid_argument(format!(
                        "interface name buffer must be {} bytes, got {}",
                        IFNAMSIZ, value_size
                    )));
                }
                let mut raw = [0u8; IFNAMSIZ];
                mem.copy_from_user(value, &mut raw)?;
                let name = parse_ifname(&raw).map_err(SocketError::no_such_device)?;
                let device = self
                    .devices
                    .lookup_by_name(name)
                    .ok_or_else(|| SocketError::no_such_device(name))?;

                self.inner.lock().options.bound_interface = Some(Arc::downgrade(&device));
                debug!(socket = self.id(), device = name, "bound to device");
                Ok(())
            }
            SocketOption::KeepAlive => {
                debug!(socket = self.id(), "SO_KEEPALIVE accepted; no keepalive probes are sent");
                Ok(())
            }
            SocketOption::Error => Err(SocketOption::unsupported(SO_ERROR)),
        }
    }

    /// `getsockopt(level, option, value, value_size)`
    ///
    /// `value_size` is read first and must be at least the option's size;
    /// on success it is overwritten with the number of bytes produced.
    pub fn getsockopt(
        &self,
        mem: &dyn UserMemory,
        level: i32,
        option: i32,
        value: UserPtr,
        value_size: UserPtr,
    ) -> SocketResult<()> {
        let size = mem.read_u32(value_size)? as usize;
        let option = SocketOption::from_raw(level, option)?;

        match option {
            SocketOption::SendTimeout | SocketOption::ReceiveTimeout => {
                if size < TIMEVAL_SIZE {
                    return Err(SocketError::invalid_argument(format!(
                        "timeout option needs {} bytes, got {}",
                        TIMEVAL_SIZE, size
                    )));
                }
                let timeout = {
                    let inner = self.inner.lock();
                    if option == SocketOption::SendTimeout {
                        inner.options.send_timeout
                    } else {
                        inner.options.receive_timeout
                    }
                };
                mem.copy_to_user(value, &timeout.to_ne_bytes())?;
                mem.write_u32(value_size, TIMEVAL_SIZE as u32)?;
                Ok(())
            }
            SocketOption::Error => {
                if size < INT_SIZE {
                    return Err(SocketError::invalid_argument(format!(
                        "SO_ERROR needs {} bytes, got {}",
                        INT_SIZE, size
                    )));
                }
                // Deferred errors are not tracked; there is never one to report
                mem.write_i32(value, 0)?;
                mem.write_u32(value_size, INT_SIZE as u32)?;
                Ok(())
            }
            SocketOption::BindToDevice => {
                if size < IFNAMSIZ {
                    return Err(SocketError::invalid_argument(format!(
                        "interface name buffer must be at least {} bytes, got {}",
                        IFNAMSIZ, size
                    )));
                }
                match self.bound_interface() {
                    Some(device) => {
                        let mut name = Vec::with_capacity(IFNAMSIZ);
                        name.extend_from_slice(device.name().as_bytes());
                        name.push(0);
                        mem.copy_to_user(value, &name)?;
                        mem.write_u32(value_size, name.len() as u32)?;
                        Ok(())
                    }
                    None => {
                        // Unbound is reported as EFAULT with a zero length
                        mem.write_u32(value_size, 0)?;
                        Err(SocketError::BadAddress)
                    }
                }
            }
            SocketOption::KeepAlive => Err(SocketOption::unsupported(SO_KEEPALIVE)),
        }
    }

    /// Stored send timeout; enforcement is up to the transport
    pub fn send_timeout(&self) -> Option<Duration> {
        self.inner.lock().options.send_timeout.to_duration()
    }

    /// Stored receive timeout; enforcement is up to the transport
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.inner.lock().options.receive_timeout.to_duration()
    }

    /// Bound device, if any and if it still exists
    pub fn bound_interface(&self) -> Option<Arc<NetworkDevice>> {
        self.inner
            .lock()
            .options
            .bound_interface
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

/// Size the caller must reserve for `option`'s value
pub const fn option_size(option: SocketOption) -> usize {
    match option {
        SocketOption::SendTimeout | SocketOption::ReceiveTimeout => TIMEVAL_SIZE,
        SocketOption::BindToDevice => IFNAMSIZ,
        SocketOption::Error | SocketOption::KeepAlive => INT_SIZE,
    }
}
