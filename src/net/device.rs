/*!
 * Network Devices
 * Registry of network interfaces that sockets can bind to by name
 */

use super::socket::{SocketError, SocketResult};
use crate::core::data_structures::InlineString;
use crate::core::limits::IFNAMSIZ;
use ahash::RandomState;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

/// Loopback interface name
pub const LOOPBACK_NAME: &str = "lo";

/// A network interface
///
/// Owned by the registry. Sockets only ever hold a `Weak` reference.
#[derive(Debug, Serialize)]
pub struct NetworkDevice {
    name: InlineString,
    index: u32,
    mtu: u32,
}

impl NetworkDevice {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn mtu(&self) -> u32 {
        self.mtu
    }
}

/// Name-indexed device registry (clones share state)
#[derive(Clone)]
pub struct DeviceRegistry {
    devices: Arc<DashMap<InlineString, Arc<NetworkDevice>, RandomState>>,
    next_index: Arc<AtomicU32>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_index: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Registry holding only the loopback interface
    pub fn with_loopback() -> Self {
        let registry = Self::new();
        // Fresh registry and a valid name: registration cannot collide
        let _ = registry.register(LOOPBACK_NAME, 65536);
        registry
    }

    /// Add an interface; names must fit in `IFNAMSIZ` with their terminator
    pub fn register(&self, name: &str, mtu: u32) -> SocketResult<Arc<NetworkDevice>> {
        if name.is_empty() || name.len() >= IFNAMSIZ || name.contains('\0') {
            return Err(SocketError::invalid_argument(format!(
                "invalid interface name {:?}",
                name
            )));
        }

        let key = InlineString::from(name);
        match self.devices.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SocketError::invalid_argument(
                format!("interface {} already registered", name),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let device = Arc::new(NetworkDevice {
                    name: InlineString::from(name),
                    index: self.next_index.fetch_add(1, Ordering::SeqCst),
                    mtu,
                });
                slot.insert(Arc::clone(&device));
                info!(name, index = device.index, mtu, "registered network device");
                Ok(device)
            }
        }
    }

    /// Remove an interface. Sockets bound to it keep a dangling weak reference.
    pub fn unregister(&self, name: &str) -> Option<Arc<NetworkDevice>> {
        let removed = self.devices.remove(name).map(|(_, device)| device);
        if removed.is_some() {
            info!(name, "unregistered network device");
        }
        removed
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<NetworkDevice>> {
        self.devices.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
