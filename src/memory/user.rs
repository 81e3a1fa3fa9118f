/*!
 * User Memory Access
 * Fallible copies across the user/kernel boundary
 */

use crate::core::types::Size;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Opaque address in a process' address space
///
/// Never dereferenced by the kernel; every access goes through [`UserMemory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UserPtr(usize);

impl UserPtr {
    #[inline]
    pub const fn new(address: usize) -> Self {
        Self(address)
    }

    #[inline]
    pub const fn null() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn offset(self, bytes: usize) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Display for UserPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A user-space access touched memory that is not mapped (or not writable)
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Bad user address 0x{address:x}")]
pub struct UserFault {
    pub address: usize,
}

impl UserFault {
    #[inline]
    pub const fn new(address: usize) -> Self {
        Self { address }
    }
}

/// Copy primitives for one process' address space
///
/// A failed copy leaves the destination unspecified; callers must not
/// apply any state derived from it.
pub trait UserMemory: Send + Sync {
    fn copy_from_user(&self, src: UserPtr, dst: &mut [u8]) -> Result<(), UserFault>;

    fn copy_to_user(&self, dst: UserPtr, src: &[u8]) -> Result<(), UserFault>;

    /// Read a `socklen_t`
    fn read_u32(&self, src: UserPtr) -> Result<u32, UserFault> {
        let mut bytes = [0u8; 4];
        self.copy_from_user(src, &mut bytes)?;
        Ok(u32::from_ne_bytes(bytes))
    }

    /// Write a `socklen_t`
    fn write_u32(&self, dst: UserPtr, value: u32) -> Result<(), UserFault> {
        self.copy_to_user(dst, &value.to_ne_bytes())
    }

    /// Write an `int`
    fn write_i32(&self, dst: UserPtr, value: i32) -> Result<(), UserFault> {
        self.copy_to_user(dst, &value.to_ne_bytes())
    }
}

struct Region {
    data: Vec<u8>,
    writable: bool,
}

/// Simulated process address space
///
/// Regions are handed out with a guard gap between them, so any access that
/// runs off the end of a mapping faults instead of spilling into a neighbour.
/// Clones share the same mappings.
#[derive(Clone)]
pub struct SimulatedUserMemory {
    regions: Arc<RwLock<BTreeMap<usize, Region>>>,
    next_address: Arc<AtomicUsize>,
}

const USER_BASE: usize = 0x1000_0000;
const PAGE_SIZE: usize = 4096;

impl SimulatedUserMemory {
    pub fn new() -> Self {
        Self {
            regions: Arc::new(RwLock::new(BTreeMap::new())),
            next_address: Arc::new(AtomicUsize::new(USER_BASE)),
        }
    }

    fn reserve(&self, size: Size) -> usize {
        // Round up and leave one unmapped page as a guard
        let span = (size.max(1) + PAGE_SIZE - 1) / PAGE_SIZE * PAGE_SIZE + PAGE_SIZE;
        self.next_address.fetch_add(span, Ordering::SeqCst)
    }

    /// Map a zeroed, writable region
    pub fn allocate(&self, size: Size) -> UserPtr {
        let base = self.reserve(size);
        self.regions.write().insert(
            base,
            Region {
                data: vec![0u8; size],
                writable: true,
            },
        );
        trace!(base, size, "mapped user region");
        UserPtr::new(base)
    }

    /// Map a writable region initialised with `data`
    pub fn allocate_with(&self, data: &[u8]) -> UserPtr {
        let ptr = self.allocate(data.len());
        if let Some(region) = self.regions.write().get_mut(&ptr.addr()) {
            region.data.copy_from_slice(data);
        }
        ptr
    }

    /// Map a region user space may read but not write
    pub fn allocate_read_only(&self, data: &[u8]) -> UserPtr {
        let base = self.reserve(data.len());
        self.regions.write().insert(
            base,
            Region {
                data: data.to_vec(),
                writable: false,
            },
        );
        UserPtr::new(base)
    }

    /// Remove a mapping; later accesses fault
    pub fn unmap(&self, ptr: UserPtr) -> bool {
        self.regions.write().remove(&ptr.addr()).is_some()
    }

    /// Kernel-side view of user memory (no write-protection check)
    pub fn read_bytes(&self, ptr: UserPtr, size: Size) -> Result<Vec<u8>, UserFault> {
        let mut out = vec![0u8; size];
        self.copy_from_user(ptr, &mut out)?;
        Ok(out)
    }

    /// Kernel-side initialisation of user memory (ignores write protection)
    pub fn write_bytes(&self, ptr: UserPtr, data: &[u8]) -> Result<(), UserFault> {
        let mut regions = self.regions.write();
        let (offset, region) = Self::locate_mut(&mut regions, ptr, data.len())?;
        region.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn locate(
        regions: &BTreeMap<usize, Region>,
        ptr: UserPtr,
        len: usize,
    ) -> Result<(usize, &Region), UserFault> {
        let fault = UserFault::new(ptr.addr());
        let (base, region) = regions.range(..=ptr.addr()).next_back().ok_or(fault)?;
        let offset = ptr.addr() - base;
        let end = offset.checked_add(len).ok_or(fault)?;
        if end > region.data.len() {
            return Err(fault);
        }
        Ok((offset, region))
    }

    fn locate_mut(
        regions: &mut BTreeMap<usize, Region>,
        ptr: UserPtr,
        len: usize,
    ) -> Result<(usize, &mut Region), UserFault> {
        let fault = UserFault::new(ptr.addr());
        let (base, region) = regions.range_mut(..=ptr.addr()).next_back().ok_or(fault)?;
        let offset = ptr.addr() - base;
        let end = offset.checked_add(len).ok_or(fault)?;
        if end > region.data.len() {
            return Err(fault);
        }
        Ok((offset, region))
    }
}

impl Default for SimulatedUserMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserMemory for SimulatedUserMemory {
    fn copy_from_user(&self, src: UserPtr, dst: &mut [u8]) -> Result<(), UserFault> {
        if dst.is_empty() {
            return Ok(());
        }
        let regions = self.regions.read();
        let (offset, region) = Self::locate(&regions, src, dst.len())?;
        dst.copy_from_slice(&region.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn copy_to_user(&self, dst: UserPtr, src: &[u8]) -> Result<(), UserFault> {
        if src.is_empty() {
            return Ok(());
        }
        let mut regions = self.regions.write();
        let (offset, region) = Self::locate_mut(&mut regions, dst, src.len())?;
        if !region.writable {
            return Err(UserFault::new(dst.addr()));
        }
        region.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}
