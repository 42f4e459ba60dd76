//! # Device I/O Contract
//!
//! The access seam between the queue protocol and the platform.
//!
//! Everything the stack does to hardware goes through the four operations
//! of [`DeviceIo`]: 32-bit register reads/writes and 32-bit shared-memory
//! reads/writes. The trait is injected at construction, which replaces the
//! classic driver-side function-pointer table; all four operations are
//! statically present, so there is nothing left to null-check at init time.

use crate::types::DeviceAddr;

// =============================================================================
// DEVICE I/O TRAIT
// =============================================================================

/// 32-bit register and shared-memory access bound to one endpoint
///
/// Implementations resolve [`DeviceAddr`] values against whatever mapping
/// the platform provides (MMIO BAR, mapped shared memory, a simulator).
///
/// ## Contract
///
/// - All addresses passed in are 4-byte aligned; the protocol layer only
///   ever produces aligned addresses.
/// - Register accesses must not be merged, reordered or cached; they are
///   device-visible side effects.
/// - Memory accesses target the already-mapped ring region, which stays
///   stable for the lifetime of the instance that holds this value.
///
/// Accesses take `&self`: hardware access is a shared-resource side effect,
/// and serialization per direction is the caller's responsibility.
pub trait DeviceIo {
    /// Read a 32-bit hardware register
    fn read_reg32(&self, addr: DeviceAddr) -> u32;

    /// Write a 32-bit hardware register
    fn write_reg32(&self, addr: DeviceAddr, value: u32);

    /// Read a 32-bit word from shared ring memory
    fn read_mem32(&self, addr: DeviceAddr) -> u32;

    /// Write a 32-bit word to shared ring memory
    fn write_mem32(&self, addr: DeviceAddr, value: u32);
}

// Forwarding impl so callers can hand out borrows of one shared access
// object (two instances over the same mapping in tests, for example).
impl<T: DeviceIo + ?Sized> DeviceIo for &T {
    #[inline]
    fn read_reg32(&self, addr: DeviceAddr) -> u32 {
        (**self).read_reg32(addr)
    }

    #[inline]
    fn write_reg32(&self, addr: DeviceAddr, value: u32) {
        (**self).write_reg32(addr, value)
    }

    #[inline]
    fn read_mem32(&self, addr: DeviceAddr) -> u32 {
        (**self).read_mem32(addr)
    }

    #[inline]
    fn write_mem32(&self, addr: DeviceAddr, value: u32) {
        (**self).write_mem32(addr, value)
    }
}
