//! # Driver Context
//!
//! The explicit owner of all queue instances: a fixed-capacity arena of
//! pool slots, reused in place, addressed by typed index handles.
//!
//! The context performs no internal locking. Concurrent `init`/`deinit`
//! calls, or concurrent produce/consume on the same instance, must be
//! serialized by the caller; distinct instances are independent.

use gcq_core::{DeviceIo, Error, InstanceHandle, Result, version::DriverVersion};

use crate::driver_version;
use crate::instance::{Instance, InstanceConfig};

// =============================================================================
// POOL CAPACITY
// =============================================================================

/// Compile-time maximum number of live instances per context
pub const MAX_INSTANCES: usize = 8;

// =============================================================================
// CONTEXT
// =============================================================================

/// Fixed-capacity pool of queue instances
///
/// A pool slot holds at most one live instance. `deinit` clears the slot
/// for reuse; no memory is ever released. A stale handle names either an
/// empty slot or a recycled one, and both are rejected as
/// [`Error::InvalidInstance`] — handles carry no generation, matching the
/// external-serialization contract of the driver.
pub struct Context<Io: DeviceIo> {
    /// Instance slots, reused in place
    slots: [Option<Instance<Io>>; MAX_INSTANCES],
    /// Live instance count
    allocated: usize,
}

impl<Io: DeviceIo> Context<Io> {
    /// Create an empty context
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; MAX_INSTANCES],
            allocated: 0,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bring up one side of a queue pair
    ///
    /// Claims a free pool slot, validates the configuration, programs the
    /// endpoint and — for the producer role — publishes the ring header.
    /// Returns a typed handle for all further operations.
    pub fn init(&mut self, io: Io, config: &InstanceConfig) -> Result<InstanceHandle> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::NoFreeInstances)?;

        let instance = Instance::init(io, config)?;
        self.slots[index] = Some(instance);
        self.allocated += 1;

        log::debug!("instance slot {} allocated ({} live)", index, self.allocated);
        Ok(InstanceHandle::new(index as u32))
    }

    /// Tear down an instance and release its pool slot
    ///
    /// Ring memory and registers are left as they are; the slot is free
    /// for reuse immediately.
    pub fn deinit(&mut self, handle: InstanceHandle) -> Result<()> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(Error::InvalidInstance)?;
        if slot.take().is_none() {
            return Err(Error::InvalidInstance);
        }
        self.allocated -= 1;

        log::debug!("instance slot {} released ({} live)", handle.index(), self.allocated);
        Ok(())
    }

    /// Consumer handshake against the producer's published header
    pub fn attach_consumer(&mut self, handle: InstanceHandle) -> Result<()> {
        self.instance_mut(handle)?.attach()
    }

    // =========================================================================
    // Data path
    // =========================================================================

    /// Produce one payload onto the instance's producer ring
    ///
    /// `data.len()` must be a multiple of 4 and at most the producer slot
    /// size. A full ring is reported as [`Error::ProducerNoFreeSlots`]
    /// after one re-read of the peer's consumed counter; retry is the
    /// caller's job.
    pub fn produce_data(&mut self, handle: InstanceHandle, data: &[u8]) -> Result<()> {
        self.instance_mut(handle)?.produce(data)
    }

    /// Consume one payload from the instance's consumer ring
    ///
    /// `buf.len()` must be a multiple of 4 and at most the consumer slot
    /// size. An empty ring is reported as
    /// [`Error::ConsumerNoDataReceived`] after one re-read of the peer's
    /// produced counter.
    pub fn consume_data(&mut self, handle: InstanceHandle, buf: &mut [u8]) -> Result<()> {
        self.instance_mut(handle)?.consume(buf)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Borrow a live instance (stats, state, geometry)
    pub fn instance(&self, handle: InstanceHandle) -> Result<&Instance<Io>> {
        self.slots
            .get(handle.index())
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidInstance)
    }

    /// Number of live instances
    #[inline]
    pub const fn allocated(&self) -> usize {
        self.allocated
    }

    /// Pool capacity
    #[inline]
    pub const fn capacity() -> usize {
        MAX_INSTANCES
    }

    /// Driver version of this build
    #[inline]
    pub const fn version() -> DriverVersion {
        driver_version()
    }

    fn instance_mut(&mut self, handle: InstanceHandle) -> Result<&mut Instance<Io>> {
        self.slots
            .get_mut(handle.index())
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidInstance)
    }
}

impl<Io: DeviceIo> Default for Context<Io> {
    fn default() -> Self {
        Self::new()
    }
}
