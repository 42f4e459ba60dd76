//! # Queue Instance
//!
//! One side of a queue pair: two rings over one shared memory region, the
//! bound I/O access, and the role-dependent produce/consume paths.
//!
//! Role assignment mirrors the queue pair: the producer side produces onto
//! the CQ and consumes from the SQ; the consumer side is the mirror. Each
//! side publishes its produced counter through its own register block (or
//! the header, with in-memory pointers) and its consumed counter through
//! the header.

use gcq_core::{
    Capabilities, DeviceAddr, DeviceIo, Error, InterruptMode, Result, Role,
    version::{DRIVER_VERSION, DriverVersion},
};
use gcq_hal::{hw, regs};
use gcq_ring::{
    ReadMode, Ring, RingStats, TailPointer,
    header::{self, RING_MAGIC, RingHeader},
};

// =============================================================================
// INSTANCE CONFIG
// =============================================================================

/// Everything needed to bring up one side of a queue pair
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Which side of the pair this instance plays
    pub role: Role,
    /// Peer notification strategy
    pub interrupt_mode: InterruptMode,
    /// Endpoint capability flags
    pub capabilities: Capabilities,
    /// Base address of the endpoint register file
    pub base_addr: DeviceAddr,
    /// Base address of the shared ring memory
    pub ring_addr: DeviceAddr,
    /// Length of the shared ring memory in bytes
    pub ring_len: u64,
    /// Submission slot size in bytes (nonzero, multiple of 4)
    pub sq_slot_size: u32,
    /// Completion slot size in bytes (nonzero, multiple of 4)
    pub cq_slot_size: u32,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            role: Role::Producer,
            interrupt_mode: InterruptMode::Polling,
            capabilities: Capabilities::empty(),
            base_addr: DeviceAddr::null(),
            ring_addr: DeviceAddr::null(),
            ring_len: 0x1000,
            sq_slot_size: 512,
            cq_slot_size: 256,
        }
    }
}

// =============================================================================
// INSTANCE STATE
// =============================================================================

/// Instance lifecycle state
///
/// The uninitialized stage is the absent pool slot; a live instance starts
/// at `Initialized` and a consumer advances to `Attached` after a
/// successful handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Rings are programmed; producer instances are fully operational
    Initialized,
    /// Consumer handshake completed; consuming is permitted
    Attached,
}

impl InstanceState {
    /// Check whether the consumer handshake has completed
    #[inline]
    pub const fn is_attached(self) -> bool {
        matches!(self, Self::Attached)
    }
}

// =============================================================================
// INSTANCE STATS
// =============================================================================

/// Traffic statistics for both rings of an instance
#[derive(Debug, Clone, Copy)]
pub struct InstanceStats {
    /// Submission ring counters
    pub sq: RingStats,
    /// Completion ring counters
    pub cq: RingStats,
}

// =============================================================================
// INSTANCE
// =============================================================================

/// One side of a queue pair
#[derive(Debug)]
pub struct Instance<Io: DeviceIo> {
    /// Bound device access
    io: Io,
    /// Which side of the pair this instance plays
    role: Role,
    /// Peer notification strategy
    interrupt_mode: InterruptMode,
    /// Endpoint capability flags
    capabilities: Capabilities,
    /// Endpoint register file base
    base_addr: DeviceAddr,
    /// Shared ring memory base
    ring_addr: DeviceAddr,
    /// Memory read strategy for header and counter words
    read_mode: ReadMode,
    /// Submission ring
    sq: Ring,
    /// Completion ring
    cq: Ring,
    /// Slot size of the ring this side produces onto
    producer_slot_size: u32,
    /// Slot size of the ring this side consumes from
    consumer_slot_size: u32,
    /// Lifecycle state
    state: InstanceState,
}

impl<Io: DeviceIo> Instance<Io> {
    // =========================================================================
    // Init
    // =========================================================================

    /// Bring up one side of a queue pair
    ///
    /// Validates the geometry, programs the endpoint registers, composes
    /// both rings, and — on the producer side — runs the two-phase header
    /// publish so the peer never observes a half-initialized ring.
    pub(crate) fn init(io: Io, config: &InstanceConfig) -> Result<Self> {
        let InstanceConfig {
            role,
            interrupt_mode,
            capabilities,
            base_addr,
            ring_addr,
            ring_len,
            sq_slot_size,
            cq_slot_size,
        } = *config;

        if sq_slot_size == 0
            || sq_slot_size % 4 != 0
            || cq_slot_size == 0
            || cq_slot_size % 4 != 0
        {
            return Err(Error::InvalidSlotSize);
        }

        let slot_num = compute_slot_num(ring_len, sq_slot_size, cq_slot_size)?;

        hw::init(&io, role, base_addr, ring_addr);
        hw::configure_interrupt_mode(&io, role, interrupt_mode, base_addr);

        let read_mode = if capabilities.contains(Capabilities::DOUBLE_READ_REQUIRED) {
            ReadMode::DoubleRead
        } else {
            ReadMode::Direct
        };
        let in_memory = capabilities.contains(Capabilities::IN_MEMORY_POINTER);

        // Produced counters: each side publishes through its own register
        // block, or through the header with in-memory pointers. Consumed
        // counters always live in the header.
        let sq_produced = if in_memory {
            TailPointer::memory(
                ring_addr.offset(header::SQ_PRODUCED_OFFSET as u64),
                read_mode,
            )
        } else {
            TailPointer::register(regs::reg_addr(
                base_addr,
                regs::block::CONSUMER,
                regs::registers::TAIL_POINTER,
            ))
        };
        let cq_produced = if in_memory {
            TailPointer::memory(
                ring_addr.offset(header::CQ_PRODUCED_OFFSET as u64),
                read_mode,
            )
        } else {
            TailPointer::register(regs::reg_addr(
                base_addr,
                regs::block::PRODUCER,
                regs::registers::TAIL_POINTER,
            ))
        };
        let sq_consumed = TailPointer::memory(
            ring_addr.offset(header::SQ_CONSUMED_OFFSET as u64),
            read_mode,
        );
        let cq_consumed = TailPointer::memory(
            ring_addr.offset(header::CQ_CONSUMED_OFFSET as u64),
            read_mode,
        );

        let sq_offset = header::HEADER_SIZE;
        let cq_offset = sq_offset + slot_num * sq_slot_size;

        let mut sq = Ring::new(
            sq_produced,
            sq_consumed,
            ring_addr.offset(sq_offset as u64),
            slot_num,
            sq_slot_size,
        );
        let mut cq = Ring::new(
            cq_produced,
            cq_consumed,
            ring_addr.offset(cq_offset as u64),
            slot_num,
            cq_slot_size,
        );

        if role.is_producer() {
            // Two-phase publish: header lands with the magic cleared, the
            // rings discard stale peer state, and only then does the magic
            // word make the whole header valid.
            let hdr = RingHeader {
                magic: 0,
                version: DRIVER_VERSION.wire_word(),
                slot_num,
                sq_offset,
                sq_slot_size,
                cq_offset,
                sq_consumed: 0,
                cq_consumed: 0,
                flags: capabilities.bits(),
                sq_produced: 0,
                cq_produced: 0,
            };
            hdr.write_unpublished(&io, ring_addr);
            sq.soft_reset(&io)?;
            cq.soft_reset(&io)?;
            RingHeader::publish(&io, ring_addr);
        }

        let (producer_slot_size, consumer_slot_size) = match role {
            Role::Producer => (cq_slot_size, sq_slot_size),
            Role::Consumer => (sq_slot_size, cq_slot_size),
        };

        log::debug!(
            "instance up: role {:?}, {} slots of {}/{} bytes at {}",
            role,
            slot_num,
            sq_slot_size,
            cq_slot_size,
            ring_addr,
        );

        Ok(Self {
            io,
            role,
            interrupt_mode,
            capabilities,
            base_addr,
            ring_addr,
            read_mode,
            sq,
            cq,
            producer_slot_size,
            consumer_slot_size,
            state: InstanceState::Initialized,
        })
    }

    // =========================================================================
    // Attach
    // =========================================================================

    /// Consumer handshake against the producer's published header
    pub(crate) fn attach(&mut self) -> Result<()> {
        if self.role != Role::Consumer {
            return Err(Error::InvalidArg);
        }

        let magic = RingHeader::read_magic(&self.io, self.ring_addr, self.read_mode)?;
        if magic != RING_MAGIC {
            return Err(Error::ConsumerNotAvailable);
        }

        let hdr = RingHeader::read_from(&self.io, self.ring_addr, self.read_mode)?;
        if DriverVersion::major_of(hdr.version) != DRIVER_VERSION.major {
            log::debug!(
                "attach rejected: header major {} vs build major {}",
                DriverVersion::major_of(hdr.version),
                DRIVER_VERSION.major,
            );
            return Err(Error::InvalidVersion);
        }
        if hdr.slot_num != self.sq.slot_num() {
            return Err(Error::InvalidNumSlots);
        }
        if hdr.sq_slot_size != self.sq.slot_size() {
            return Err(Error::InvalidSlotSize);
        }

        // Adopt whatever the pair has already exchanged.
        let Self { io, sq, cq, .. } = self;
        sq.fast_forward(&*io)?;
        cq.fast_forward(&*io)?;

        self.state = InstanceState::Attached;
        log::debug!("consumer attached at {}", self.ring_addr);
        Ok(())
    }

    // =========================================================================
    // Produce
    // =========================================================================

    /// Copy one payload into the next free slot and publish it
    pub(crate) fn produce(&mut self, data: &[u8]) -> Result<()> {
        if data.len() % 4 != 0 || data.len() as u32 > self.producer_slot_size {
            return Err(Error::InvalidArg);
        }

        let Self { io, role, sq, cq, .. } = self;
        let ring = match role {
            Role::Producer => cq,
            Role::Consumer => sq,
        };
        let io = &*io;

        if ring.is_full() {
            // The peer may have consumed since we last looked.
            ring.refresh_consumed(io)?;
            if ring.is_full() {
                ring.record_full_stall();
                return Err(Error::ProducerNoFreeSlots);
            }
        }

        // Payload lands before the counter that exposes it moves.
        let slot = ring.produced_slot_addr();
        for (i, word) in data.chunks_exact(4).enumerate() {
            io.write_mem32(
                slot.offset((i * 4) as u64),
                u32::from_le_bytes([word[0], word[1], word[2], word[3]]),
            );
        }

        ring.advance_produced();
        ring.publish_produced(io);

        if self.interrupt_mode == InterruptMode::InterruptRegister {
            hw::trigger_interrupt(&self.io, self.role, self.base_addr);
        }

        Ok(())
    }

    // =========================================================================
    // Consume
    // =========================================================================

    /// Copy the next pending slot out and release it
    pub(crate) fn consume(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() % 4 != 0 || buf.len() as u32 > self.consumer_slot_size {
            return Err(Error::InvalidArg);
        }
        // Producer-side self-consumption needs no handshake; only the
        // consumer role gates on attach.
        if self.role == Role::Consumer && !self.state.is_attached() {
            return Err(Error::ConsumerNotAttached);
        }

        let Self { io, role, sq, cq, .. } = self;
        let ring = match role {
            Role::Producer => sq,
            Role::Consumer => cq,
        };
        let io = &*io;

        if ring.is_empty() {
            // The peer may have produced since we last looked.
            ring.refresh_produced(io)?;
            if ring.is_empty() {
                ring.record_empty_stall();
                return Err(Error::ConsumerNoDataReceived);
            }
        }

        let slot = ring.consumed_slot_addr();
        for (i, chunk) in buf.chunks_exact_mut(4).enumerate() {
            let word = io.read_mem32(slot.offset((i * 4) as u64));
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        ring.advance_consumed();
        ring.publish_consumed(io);

        if self.interrupt_mode == InterruptMode::InterruptRegister {
            hw::clear_interrupt(&self.io, self.role, self.base_addr);
        }

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Which side of the pair this instance plays
    #[inline]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Lifecycle state
    #[inline]
    pub const fn state(&self) -> InstanceState {
        self.state
    }

    /// Peer notification strategy
    #[inline]
    pub const fn interrupt_mode(&self) -> InterruptMode {
        self.interrupt_mode
    }

    /// Capability flags this instance was created with
    #[inline]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Slot count of both rings
    #[inline]
    pub const fn slot_num(&self) -> u32 {
        self.sq.slot_num()
    }

    /// Slot size of the ring this side produces onto
    #[inline]
    pub const fn producer_slot_size(&self) -> u32 {
        self.producer_slot_size
    }

    /// Slot size of the ring this side consumes from
    #[inline]
    pub const fn consumer_slot_size(&self) -> u32 {
        self.consumer_slot_size
    }

    /// Traffic statistics for both rings
    pub const fn stats(&self) -> InstanceStats {
        InstanceStats {
            sq: *self.sq.stats(),
            cq: *self.cq.stats(),
        }
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Largest power-of-two slot count (>= 2) fitting the ring memory
///
/// Doubling search from 1: the last value whose full layout still fits is
/// accepted; anything below 2 means the region cannot hold a ring.
fn compute_slot_num(ring_len: u64, sq_slot_size: u32, cq_slot_size: u32) -> Result<u32> {
    let mut slot_num: u32 = 1;
    while slot_num < (1 << 30)
        && RingHeader::layout_len(slot_num * 2, sq_slot_size, cq_slot_size) <= ring_len
    {
        slot_num *= 2;
    }

    if slot_num < 2 {
        return Err(Error::InvalidNumSlots);
    }
    Ok(slot_num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcq_ring::header::HEADER_SIZE;

    #[test]
    fn test_slot_num_search_accepts_last_fit() {
        // Exactly header + 8 * (16 + 16) bytes: 8 slots fit, 16 do not.
        let len = RingHeader::layout_len(8, 16, 16);
        assert_eq!(compute_slot_num(len, 16, 16), Ok(8));

        // One byte short of 8 slots drops back to 4.
        assert_eq!(compute_slot_num(len - 1, 16, 16), Ok(4));

        // Plenty of slack does not round up.
        assert_eq!(compute_slot_num(len + 31, 16, 16), Ok(8));
    }

    #[test]
    fn test_slot_num_rejects_tiny_regions() {
        assert_eq!(
            compute_slot_num(HEADER_SIZE as u64, 16, 16),
            Err(Error::InvalidNumSlots),
        );
        assert_eq!(compute_slot_num(0, 16, 16), Err(Error::InvalidNumSlots));
        // Room for one slot pair only is still too small.
        let one = RingHeader::layout_len(1, 16, 16);
        assert_eq!(compute_slot_num(one, 16, 16), Err(Error::InvalidNumSlots));
    }
}
