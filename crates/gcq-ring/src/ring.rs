//! # Ring Indexing
//!
//! The single-direction slot ring: free-running produced/consumed counters,
//! power-of-two slot addressing, and the tail-pointer backings through
//! which the counters are exchanged with the peer.
//!
//! Counters are never masked in place. Fullness and emptiness come from
//! unsigned wrapping arithmetic on the free-running values; only slot
//! addressing applies the `slot_num - 1` mask.

use gcq_core::{DeviceAddr, DeviceIo, Result};

use crate::stable::{self, ReadMode};

// =============================================================================
// TAIL POINTER BACKING
// =============================================================================

/// Where a counter is exchanged with the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailBacking {
    /// A hardware tail-pointer register
    Register(DeviceAddr),
    /// A word inside the shared ring header
    Memory(DeviceAddr),
}

/// A counter's backing location plus its read-reliability strategy
///
/// Resolved once at instance init; the hot paths never re-branch on
/// capability bits.
#[derive(Debug, Clone, Copy)]
pub struct TailPointer {
    backing: TailBacking,
    read_mode: ReadMode,
}

impl TailPointer {
    /// Counter backed by a hardware register
    pub const fn register(addr: DeviceAddr) -> Self {
        Self {
            backing: TailBacking::Register(addr),
            // Register reads are not subject to the collision hazard.
            read_mode: ReadMode::Direct,
        }
    }

    /// Counter backed by a header word
    pub const fn memory(addr: DeviceAddr, read_mode: ReadMode) -> Self {
        Self {
            backing: TailBacking::Memory(addr),
            read_mode,
        }
    }

    /// Check whether the backing is a hardware register
    #[inline]
    pub const fn is_register(&self) -> bool {
        matches!(self.backing, TailBacking::Register(_))
    }

    /// Read the counter from its backing
    pub fn read<Io: DeviceIo>(&self, io: &Io) -> Result<u32> {
        match self.backing {
            TailBacking::Register(addr) => Ok(io.read_reg32(addr)),
            TailBacking::Memory(addr) => stable::read_mem32(io, addr, self.read_mode),
        }
    }

    /// Publish the counter to its backing
    pub fn write<Io: DeviceIo>(&self, io: &Io, value: u32) {
        match self.backing {
            TailBacking::Register(addr) => io.write_reg32(addr, value),
            TailBacking::Memory(addr) => io.write_mem32(addr, value),
        }
    }
}

// =============================================================================
// RING STATS
// =============================================================================

/// Per-ring traffic statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RingStats {
    /// Total entries produced
    pub produced_total: u64,
    /// Total entries consumed
    pub consumed_total: u64,
    /// Produce attempts rejected with a full ring
    pub full_stalls: u64,
    /// Consume attempts rejected with an empty ring
    pub empty_stalls: u64,
}

// =============================================================================
// RING
// =============================================================================

/// All-ones tail sample from a register: the endpoint is absent
///
/// A missing or reset endpoint floats its register bus high, so a produced
/// counter of `0xFFFF_FFFF` read from hardware is treated as "no peer",
/// never adopted as a counter value.
pub const ENDPOINT_ABSENT: u32 = u32::MAX;

/// A single-direction slot ring over caller-owned memory
#[derive(Debug)]
pub struct Ring {
    /// Slot count, power of two >= 2
    slot_num: u32,
    /// Slot size in bytes, multiple of 4
    slot_size: u32,
    /// Free-running produced counter (local view)
    produced: u32,
    /// Free-running consumed counter (local view)
    consumed: u32,
    /// Backing for the produced counter
    produced_tail: TailPointer,
    /// Backing for the consumed counter
    consumed_tail: TailPointer,
    /// First slot address
    slot_base: DeviceAddr,
    /// Traffic counters
    stats: RingStats,
}

impl Ring {
    /// Create a ring with zeroed counters
    pub const fn new(
        produced_tail: TailPointer,
        consumed_tail: TailPointer,
        slot_base: DeviceAddr,
        slot_num: u32,
        slot_size: u32,
    ) -> Self {
        Self {
            slot_num,
            slot_size,
            produced: 0,
            consumed: 0,
            produced_tail,
            consumed_tail,
            slot_base,
            stats: RingStats {
                produced_total: 0,
                consumed_total: 0,
                full_stalls: 0,
                empty_stalls: 0,
            },
        }
    }

    /// Slot count
    #[inline]
    pub const fn slot_num(&self) -> u32 {
        self.slot_num
    }

    /// Slot size in bytes
    #[inline]
    pub const fn slot_size(&self) -> u32 {
        self.slot_size
    }

    /// Local produced counter
    #[inline]
    pub const fn produced(&self) -> u32 {
        self.produced
    }

    /// Local consumed counter
    #[inline]
    pub const fn consumed(&self) -> u32 {
        self.consumed
    }

    /// Traffic statistics
    #[inline]
    pub const fn stats(&self) -> &RingStats {
        &self.stats
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    /// All slots occupied
    ///
    /// Correct across counter wraparound: the unsigned difference of the
    /// free-running counters is the occupancy.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.produced.wrapping_sub(self.consumed) >= self.slot_num
    }

    /// No entries pending
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.produced == self.consumed
    }

    // =========================================================================
    // Slot addressing
    // =========================================================================

    /// Address of the slot the next produce writes
    #[inline]
    pub const fn produced_slot_addr(&self) -> DeviceAddr {
        self.slot_addr(self.produced)
    }

    /// Address of the slot the next consume reads
    #[inline]
    pub const fn consumed_slot_addr(&self) -> DeviceAddr {
        self.slot_addr(self.consumed)
    }

    #[inline]
    const fn slot_addr(&self, counter: u32) -> DeviceAddr {
        let index = counter & (self.slot_num - 1);
        self.slot_base.offset(self.slot_size as u64 * index as u64)
    }

    // =========================================================================
    // Counter movement
    // =========================================================================

    /// Advance the produced counter after the slot payload is in place
    #[inline]
    pub fn advance_produced(&mut self) {
        self.produced = self.produced.wrapping_add(1);
        self.stats.produced_total += 1;
    }

    /// Advance the consumed counter after the slot payload is copied out
    #[inline]
    pub fn advance_consumed(&mut self) {
        self.consumed = self.consumed.wrapping_add(1);
        self.stats.consumed_total += 1;
    }

    /// Publish the local produced counter to the peer-visible backing
    #[inline]
    pub fn publish_produced<Io: DeviceIo>(&self, io: &Io) {
        self.produced_tail.write(io, self.produced);
    }

    /// Publish the local consumed counter to the peer-visible backing
    #[inline]
    pub fn publish_consumed<Io: DeviceIo>(&self, io: &Io) {
        self.consumed_tail.write(io, self.consumed);
    }

    /// Re-read the produced counter from the peer's backing
    ///
    /// A register sample of [`ENDPOINT_ABSENT`] is discarded and the local
    /// view kept, so an absent endpoint reads as "no data" instead of a
    /// ring full of garbage.
    pub fn refresh_produced<Io: DeviceIo>(&mut self, io: &Io) -> Result<()> {
        let sample = self.produced_tail.read(io)?;
        if self.produced_tail.is_register() && sample == ENDPOINT_ABSENT {
            log::trace!("all-ones tail sample ignored, endpoint absent");
            return Ok(());
        }
        self.produced = sample;
        Ok(())
    }

    /// Re-read the consumed counter from the peer's backing
    pub fn refresh_consumed<Io: DeviceIo>(&mut self, io: &Io) -> Result<()> {
        self.consumed = self.consumed_tail.read(io)?;
        Ok(())
    }

    /// Re-read both counters (attach fast-forward)
    pub fn fast_forward<Io: DeviceIo>(&mut self, io: &Io) -> Result<()> {
        self.refresh_produced(io)?;
        self.refresh_consumed(io)
    }

    /// Discard stale peer state at init
    ///
    /// Adopts whatever produced counter the backing currently holds, sets
    /// consumed equal to it, and publishes the consumed counter, so
    /// entries from a previous life are never replayed.
    pub fn soft_reset<Io: DeviceIo>(&mut self, io: &Io) -> Result<()> {
        let produced = self.produced_tail.read(io)?;
        if produced != 0 {
            log::debug!("ring soft reset: adopting produced counter {}", produced);
        }
        self.produced = produced;
        self.consumed = produced;
        self.publish_consumed(io);
        Ok(())
    }

    // =========================================================================
    // Stall accounting
    // =========================================================================

    /// Record a produce attempt that found the ring full
    #[inline]
    pub fn record_full_stall(&mut self) {
        self.stats.full_stalls += 1;
    }

    /// Record a consume attempt that found the ring empty
    #[inline]
    pub fn record_empty_stall(&mut self) {
        self.stats.empty_stalls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::collections::BTreeMap;

    struct FlatIo {
        regs: RefCell<BTreeMap<u64, u32>>,
        mem: RefCell<BTreeMap<u64, u32>>,
    }

    impl FlatIo {
        fn new() -> Self {
            Self {
                regs: RefCell::new(BTreeMap::new()),
                mem: RefCell::new(BTreeMap::new()),
            }
        }
    }

    impl DeviceIo for FlatIo {
        fn read_reg32(&self, addr: DeviceAddr) -> u32 {
            *self.regs.borrow().get(&addr.raw()).unwrap_or(&0)
        }

        fn write_reg32(&self, addr: DeviceAddr, value: u32) {
            self.regs.borrow_mut().insert(addr.raw(), value);
        }

        fn read_mem32(&self, addr: DeviceAddr) -> u32 {
            *self.mem.borrow().get(&addr.raw()).unwrap_or(&0)
        }

        fn write_mem32(&self, addr: DeviceAddr, value: u32) {
            self.mem.borrow_mut().insert(addr.raw(), value);
        }
    }

    const TAIL_REG: DeviceAddr = DeviceAddr::new(0x100);
    const CONSUMED_WORD: DeviceAddr = DeviceAddr::new(0x1018);
    const SLOTS: DeviceAddr = DeviceAddr::new(0x102c);

    fn test_ring(slot_num: u32, slot_size: u32) -> Ring {
        Ring::new(
            TailPointer::register(TAIL_REG),
            TailPointer::memory(CONSUMED_WORD, ReadMode::Direct),
            SLOTS,
            slot_num,
            slot_size,
        )
    }

    #[test]
    fn test_empty_and_full_predicates() {
        let mut ring = test_ring(4, 64);
        assert!(ring.is_empty());
        assert!(!ring.is_full());

        for _ in 0..4 {
            assert!(!ring.is_full());
            ring.advance_produced();
        }
        assert!(ring.is_full());
        assert!(!ring.is_empty());

        ring.advance_consumed();
        assert!(!ring.is_full());
    }

    #[test]
    fn test_predicates_across_wraparound() {
        let mut ring = test_ring(8, 4);
        ring.produced = u32::MAX - 2;
        ring.consumed = u32::MAX - 2;
        assert!(ring.is_empty());

        for _ in 0..8 {
            ring.advance_produced();
        }
        // produced wrapped past zero; occupancy is still exactly 8.
        assert!(ring.is_full());
        assert_eq!(ring.produced().wrapping_sub(ring.consumed()), 8);

        ring.advance_consumed();
        assert!(!ring.is_full());
        assert!(!ring.is_empty());
    }

    #[test]
    fn test_slot_addressing_masks_counter() {
        let mut ring = test_ring(4, 64);
        assert_eq!(ring.produced_slot_addr(), SLOTS);

        ring.advance_produced();
        assert_eq!(ring.produced_slot_addr(), SLOTS.offset(64));

        ring.produced = 7; // index 3
        assert_eq!(ring.produced_slot_addr(), SLOTS.offset(3 * 64));

        ring.produced = 8; // wraps to index 0
        assert_eq!(ring.produced_slot_addr(), SLOTS);
    }

    #[test]
    fn test_publish_and_refresh_via_register() {
        let io = FlatIo::new();
        let mut ring = test_ring(4, 64);

        ring.advance_produced();
        ring.advance_produced();
        ring.publish_produced(&io);
        assert_eq!(io.read_reg32(TAIL_REG), 2);

        let mut peer_view = test_ring(4, 64);
        peer_view.refresh_produced(&io).unwrap();
        assert_eq!(peer_view.produced(), 2);
    }

    #[test]
    fn test_refresh_ignores_absent_endpoint() {
        let io = FlatIo::new();
        io.write_reg32(TAIL_REG, ENDPOINT_ABSENT);

        let mut ring = test_ring(4, 64);
        ring.refresh_produced(&io).unwrap();
        assert_eq!(ring.produced(), 0, "all-ones register sample must not be adopted");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_absent_pattern_is_honored_from_memory_backing() {
        // The probe only guards register reads; a header word really can
        // hold any value the producer published.
        let io = FlatIo::new();
        io.write_mem32(CONSUMED_WORD, ENDPOINT_ABSENT);

        let mut ring = Ring::new(
            TailPointer::memory(CONSUMED_WORD, ReadMode::Direct),
            TailPointer::memory(CONSUMED_WORD, ReadMode::Direct),
            SLOTS,
            4,
            64,
        );
        ring.refresh_produced(&io).unwrap();
        assert_eq!(ring.produced(), ENDPOINT_ABSENT);
    }

    #[test]
    fn test_soft_reset_discards_stale_state() {
        let io = FlatIo::new();
        io.write_reg32(TAIL_REG, 37); // stale produced from a previous life

        let mut ring = test_ring(4, 64);
        ring.soft_reset(&io).unwrap();

        assert_eq!(ring.produced(), 37);
        assert_eq!(ring.consumed(), 37);
        assert!(ring.is_empty());
        assert_eq!(io.read_mem32(CONSUMED_WORD), 37, "consumed must be published");
    }

    #[test]
    fn test_stats_accounting() {
        let mut ring = test_ring(2, 4);
        ring.advance_produced();
        ring.advance_produced();
        ring.record_full_stall();
        ring.advance_consumed();
        ring.record_empty_stall();

        let stats = ring.stats();
        assert_eq!(stats.produced_total, 2);
        assert_eq!(stats.consumed_total, 1);
        assert_eq!(stats.full_stalls, 1);
        assert_eq!(stats.empty_stalls, 1);
    }
}
