//! # Hardware Sequences
//!
//! Init, interrupt-configuration and interrupt trigger/clear sequences
//! against the two queue register blocks.
//!
//! All sequences are plain 32-bit register traffic through the bound
//! [`DeviceIo`]; nothing here blocks or retries.

use gcq_core::{DeviceAddr, DeviceIo, InterruptMode, Role};

use crate::regs::{self, IntrCtrl, registers};

// =============================================================================
// ENDPOINT INIT
// =============================================================================

/// Program the queue memory address into the endpoint
///
/// The consumer side writes the ring base into its own block only. The
/// producer side owns bring-up: it first pulses the self-clearing soft
/// reset through both blocks' control registers so stale interrupt state
/// from a previous life is discarded, then programs its own block.
pub fn init<Io: DeviceIo>(io: &Io, role: Role, base: DeviceAddr, ring_addr: DeviceAddr) {
    if role.is_producer() {
        for blk in [regs::block::PRODUCER, regs::block::CONSUMER] {
            io.write_reg32(
                regs::reg_addr(base, blk, registers::RESET_INTERRUPT_CTRL),
                IntrCtrl::RESET.bits(),
            );
        }
    }

    let blk = regs::own_block(role);
    io.write_reg32(
        regs::reg_addr(base, blk, registers::QUEUE_MEM_ADDR_LOW),
        ring_addr.low32(),
    );
    io.write_reg32(
        regs::reg_addr(base, blk, registers::QUEUE_MEM_ADDR_HIGH),
        ring_addr.high32(),
    );

    log::debug!("queue endpoint init: role {:?}, ring at {}", role, ring_addr);
}

// =============================================================================
// INTERRUPT CONFIGURATION
// =============================================================================

/// Configure how this side raises interrupts toward its peer
///
/// Writes the enable/type bits of the role's own control register with a
/// read/modify/write so the reset pulse bit is left untouched:
/// [`InterruptMode::Polling`] disables interrupt generation,
/// [`InterruptMode::TailPointerWrite`] interrupts on every tail write, and
/// [`InterruptMode::InterruptRegister`] arms the explicit software trigger.
pub fn configure_interrupt_mode<Io: DeviceIo>(
    io: &Io,
    role: Role,
    int_mode: InterruptMode,
    base: DeviceAddr,
) {
    let bits = match int_mode {
        InterruptMode::Polling => IntrCtrl::empty(),
        InterruptMode::TailPointerWrite => IntrCtrl::ENABLE,
        InterruptMode::InterruptRegister => IntrCtrl::ENABLE | IntrCtrl::TYPE_SOFTWARE,
    };

    let ctrl = regs::reg_addr(base, regs::own_block(role), registers::RESET_INTERRUPT_CTRL);
    let mask = IntrCtrl::ENABLE | IntrCtrl::TYPE_SOFTWARE;
    let current = io.read_reg32(ctrl) & !mask.bits();
    io.write_reg32(ctrl, current | bits.bits());

    log::debug!("interrupt mode {:?} configured for role {:?}", int_mode, role);
}

// =============================================================================
// INTERRUPT TRIGGER / CLEAR
// =============================================================================

/// Raise the software interrupt for entries this side just produced
///
/// Writes the interrupt register of the role's own block; the peer
/// consumes from that block's ring and watches that register.
#[inline]
pub fn trigger_interrupt<Io: DeviceIo>(io: &Io, role: Role, base: DeviceAddr) {
    let reg = regs::reg_addr(base, regs::own_block(role), registers::INTERRUPT_REG);
    io.write_reg32(reg, 1);
}

/// Clear the latched interrupt for entries this side just consumed
///
/// Reads the interrupt register of the peer's block; the read clears the
/// latch. Returns the latched value.
#[inline]
pub fn clear_interrupt<Io: DeviceIo>(io: &Io, role: Role, base: DeviceAddr) -> u32 {
    let reg = regs::reg_addr(base, regs::peer_block(role), registers::INTERRUPT_REG);
    io.read_reg32(reg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::collections::BTreeMap;

    /// Flat register file over a map; memory side unused here.
    struct RegFile {
        regs: RefCell<BTreeMap<u64, u32>>,
    }

    impl RegFile {
        fn new() -> Self {
            Self {
                regs: RefCell::new(BTreeMap::new()),
            }
        }

        fn get(&self, addr: u64) -> u32 {
            *self.regs.borrow().get(&addr).unwrap_or(&0)
        }

        fn set(&self, addr: u64, value: u32) {
            self.regs.borrow_mut().insert(addr, value);
        }
    }

    impl DeviceIo for RegFile {
        fn read_reg32(&self, addr: DeviceAddr) -> u32 {
            self.get(addr.raw())
        }

        fn write_reg32(&self, addr: DeviceAddr, value: u32) {
            self.set(addr.raw(), value);
        }

        fn read_mem32(&self, _addr: DeviceAddr) -> u32 {
            0
        }

        fn write_mem32(&self, _addr: DeviceAddr, _value: u32) {}
    }

    const BASE: DeviceAddr = DeviceAddr::new(0x4000);

    #[test]
    fn test_consumer_init_programs_own_block_only() {
        let io = RegFile::new();
        let ring = DeviceAddr::new(0x8_0000_1000);

        init(&io, Role::Consumer, BASE, ring);

        assert_eq!(io.get(0x4108), 0x0000_1000); // consumer low
        assert_eq!(io.get(0x4110), 0x0000_0008); // consumer high
        assert_eq!(io.get(0x4008), 0); // producer block untouched
        assert_eq!(io.get(0x4010), 0);
    }

    #[test]
    fn test_producer_init_resets_both_blocks() {
        let io = RegFile::new();
        let ring = DeviceAddr::new(0x2000);

        init(&io, Role::Producer, BASE, ring);

        assert_eq!(io.get(0x400C), IntrCtrl::RESET.bits());
        assert_eq!(io.get(0x410C), IntrCtrl::RESET.bits());
        assert_eq!(io.get(0x4008), 0x2000);
        assert_eq!(io.get(0x4010), 0);
    }

    #[test]
    fn test_interrupt_mode_bits() {
        let io = RegFile::new();

        configure_interrupt_mode(&io, Role::Producer, InterruptMode::Polling, BASE);
        assert_eq!(io.get(0x400C) & 0b11, 0);

        configure_interrupt_mode(&io, Role::Producer, InterruptMode::TailPointerWrite, BASE);
        assert_eq!(io.get(0x400C) & 0b11, 0b01);

        configure_interrupt_mode(&io, Role::Producer, InterruptMode::InterruptRegister, BASE);
        assert_eq!(io.get(0x400C) & 0b11, 0b11);
    }

    #[test]
    fn test_interrupt_mode_preserves_other_bits() {
        let io = RegFile::new();
        io.set(0x410C, 1 << 31);

        configure_interrupt_mode(&io, Role::Consumer, InterruptMode::TailPointerWrite, BASE);

        assert_eq!(io.get(0x410C), (1 << 31) | 1);
    }

    #[test]
    fn test_trigger_and_clear_use_opposite_blocks() {
        let io = RegFile::new();

        // Consumer produces submissions and rings its own block; the
        // producer side clears by reading the consumer block register.
        trigger_interrupt(&io, Role::Consumer, BASE);
        assert_eq!(io.get(0x4104), 1);
        assert_eq!(clear_interrupt(&io, Role::Producer, BASE), 1);

        trigger_interrupt(&io, Role::Producer, BASE);
        assert_eq!(io.get(0x4004), 1);
        assert_eq!(clear_interrupt(&io, Role::Consumer, BASE), 1);
    }
}
