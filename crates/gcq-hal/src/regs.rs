//! # Queue Register Map
//!
//! Register block offsets and bitfields for the queue endpoint.
//!
//! The endpoint exposes two register blocks with identical field layout:
//! the producer block at `base + 0x000` and the consumer block at
//! `base + 0x100`. Each side of the queue pair publishes through its own
//! block and reads the peer's.

use gcq_core::{DeviceAddr, Role};

// =============================================================================
// REGISTER BLOCKS
// =============================================================================

/// Register block base offsets (bytes from the endpoint base address)
pub mod block {
    //! Block placement of the two mirrored register files

    /// Producer-side register block
    pub const PRODUCER: u32 = 0x0000;
    /// Consumer-side register block (peer mirror)
    pub const CONSUMER: u32 = 0x0100;
}

/// Register offsets within a block
pub mod registers {
    //! Per-block register offsets and definitions

    /// Produced-counter tail pointer published by the block's owner
    pub const TAIL_POINTER: u32 = 0x0000;
    /// Software interrupt register; reading it clears the latched interrupt
    pub const INTERRUPT_REG: u32 = 0x0004;
    /// Queue memory base address, low 32 bits
    pub const QUEUE_MEM_ADDR_LOW: u32 = 0x0008;
    /// Reset and interrupt control (see [`IntrCtrl`](super::IntrCtrl))
    pub const RESET_INTERRUPT_CTRL: u32 = 0x000C;
    /// Queue memory base address, high 32 bits
    pub const QUEUE_MEM_ADDR_HIGH: u32 = 0x0010;
}

// =============================================================================
// INTERRUPT CONTROL BITFIELD
// =============================================================================

bitflags::bitflags! {
    /// `RESET_INTERRUPT_CTRL` register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntrCtrl: u32 {
        /// Interrupt generation enabled
        const ENABLE = 1 << 0;
        /// Interrupt type: set = explicit software trigger,
        /// clear = interrupt on tail-pointer write
        const TYPE_SOFTWARE = 1 << 1;
        /// Self-clearing soft-reset pulse for the block
        const RESET = 1 << 31;
    }
}

// =============================================================================
// ADDRESS HELPERS
// =============================================================================

/// Block base offset owned by a role
#[inline]
pub const fn own_block(role: Role) -> u32 {
    match role {
        Role::Producer => block::PRODUCER,
        Role::Consumer => block::CONSUMER,
    }
}

/// Block base offset owned by the peer of a role
#[inline]
pub const fn peer_block(role: Role) -> u32 {
    own_block(role.peer())
}

/// Absolute address of a register within a block
#[inline]
pub const fn reg_addr(base: DeviceAddr, block: u32, reg: u32) -> DeviceAddr {
    base.offset((block + reg) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ownership_is_mirrored() {
        assert_eq!(own_block(Role::Producer), block::PRODUCER);
        assert_eq!(own_block(Role::Consumer), block::CONSUMER);
        assert_eq!(peer_block(Role::Producer), block::CONSUMER);
        assert_eq!(peer_block(Role::Consumer), block::PRODUCER);
    }

    #[test]
    fn test_register_addresses() {
        let base = DeviceAddr::new(0x2000);
        let tail = reg_addr(base, block::CONSUMER, registers::TAIL_POINTER);
        assert_eq!(tail.raw(), 0x2100);
        let ctrl = reg_addr(base, block::PRODUCER, registers::RESET_INTERRUPT_CTRL);
        assert_eq!(ctrl.raw(), 0x200C);
    }
}
