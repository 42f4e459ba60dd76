//! # GCQ Hardware Abstraction Layer
//!
//! Bit-exact register access sequences for the queue endpoint.
//!
//! A queue endpoint exposes two identical register blocks, one per side of
//! the queue pair. This crate knows their layout and owns the init,
//! interrupt-configuration and interrupt trigger/clear sequences; it never
//! touches ring indexing or payload data.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod hw;
pub mod regs;

// Re-exports
pub use regs::{IntrCtrl, block, registers};
