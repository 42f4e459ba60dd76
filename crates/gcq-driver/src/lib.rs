//! # GCQ Driver
//!
//! The public driver API over the queue protocol: a fixed-capacity pool of
//! queue instances and the produce/consume/attach operations.
//!
//! ## Submission Flow
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Queue Pair Lifecycle                         │
//! │                                                                   │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐     │
//! │  │   Context    │    │   Instance   │    │   SQ / CQ Rings  │     │
//! │  │  (pool of    │───▶│ (role, irq,  │───▶│  over shared     │     │
//! │  │   handles)   │    │  tail mode)  │    │  ring memory     │     │
//! │  └──────────────┘    └──────────────┘    └────────┬─────────┘     │
//! │                                                   │               │
//! │                                          ┌────────▼─────────┐     │
//! │                                          │  Peer endpoint   │     │
//! │                                          │ (hw or process)  │     │
//! │                                          └──────────────────┘     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! 1. The producer side initializes an instance; the two-phase header
//!    publish makes the ring visible to the peer
//! 2. The consumer side initializes its own instance and attaches
//! 3. Both sides exchange fixed-size slots through `produce_data` /
//!    `consume_data`; backpressure is an explicit return value
//!
//! Nothing in this crate blocks, sleeps or locks. Concurrent calls on one
//! context must be serialized by the caller.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod context;
pub mod instance;

// Re-exports
pub use context::{Context, MAX_INSTANCES};
pub use instance::{Instance, InstanceConfig, InstanceState, InstanceStats};

use gcq_core::version::{DRIVER_VERSION, DriverVersion};

/// Driver version of this build
#[inline]
pub const fn driver_version() -> DriverVersion {
    DRIVER_VERSION
}
