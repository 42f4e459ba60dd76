//! # GCQ Core
//!
//! Foundational types, error handling and the device I/O contract for the
//! GCQ (Generic Command Queue) driver stack.
//!
//! This crate has no hardware dependencies. It defines what every other
//! layer shares:
//!
//! - Strongly typed device addresses ([`DeviceAddr`]) that are never CPU
//!   pointers
//! - The unified [`Error`]/[`Result`] pair used across the stack
//! - The [`DeviceIo`] trait through which all register and shared-memory
//!   access flows
//! - Compile-time driver version constants
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       gcq-core                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  DeviceIo   │  │   Types     │  │     Error           │  │
//! │  │  (reg/mem   │  │ (DeviceAddr,│  │   Handling          │  │
//! │  │   access)   │  │  Handle)    │  │                     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod error;
pub mod io;
pub mod types;
pub mod version;

// Re-exports for convenience
pub use error::{Error, Result};
pub use io::DeviceIo;
pub use types::*;
pub use version::{DriverVersion, DRIVER_VERSION};
