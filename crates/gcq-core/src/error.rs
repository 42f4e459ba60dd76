//! # GCQ Error Handling
//!
//! Typed error values for the queue driver stack.
//!
//! Error handling in GCQ follows these principles:
//! - All failures are typed return values, never panics
//! - Configuration errors are non-retryable and stop the setup path
//! - Flow-control conditions are expected backpressure, not failures
//! - Errors are `no_std` compatible

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// GCQ Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// GCQ unified error type
///
/// Covers every failure condition of the driver API. Variants fall into
/// two families: configuration errors, which are synchronous and
/// non-retryable, and flow-control conditions, which signal that the peer
/// has not caught up yet and the caller should retry or poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid argument (bad length, misaligned payload, wrong role)
    InvalidArg,
    /// The instance pool has no free slot
    NoFreeInstances,
    /// Handle does not refer to a live instance
    InvalidInstance,
    /// Slot size is zero or not 4-byte aligned, or mismatches the peer
    InvalidSlotSize,
    /// Ring memory cannot hold at least two slots, or slot count mismatch
    InvalidNumSlots,
    /// Peer header carries an incompatible major version
    InvalidVersion,

    // =========================================================================
    // Flow-Control Conditions
    // =========================================================================
    /// Producer ring is full; the peer has not consumed yet
    ProducerNoFreeSlots,
    /// Consumer ring is empty; the peer has not produced yet
    ConsumerNoDataReceived,

    // =========================================================================
    // Attach / Handshake Errors
    // =========================================================================
    /// No published header magic; the producer side is not up
    ConsumerNotAvailable,
    /// Consume attempted before a successful attach
    ConsumerNotAttached,

    // =========================================================================
    // Hardware Errors
    // =========================================================================
    /// A memory read never returned two matching samples within the
    /// retry budget
    ReadUnstable,
}

impl Error {
    /// Check whether this error is a normal backpressure signal
    ///
    /// `ProducerNoFreeSlots` and `ConsumerNoDataReceived` mean "not ready
    /// yet"; the caller is expected to retry. Every other variant is a
    /// hard failure.
    #[inline]
    pub const fn is_backpressure(self) -> bool {
        matches!(
            self,
            Self::ProducerNoFreeSlots | Self::ConsumerNoDataReceived
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration
            Self::InvalidArg => write!(f, "invalid argument"),
            Self::NoFreeInstances => write!(f, "no free instance slots"),
            Self::InvalidInstance => write!(f, "invalid instance handle"),
            Self::InvalidSlotSize => write!(f, "invalid slot size"),
            Self::InvalidNumSlots => write!(f, "invalid slot count"),
            Self::InvalidVersion => write!(f, "incompatible header version"),

            // Flow control
            Self::ProducerNoFreeSlots => write!(f, "producer ring full"),
            Self::ConsumerNoDataReceived => write!(f, "consumer ring empty"),

            // Attach
            Self::ConsumerNotAvailable => write!(f, "peer not available"),
            Self::ConsumerNotAttached => write!(f, "consumer not attached"),

            // Hardware
            Self::ReadUnstable => write!(f, "memory read never stabilized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backpressure_classification() {
        assert!(Error::ProducerNoFreeSlots.is_backpressure());
        assert!(Error::ConsumerNoDataReceived.is_backpressure());

        assert!(!Error::InvalidArg.is_backpressure());
        assert!(!Error::ConsumerNotAvailable.is_backpressure());
        assert!(!Error::ReadUnstable.is_backpressure());
    }
}
