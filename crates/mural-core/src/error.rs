//! Error types for the canvas core
//!
//! Every rejection a caller can see is a structured variant here, never an
//! opaque fault:
//! - Validation failures (bounds, color, identity)
//! - Cooldown rejections carrying the remaining wait
//! - Bypass misuse (invalid, double-consume, unverified payment)
//! - Non-fatal persistence failures and per-request store faults

use crate::types::Timestamp;

/// Rejection taxonomy for canvas operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionError {
    /// Target coordinate is outside the grid
    #[error("out_of_bounds: ({x}, {y}) outside grid")]
    OutOfBounds {
        /// Requested column
        x: u32,
        /// Requested row
        y: u32,
    },

    /// Color is not a well-formed 24-bit hex value
    #[error("invalid_color: {0:?}")]
    InvalidColor(String),

    /// Participant identity could not be resolved
    #[error("not_logged_in")]
    NotLoggedIn,

    /// Free mutation blocked by the cooldown
    #[error("cooldown: retry after {retry_after_ms}ms")]
    Cooldown {
        /// Remaining wait before the next free mutation, floored at zero
        retry_after_ms: Timestamp,
    },

    /// Bypass authorization missing, foreign, mistargeted, or not confirmed
    #[error("invalid_bypass: {0}")]
    InvalidBypass(String),

    /// Bypass authorization was already consumed once
    #[error("already_consumed")]
    AlreadyConsumed,

    /// Payment confirmation failed authenticity verification
    #[error("payment_unverified")]
    PaymentUnverified,

    /// Snapshot persistence failed; the in-memory commit stands
    #[error("persistence_failure: {0}")]
    PersistenceFailure(String),

    /// Grid store unreachable; fatal to this request only
    #[error("grid_store_unavailable: {0}")]
    GridStoreUnavailable(String),
}

impl RejectionError {
    /// Whether the rejection indicates a caller bug rather than contention
    #[inline]
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. } | Self::InvalidColor(_) | Self::InvalidBypass(_)
        )
    }

    /// Whether the caller can succeed by retrying later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cooldown { .. } | Self::GridStoreUnavailable(_)
        )
    }

    /// Remaining cooldown wait, if this is a cooldown rejection
    #[inline]
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<Timestamp> {
        match self {
            Self::Cooldown { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
