//! Error types for the payment-bypass workflow

use mural_core::RejectionError;

/// Payment workflow errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// No authorization with that id
    #[error("unknown authorization")]
    UnknownAuthorization,

    /// No authorization opened for that external session reference
    #[error("unknown session reference")]
    UnknownSession,

    /// Authorization belongs to a different participant
    #[error("authorization owned by another participant")]
    WrongParticipant,

    /// Authorization targets a different cell than the submission
    #[error("authorization target does not match submission")]
    TargetMismatch,

    /// Authorization was never confirmed (still pending or already expired)
    #[error("authorization not confirmed")]
    NotConfirmed,

    /// Authorization was already consumed once
    #[error("authorization already consumed")]
    AlreadyConsumed,

    /// Confirmation window elapsed without a verified confirmation
    #[error("authorization expired")]
    Expired,

    /// Confirmation callback failed authenticity verification
    #[error("confirmation not verifiable")]
    Unverified,

    /// Requested target falls outside the grid
    #[error("target ({x}, {y}) outside grid")]
    OutOfBounds {
        /// Requested column
        x: u32,
        /// Requested row
        y: u32,
    },

    /// External processor could not open a session
    #[error("processor error: {0}")]
    ProcessorFailed(String),
}

impl From<PaymentError> for RejectionError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Unverified => RejectionError::PaymentUnverified,
            PaymentError::AlreadyConsumed => RejectionError::AlreadyConsumed,
            PaymentError::OutOfBounds { x, y } => RejectionError::OutOfBounds { x, y },
            other => RejectionError::InvalidBypass(other.to_string()),
        }
    }
}
