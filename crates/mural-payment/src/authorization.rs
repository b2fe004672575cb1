//! Pending payment authorizations
//!
//! One record per in-flight bypass request, moving through
//! `pending → confirmed → consumed`, or `pending → expired`. A confirmed
//! authorization is consumable exactly once; every other transition attempt
//! is a structured error, never a silent success.

use crate::error::PaymentError;
use crate::processor::ExternalSessionRef;
use mural_core::{Color, Coord, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique authorization identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuthorizationId(pub Ulid);

impl AuthorizationId {
    /// Generate new authorization ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AuthorizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuthorizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorization lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// Awaiting external confirmation
    Pending,
    /// Confirmed by a verified callback; consumable once
    Confirmed,
    /// Consumed by exactly one committed mutation
    Consumed,
    /// Confirmation window elapsed; permanently inert
    Expired,
}

/// One in-flight payment-bypass request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Authorization id handed back to the requesting client
    pub id: AuthorizationId,
    /// Owning participant
    pub participant: ParticipantId,
    /// Target cell, fixed at request time
    pub target: Coord,
    /// Requested color, fixed at request time
    pub color: Color,
    /// Lifecycle state
    pub status: AuthorizationStatus,
    /// Reference the external processor echoes back on confirmation
    pub session_ref: ExternalSessionRef,
    /// When the request was opened
    pub opened_at: Timestamp,
    /// End of the confirmation window
    pub expires_at: Timestamp,
}

impl PendingAuthorization {
    /// Open a new pending authorization
    #[must_use]
    pub fn open(
        participant: ParticipantId,
        target: Coord,
        color: Color,
        session_ref: ExternalSessionRef,
        now: Timestamp,
        window_ms: Timestamp,
    ) -> Self {
        Self {
            id: AuthorizationId::new(),
            participant,
            target,
            color,
            status: AuthorizationStatus::Pending,
            session_ref,
            opened_at: now,
            expires_at: now.saturating_add(window_ms),
        }
    }

    /// Whether the confirmation window has elapsed
    #[inline]
    #[must_use]
    pub fn is_past_window(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// `pending → confirmed`
    ///
    /// Only callable after the caller has verified the external confirmation;
    /// a late confirmation finds the window closed and expires instead.
    ///
    /// # Errors
    /// `Expired` past the window, `AlreadyConsumed` after a consume,
    /// `NotConfirmed` never (confirming twice is idempotent-rejected as
    /// a no-transition error).
    pub fn confirm(&mut self, now: Timestamp) -> Result<(), PaymentError> {
        match self.status {
            AuthorizationStatus::Pending if self.is_past_window(now) => {
                self.status = AuthorizationStatus::Expired;
                Err(PaymentError::Expired)
            }
            AuthorizationStatus::Pending => {
                self.status = AuthorizationStatus::Confirmed;
                Ok(())
            }
            AuthorizationStatus::Confirmed => Ok(()),
            AuthorizationStatus::Consumed => Err(PaymentError::AlreadyConsumed),
            AuthorizationStatus::Expired => Err(PaymentError::Expired),
        }
    }

    /// `confirmed → consumed`, at most once
    ///
    /// # Errors
    /// `AlreadyConsumed` on the second and later attempts, `NotConfirmed`
    /// while still pending, `Expired` after the window.
    pub fn consume(&mut self, now: Timestamp) -> Result<(), PaymentError> {
        match self.status {
            AuthorizationStatus::Confirmed => {
                self.status = AuthorizationStatus::Consumed;
                Ok(())
            }
            AuthorizationStatus::Consumed => Err(PaymentError::AlreadyConsumed),
            AuthorizationStatus::Pending if self.is_past_window(now) => {
                self.status = AuthorizationStatus::Expired;
                Err(PaymentError::Expired)
            }
            AuthorizationStatus::Pending => Err(PaymentError::NotConfirmed),
            AuthorizationStatus::Expired => Err(PaymentError::Expired),
        }
    }

    /// `pending → expired` if the window has elapsed; returns whether it fired
    pub fn expire_if_due(&mut self, now: Timestamp) -> bool {
        if self.status == AuthorizationStatus::Pending && self.is_past_window(now) {
            self.status = AuthorizationStatus::Expired;
            true
        } else {
            false
        }
    }
}
