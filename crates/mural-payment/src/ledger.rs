//! Authorization ledger
//!
//! The server's own record of every bypass request. Placement is granted on
//! the strength of this ledger alone: a confirmation callback must verify
//! against the processor's public key before it can move a record to
//! `Confirmed`, and consumption is an atomic check-and-set under the entry
//! guard so concurrent consumes yield exactly one success.

use crate::authorization::{AuthorizationId, AuthorizationStatus, PendingAuthorization};
use crate::error::PaymentError;
use crate::processor::{ConfirmationNotice, ExternalSessionRef};
use dashmap::DashMap;
use ed25519_dalek::VerifyingKey;
use mural_core::{Color, Coord, GridConfig, ParticipantId, Timestamp};

/// Default confirmation window: 30 minutes
pub const DEFAULT_WINDOW_MS: Timestamp = 30 * 60 * 1000;

/// Ledger of in-flight and settled bypass authorizations
pub struct AuthorizationLedger {
    grid: GridConfig,
    processor_key: VerifyingKey,
    window_ms: Timestamp,
    by_id: DashMap<AuthorizationId, PendingAuthorization>,
    by_session: DashMap<ExternalSessionRef, AuthorizationId>,
}

impl AuthorizationLedger {
    /// Create a ledger trusting confirmations signed by `processor_key`
    #[must_use]
    pub fn new(grid: GridConfig, processor_key: VerifyingKey) -> Self {
        Self::with_window(grid, processor_key, DEFAULT_WINDOW_MS)
    }

    /// Create a ledger with a custom confirmation window
    #[must_use]
    pub fn with_window(
        grid: GridConfig,
        processor_key: VerifyingKey,
        window_ms: Timestamp,
    ) -> Self {
        Self {
            grid,
            processor_key,
            window_ms,
            by_id: DashMap::new(),
            by_session: DashMap::new(),
        }
    }

    /// Open a pending authorization for a bypass request
    ///
    /// # Errors
    /// `PaymentError::OutOfBounds` if the target is outside the grid; nothing
    /// is recorded in that case.
    pub fn open(
        &self,
        participant: ParticipantId,
        target: Coord,
        color: Color,
        session_ref: ExternalSessionRef,
        now: Timestamp,
    ) -> Result<AuthorizationId, PaymentError> {
        if !self.grid.contains(target) {
            return Err(PaymentError::OutOfBounds {
                x: target.x,
                y: target.y,
            });
        }

        let auth =
            PendingAuthorization::open(participant, target, color, session_ref, now, self.window_ms);
        let id = auth.id;
        self.by_session.insert(session_ref, id);
        self.by_id.insert(id, auth);
        tracing::info!(authorization = %id, %session_ref, "opened bypass authorization");
        Ok(id)
    }

    /// Apply an external confirmation callback
    ///
    /// Signature verification happens first and fails closed: an unverifiable
    /// notice leaves every record untouched.
    ///
    /// # Errors
    /// `Unverified` for a bad signature, `UnknownSession` if no authorization
    /// was opened for the echoed reference, plus the state-machine errors for
    /// late or replayed confirmations.
    pub fn confirm(
        &self,
        notice: &ConfirmationNotice,
        now: Timestamp,
    ) -> Result<AuthorizationId, PaymentError> {
        if !notice.verify(&self.processor_key) {
            tracing::warn!(session_ref = %notice.session_ref, "rejected unverifiable confirmation");
            return Err(PaymentError::Unverified);
        }

        let id = *self
            .by_session
            .get(&notice.session_ref)
            .ok_or(PaymentError::UnknownSession)?;
        let mut auth = self
            .by_id
            .get_mut(&id)
            .ok_or(PaymentError::UnknownAuthorization)?;
        auth.confirm(now)?;
        tracing::info!(authorization = %id, "confirmed bypass authorization");
        Ok(id)
    }

    /// Consume a confirmed authorization for one committed mutation
    ///
    /// Ownership, target, and state are all checked under the entry guard;
    /// two racing consumes see exactly one success and one `AlreadyConsumed`.
    ///
    /// # Errors
    /// `UnknownAuthorization`, `WrongParticipant`, `TargetMismatch`, or the
    /// state-machine errors (`NotConfirmed`, `AlreadyConsumed`, `Expired`).
    pub fn consume(
        &self,
        id: AuthorizationId,
        participant: &ParticipantId,
        target: Coord,
        now: Timestamp,
    ) -> Result<Color, PaymentError> {
        let mut auth = self
            .by_id
            .get_mut(&id)
            .ok_or(PaymentError::UnknownAuthorization)?;

        if auth.participant != *participant {
            return Err(PaymentError::WrongParticipant);
        }
        if auth.target != target {
            return Err(PaymentError::TargetMismatch);
        }
        auth.consume(now)?;
        Ok(auth.color)
    }

    /// Current status of an authorization
    #[must_use]
    pub fn status(&self, id: AuthorizationId) -> Option<AuthorizationStatus> {
        self.by_id.get(&id).map(|a| a.status)
    }

    /// Expire every stale pending authorization; returns how many fired
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let mut expired = 0;
        for mut entry in self.by_id.iter_mut() {
            if entry.expire_if_due(now) {
                expired += 1;
            }
        }
        if expired > 0 {
            tracing::debug!(expired, "expired stale bypass authorizations");
        }
        expired
    }

    /// Number of tracked authorizations, in any state
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the ledger has no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
