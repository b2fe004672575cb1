//! External payment processor interface
//!
//! The core never trusts a client-supplied "paid" token. It opens a session
//! with the processor, and later accepts only a confirmation notice whose
//! signature verifies against the processor's known public key. An
//! unverifiable notice is rejected outright and changes nothing.

use crate::error::PaymentError;
use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use mural_core::{Color, Coord, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Price of one instant placement, in cents
pub const PLACEMENT_PRICE_CENTS: u32 = 100;

/// Opaque reference the processor echoes back on confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalSessionRef(pub Ulid);

impl ExternalSessionRef {
    /// Generate new session reference
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ExternalSessionRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExternalSessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the participant is paying for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Paying participant
    pub participant: ParticipantId,
    /// Cell the bypass will paint
    pub target: Coord,
    /// Color the bypass will paint
    pub color: Color,
    /// Amount charged, in cents
    pub amount_cents: u32,
}

impl PaymentRequest {
    /// Create a placement payment request at the standard price
    #[inline]
    #[must_use]
    pub fn placement(participant: ParticipantId, target: Coord, color: Color) -> Self {
        Self {
            participant,
            target,
            color,
            amount_cents: PLACEMENT_PRICE_CENTS,
        }
    }
}

/// Asynchronous confirmation pushed by the processor
///
/// `signature` covers the canonical message over `(session_ref, paid_at)`;
/// verification against the processor's public key is the sole source of
/// trust for the confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmationNotice {
    /// Session this confirmation settles
    pub session_ref: ExternalSessionRef,
    /// Processor-side settlement time, ms epoch
    pub paid_at: Timestamp,
    /// Detached signature over [`confirmation_message`]
    pub signature: Signature,
}

impl ConfirmationNotice {
    /// Verify the notice against the processor's public key
    #[must_use]
    pub fn verify(&self, verifying_key: &VerifyingKey) -> bool {
        let message = confirmation_message(self.session_ref, self.paid_at);
        verifying_key.verify(&message, &self.signature).is_ok()
    }
}

/// Canonical byte message a confirmation signature covers
#[must_use]
pub fn confirmation_message(session_ref: ExternalSessionRef, paid_at: Timestamp) -> Vec<u8> {
    let mut msg = Vec::with_capacity(16 + 8);
    msg.extend_from_slice(&session_ref.0 .0.to_le_bytes());
    msg.extend_from_slice(&paid_at.to_le_bytes());
    msg
}

/// External payment processor collaborator
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Open a payment session; the returned reference will be echoed back
    /// by the confirmation callback once the participant pays.
    ///
    /// # Errors
    /// `PaymentError::ProcessorFailed` if the session cannot be opened.
    async fn initiate(&self, request: &PaymentRequest) -> Result<ExternalSessionRef, PaymentError>;
}

/// In-process processor that settles instantly
///
/// Stands in for the hosted checkout flow: it issues session references and
/// signs confirmations with its own key, so the verification path is
/// exercised end to end without leaving the process. Issued references are
/// recorded so a harness can settle them later.
pub struct MockProcessor {
    signing_key: SigningKey,
    sessions: parking_lot::Mutex<Vec<ExternalSessionRef>>,
}

impl MockProcessor {
    /// Create a processor with a fresh random key
    #[must_use]
    pub fn new() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self::with_key(SigningKey::generate(&mut csprng))
    }

    /// Create a processor over a known key
    #[inline]
    #[must_use]
    pub fn with_key(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            sessions: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Most recently issued session reference, if any
    #[must_use]
    pub fn last_session(&self) -> Option<ExternalSessionRef> {
        self.sessions.lock().last().copied()
    }

    /// Public key the service should verify confirmations against
    #[inline]
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Produce a properly signed confirmation for a session
    #[must_use]
    pub fn settle(&self, session_ref: ExternalSessionRef, paid_at: Timestamp) -> ConfirmationNotice {
        let message = confirmation_message(session_ref, paid_at);
        ConfirmationNotice {
            session_ref,
            paid_at,
            signature: self.signing_key.sign(&message),
        }
    }
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn initiate(&self, request: &PaymentRequest) -> Result<ExternalSessionRef, PaymentError> {
        let session_ref = ExternalSessionRef::new();
        self.sessions.lock().push(session_ref);
        tracing::debug!(
            participant = %request.participant,
            target = %request.target,
            amount_cents = request.amount_cents,
            %session_ref,
            "opened mock payment session"
        );
        Ok(session_ref)
    }
}
