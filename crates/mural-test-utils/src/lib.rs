//! Testing utilities for the Mural workspace
//!
//! Shared fixtures: deterministic processor keys, canned identities, and a
//! pre-wired service over an in-memory 4x4 canvas.

#![allow(missing_docs)]

use ed25519_dalek::SigningKey;
use mural_core::{now_ms, GridConfig, ParticipantId};
use mural_payment::{AuthorizationId, MockProcessor, PaymentProcessor};
use mural_service::{
    CanvasService, Collaborators, Identity, NullPersistence, ServiceConfig, StaticIdentities,
};
use std::sync::Arc;

/// Deterministic signing key for reproducible confirmation fixtures
#[must_use]
pub fn fixed_signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// Identities every test service knows: `p1`/Pat and `p2`/Quinn
#[must_use]
pub fn test_identities() -> StaticIdentities {
    StaticIdentities::new()
        .with(Identity::new("p1", "Pat"))
        .with(Identity::new("p2", "Quinn"))
}

/// Default 4x4 grid with the reference 15-minute cooldown
#[must_use]
pub fn test_grid() -> GridConfig {
    GridConfig::new().with_dimensions(4, 4)
}

/// A started service over an in-memory 4x4 canvas plus its mock processor
#[must_use]
pub fn setup_service() -> (CanvasService, Arc<MockProcessor>) {
    setup_service_with_grid(test_grid())
}

/// A started service over a custom grid plus its mock processor
#[must_use]
pub fn setup_service_with_grid(grid: GridConfig) -> (CanvasService, Arc<MockProcessor>) {
    let processor = Arc::new(MockProcessor::with_key(fixed_signing_key()));
    let service = CanvasService::start(
        ServiceConfig::new().with_grid(grid),
        Collaborators {
            identity: Arc::new(test_identities()),
            processor_key: processor.verifying_key(),
            processor: Arc::clone(&processor) as Arc<dyn PaymentProcessor>,
            persistence: Arc::new(NullPersistence),
        },
    );
    (service, processor)
}

/// Walk a bypass request all the way to `Confirmed` and return its id
///
/// # Panics
/// On any rejection along the way; fixtures are expected to be valid.
pub async fn confirmed_bypass(
    service: &CanvasService,
    processor: &MockProcessor,
    participant: &ParticipantId,
    x: u32,
    y: u32,
    color: &str,
) -> AuthorizationId {
    let id = service
        .request_bypass(participant.clone(), x, y, color)
        .await
        .expect("bypass request should open");
    let session = processor.last_session().expect("session was issued");
    service
        .confirm_payment(&processor.settle(session, now_ms()))
        .expect("verified confirmation should land");
    id
}
