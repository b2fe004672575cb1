//! Mural Payment - verified payment-bypass workflow
//!
//! Lets a participant buy one cooldown-exempt placement:
//! - `PendingAuthorization` state machine
//!   (`pending → confirmed → consumed`, or `pending → expired`)
//! - `PaymentProcessor` collaborator trait with an in-process mock
//! - Signature-verified confirmation callbacks; unverified callbacks fail
//!   closed
//! - Authorization ledger with at-most-once consumption
//!
//! # Example
//!
//! ```rust
//! use mural_core::{Color, Coord, GridConfig};
//! use mural_payment::{AuthorizationLedger, ExternalSessionRef, MockProcessor};
//!
//! let processor = MockProcessor::new();
//! let ledger = AuthorizationLedger::new(GridConfig::new(), processor.verifying_key());
//!
//! let session = ExternalSessionRef::new();
//! let id = ledger
//!     .open("p1".into(), Coord::new(2, 2), Color::rgb(0, 0, 255), session, 1_000)
//!     .unwrap();
//!
//! ledger.confirm(&processor.settle(session, 2_000), 2_000).unwrap();
//! let color = ledger.consume(id, &"p1".into(), Coord::new(2, 2), 3_000).unwrap();
//! assert_eq!(color, Color::rgb(0, 0, 255));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod authorization;
pub mod error;
pub mod ledger;
pub mod processor;

// Re-exports for convenience
pub use authorization::{AuthorizationId, AuthorizationStatus, PendingAuthorization};
pub use error::PaymentError;
pub use ledger::{AuthorizationLedger, DEFAULT_WINDOW_MS};
pub use processor::{
    confirmation_message, ConfirmationNotice, ExternalSessionRef, MockProcessor, PaymentProcessor,
    PaymentRequest, PLACEMENT_PRICE_CENTS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
