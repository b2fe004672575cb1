//! Mural Core - authoritative canvas state
//!
//! The single source of truth for the shared grid:
//! - Grid store with atomic cell overwrites and consistent snapshots
//! - Per-participant cooldown gate
//! - Shared types (coordinates, colors, participants, committed mutations)
//! - The full structured rejection taxonomy
//!
//! # Example
//!
//! ```rust
//! use mural_core::{Color, Coord, GridConfig, GridStore};
//!
//! let grid = GridStore::new(GridConfig::new().with_dimensions(4, 4));
//! let committed = grid
//!     .set(Coord::new(1, 1), Color::rgb(255, 0, 0), "p1".into(), 1_000)
//!     .unwrap();
//! assert_eq!(committed.color.to_string(), "#ff0000");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod grid;
pub mod rate;
pub mod types;

// Re-exports for convenience
pub use error::RejectionError;
pub use grid::GridStore;
pub use rate::{GateDecision, RateGate};
pub use types::{
    now_ms, Cell, Color, CommittedMutation, Coord, GridConfig, Participant, ParticipantId,
    Timestamp,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the canvas core
    pub use crate::{
        Cell, Color, CommittedMutation, Coord, GateDecision, GridConfig, GridStore, Participant,
        ParticipantId, RateGate, RejectionError, Timestamp,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
