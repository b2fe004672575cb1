//! Mural Service - mutation pipeline and synchronization
//!
//! The service layer over the canvas core:
//! - Mutation pipeline actor (the single mutation-serialization point)
//! - Broadcast fan-out to live observers, in commit order
//! - Snapshot/reconciliation protocol with an idempotent observer replica
//! - Persistence, identity, and payment collaborator seams
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mural_core::GridConfig;
//! use mural_payment::MockProcessor;
//! use mural_service::{
//!     CanvasService, Collaborators, Identity, NullPersistence, ServiceConfig, StaticIdentities,
//!     SubmitRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let processor = Arc::new(MockProcessor::new());
//! let identities = StaticIdentities::new().with(Identity::new("p1", "Pat"));
//!
//! let service = CanvasService::start(
//!     ServiceConfig::new().with_grid(GridConfig::new().with_dimensions(4, 4)),
//!     Collaborators {
//!         identity: Arc::new(identities),
//!         processor_key: processor.verifying_key(),
//!         processor,
//!         persistence: Arc::new(NullPersistence),
//!     },
//! );
//!
//! let committed = service
//!     .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
//!     .await?;
//! println!("painted {} at ({}, {})", committed.color, committed.x, committed.y);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod fanout;
pub mod identity;
pub mod persist;
pub mod pipeline;
pub mod service;
pub mod snapshot;

// Re-exports for convenience
pub use config::ServiceConfig;
pub use fanout::Fanout;
pub use identity::{Identity, IdentityProvider, StaticIdentities};
pub use persist::{JsonFilePersistence, NullPersistence, PersistError, PersistedState, SnapshotPersistence};
pub use pipeline::{PipelineHandle, SubmitRequest};
pub use service::{BoardExport, CanvasService, Collaborators, ImportError};
pub use snapshot::{Replica, Snapshot};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the canvas service
    pub use crate::{
        CanvasService, Collaborators, Identity, IdentityProvider, Replica, ServiceConfig,
        Snapshot, SnapshotPersistence, SubmitRequest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
