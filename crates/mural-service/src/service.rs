//! Canvas service
//!
//! Wires the grid store, rate gate, authorization ledger, fan-out, and the
//! persistence/identity/payment collaborators behind one façade:
//! - `submit` / `request_bypass` / `confirm_payment` for writers
//! - `snapshot` + `subscribe` for observers
//! - `export_board` / `import_board` for the admin bulk path, which goes
//!   through the same store contract as live writes
//!
//! Startup reloads the last persisted snapshot before any mutation is
//! accepted, and a background task expires stale bypass authorizations.

use crate::config::ServiceConfig;
use crate::fanout::Fanout;
use crate::identity::IdentityProvider;
use crate::persist::SnapshotPersistence;
use crate::pipeline::{self, PipelineContext, PipelineHandle, SubmitRequest};
use crate::snapshot::Snapshot;
use ed25519_dalek::VerifyingKey;
use mural_core::{
    now_ms, Color, CommittedMutation, Coord, GridStore, Participant, ParticipantId, RateGate,
    RejectionError,
};
use mural_payment::{
    AuthorizationId, AuthorizationLedger, AuthorizationStatus, ConfirmationNotice,
    PaymentProcessor, PaymentRequest,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// External collaborators the service is wired against
pub struct Collaborators {
    /// Identity collaborator (login handled elsewhere)
    pub identity: Arc<dyn IdentityProvider>,
    /// Payment processor for opening bypass sessions
    pub processor: Arc<dyn PaymentProcessor>,
    /// Public key confirmations must verify against
    pub processor_key: VerifyingKey,
    /// Snapshot persistence
    pub persistence: Arc<dyn SnapshotPersistence>,
}

/// Admin export of the full board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardExport {
    /// Grid width at export time
    pub width: u32,
    /// Grid height at export time
    pub height: u32,
    /// All painted cells
    pub cells: Vec<CommittedMutation>,
    /// Hex sha-256 over the canonical cell encoding
    pub digest: String,
}

/// Import failures for the admin bulk path
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Export digest does not match its cell content
    #[error("export digest mismatch")]
    DigestMismatch,

    /// The pipeline rejected the import
    #[error(transparent)]
    Rejected(#[from] RejectionError),
}

/// The collaborative canvas mutation and synchronization service
pub struct CanvasService {
    config: ServiceConfig,
    grid: Arc<GridStore>,
    gate: Arc<RateGate>,
    ledger: Arc<AuthorizationLedger>,
    fanout: Arc<Fanout>,
    identity: Arc<dyn IdentityProvider>,
    processor: Arc<dyn PaymentProcessor>,
    pipeline: PipelineHandle,
    sweep: JoinHandle<()>,
}

impl CanvasService {
    /// Start the service: reload persisted state, then begin accepting
    /// mutations
    ///
    /// A corrupt snapshot is logged and treated as empty, matching the
    /// durability trade-off in the persistence contract. Must be called from
    /// within a tokio runtime.
    #[must_use]
    pub fn start(config: ServiceConfig, collaborators: Collaborators) -> Self {
        let grid = Arc::new(GridStore::new(config.grid.clone()));
        let gate = Arc::new(RateGate::new(config.grid.cooldown_ms));
        let ledger = Arc::new(AuthorizationLedger::with_window(
            config.grid.clone(),
            collaborators.processor_key,
            config.authorization_window_ms,
        ));
        let fanout = Arc::new(Fanout::new(config.broadcast_capacity));

        // Reload before accepting mutations.
        match collaborators.persistence.load() {
            Ok(state) => {
                let cells = grid.restore(state.cells);
                let participants = gate.restore(state.participants);
                tracing::info!(cells, participants, "restored persisted canvas state");
            }
            Err(err) => {
                tracing::error!(%err, "failed to load persisted state; starting empty");
            }
        }

        let pipeline = pipeline::spawn(
            PipelineContext {
                grid: Arc::clone(&grid),
                gate: Arc::clone(&gate),
                ledger: Arc::clone(&ledger),
                fanout: Arc::clone(&fanout),
                persistence: Arc::clone(&collaborators.persistence),
                identity: Arc::clone(&collaborators.identity),
            },
            config.pipeline_queue_depth,
        );

        let sweep = spawn_expiry_sweep(Arc::clone(&ledger), config.sweep_interval_ms);

        Self {
            config,
            grid,
            gate,
            ledger,
            fanout,
            identity: collaborators.identity,
            processor: collaborators.processor,
            pipeline,
            sweep,
        }
    }

    /// Service configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Submit one mutation through the pipeline
    ///
    /// # Errors
    /// Any [`RejectionError`] per the validation order.
    pub async fn submit(
        &self,
        request: SubmitRequest,
    ) -> Result<CommittedMutation, RejectionError> {
        self.pipeline.submit(request).await
    }

    /// Request a payment bypass for one placement
    ///
    /// Opens a session with the payment processor and records a pending
    /// authorization; the returned id becomes consumable only after a
    /// verified confirmation callback.
    ///
    /// # Errors
    /// `OutOfBounds`, `InvalidColor`, `NotLoggedIn`, or `InvalidBypass` if
    /// the processor cannot open a session.
    pub async fn request_bypass(
        &self,
        participant: ParticipantId,
        x: u32,
        y: u32,
        color: &str,
    ) -> Result<AuthorizationId, RejectionError> {
        let coord = Coord::new(x, y);
        if !self.config.grid.contains(coord) {
            return Err(RejectionError::OutOfBounds { x, y });
        }
        let color: Color = color.parse()?;
        let identity = self
            .identity
            .resolve(&participant)
            .ok_or(RejectionError::NotLoggedIn)?;
        self.gate.register(identity.id, &identity.display_name);

        let request = PaymentRequest::placement(participant.clone(), coord, color);
        let session_ref = self
            .processor
            .initiate(&request)
            .await
            .map_err(RejectionError::from)?;

        self.ledger
            .open(participant, coord, color, session_ref, now_ms())
            .map_err(RejectionError::from)
    }

    /// Apply an asynchronous confirmation callback from the processor
    ///
    /// Verification happens before anything is trusted; an unverifiable
    /// notice is rejected and changes nothing.
    ///
    /// # Errors
    /// `PaymentUnverified` or `InvalidBypass` variants via the ledger.
    pub fn confirm_payment(
        &self,
        notice: &ConfirmationNotice,
    ) -> Result<AuthorizationId, RejectionError> {
        self.ledger
            .confirm(notice, now_ms())
            .map_err(RejectionError::from)
    }

    /// Current status of a bypass authorization
    #[must_use]
    pub fn authorization_status(&self, id: AuthorizationId) -> Option<AuthorizationStatus> {
        self.ledger.status(id)
    }

    /// Full authoritative state plus the server's logical now
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cells: self.grid.snapshot(),
            taken_at: now_ms(),
        }
    }

    /// Subscribe to mutations committed after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedMutation> {
        self.fanout.subscribe()
    }

    /// Direct read of one cell
    #[must_use]
    pub fn cell(&self, coord: Coord) -> Option<mural_core::Cell> {
        self.grid.get(coord)
    }

    /// A participant's bookkeeping (display name, cooldown clock, counter)
    #[must_use]
    pub fn participant_profile(&self, id: &ParticipantId) -> Option<Participant> {
        self.gate.get(id)
    }

    /// Export the full board with a content digest
    #[must_use]
    pub fn export_board(&self) -> BoardExport {
        let mut cells = self.grid.snapshot();
        cells.sort_by_key(|m| (m.x, m.y));
        let digest = board_digest(&cells);
        BoardExport {
            width: self.config.grid.width,
            height: self.config.grid.height,
            cells,
            digest,
        }
    }

    /// Import a board export, replaying every cell through the store contract
    ///
    /// Each imported cell is republished to observers, like any other commit.
    ///
    /// # Errors
    /// `DigestMismatch` for a tampered export; pipeline errors otherwise.
    pub async fn import_board(&self, export: BoardExport) -> Result<usize, ImportError> {
        let mut cells = export.cells;
        cells.sort_by_key(|m| (m.x, m.y));
        if board_digest(&cells) != export.digest {
            return Err(ImportError::DigestMismatch);
        }
        Ok(self.pipeline.import(cells).await?)
    }

    /// Number of painted cells
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }
}

impl Drop for CanvasService {
    fn drop(&mut self) {
        self.sweep.abort();
    }
}

/// Hex sha-256 over the canonical sorted cell encoding
fn board_digest(cells: &[CommittedMutation]) -> String {
    let mut hasher = Sha256::new();
    for cell in cells {
        // Canonical per-cell line keeps the digest stable across serializer
        // formatting changes.
        hasher.update(cell.x.to_le_bytes());
        hasher.update(cell.y.to_le_bytes());
        hasher.update(cell.color.to_string().as_bytes());
        hasher.update(cell.painted_by.0.as_bytes());
        hasher.update(cell.committed_at.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

fn spawn_expiry_sweep(ledger: Arc<AuthorizationLedger>, interval_ms: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            ledger.sweep_expired(now_ms());
        }
    })
}
