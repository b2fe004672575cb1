//! Mutation pipeline
//!
//! The single mutation-serialization point for one grid instance. All writes
//! flow through one actor task with an inbound queue, so the gate check, the
//! grid overwrite, and the gate update happen as one step no interleaving can
//! split. Reads (`get`, `snapshot`) stay outside and observe a prefix of the
//! commit sequence.
//!
//! Validation is fail-fast, first failing check wins:
//! bounds → color → identity → bypass (if given) → rate gate → commit.

use crate::fanout::Fanout;
use crate::identity::IdentityProvider;
use crate::persist::{PersistedState, SnapshotPersistence};
use mural_core::{
    now_ms, Color, CommittedMutation, Coord, GateDecision, GridStore, ParticipantId, RateGate,
    RejectionError,
};
use mural_payment::{AuthorizationId, AuthorizationLedger};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// One write request as received from a client
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Requesting participant
    pub participant: ParticipantId,
    /// Target column
    pub x: u32,
    /// Target row
    pub y: u32,
    /// Requested color, raw client input
    pub color: String,
    /// Confirmed bypass authorization, if paying to skip the cooldown
    pub bypass: Option<AuthorizationId>,
}

impl SubmitRequest {
    /// Create a free-path submission
    #[must_use]
    pub fn free(participant: ParticipantId, x: u32, y: u32, color: impl Into<String>) -> Self {
        Self {
            participant,
            x,
            y,
            color: color.into(),
            bypass: None,
        }
    }

    /// Attach a bypass authorization
    #[inline]
    #[must_use]
    pub fn with_bypass(mut self, authorization: AuthorizationId) -> Self {
        self.bypass = Some(authorization);
        self
    }
}

/// Commands processed by the pipeline actor
enum PipelineCommand {
    Submit {
        request: SubmitRequest,
        reply: oneshot::Sender<Result<CommittedMutation, RejectionError>>,
    },
    Import {
        cells: Vec<CommittedMutation>,
        reply: oneshot::Sender<usize>,
    },
}

/// Shared collaborators the pipeline commits against
pub(crate) struct PipelineContext {
    pub(crate) grid: Arc<GridStore>,
    pub(crate) gate: Arc<RateGate>,
    pub(crate) ledger: Arc<AuthorizationLedger>,
    pub(crate) fanout: Arc<Fanout>,
    pub(crate) persistence: Arc<dyn SnapshotPersistence>,
    pub(crate) identity: Arc<dyn IdentityProvider>,
}

/// Handle for submitting mutations to the pipeline actor
#[derive(Clone)]
pub struct PipelineHandle {
    sender: mpsc::Sender<PipelineCommand>,
}

impl PipelineHandle {
    /// Submit one mutation request
    ///
    /// # Errors
    /// Any [`RejectionError`]; `GridStoreUnavailable` if the pipeline actor
    /// is gone, which is fatal to this request only.
    pub async fn submit(
        &self,
        request: SubmitRequest,
    ) -> Result<CommittedMutation, RejectionError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(PipelineCommand::Submit { request, reply })
            .await
            .map_err(|_| RejectionError::GridStoreUnavailable("pipeline closed".to_string()))?;
        response
            .await
            .map_err(|_| RejectionError::GridStoreUnavailable("pipeline dropped".to_string()))?
    }

    /// Replay a bulk cell list through the store contract, publishing each
    ///
    /// # Errors
    /// `GridStoreUnavailable` if the pipeline actor is gone.
    pub async fn import(
        &self,
        cells: Vec<CommittedMutation>,
    ) -> Result<usize, RejectionError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(PipelineCommand::Import { cells, reply })
            .await
            .map_err(|_| RejectionError::GridStoreUnavailable("pipeline closed".to_string()))?;
        response
            .await
            .map_err(|_| RejectionError::GridStoreUnavailable("pipeline dropped".to_string()))
    }
}

/// Spawn the pipeline actor; dropping every handle stops it
pub(crate) fn spawn(context: PipelineContext, queue_depth: usize) -> PipelineHandle {
    let (sender, receiver) = mpsc::channel(queue_depth);
    let (updates, latest) = watch::channel(PersistedState::default());
    tokio::spawn(persist_task(latest, Arc::clone(&context.persistence)));
    tokio::spawn(pipeline_task(receiver, context, updates));
    PipelineHandle { sender }
}

/// Pipeline actor loop (runs in its own tokio task)
async fn pipeline_task(
    mut receiver: mpsc::Receiver<PipelineCommand>,
    context: PipelineContext,
    updates: watch::Sender<PersistedState>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            PipelineCommand::Submit { request, reply } => {
                let result = handle_submit(&context, request);
                if result.is_ok() {
                    persist_after_commit(&context, &updates);
                }
                let _ = reply.send(result);
            }
            PipelineCommand::Import { cells, reply } => {
                let imported = handle_import(&context, cells);
                if imported > 0 {
                    persist_after_commit(&context, &updates);
                }
                let _ = reply.send(imported);
            }
        }
    }
    tracing::debug!("pipeline actor stopped");
}

fn handle_submit(
    context: &PipelineContext,
    request: SubmitRequest,
) -> Result<CommittedMutation, RejectionError> {
    let coord = Coord::new(request.x, request.y);

    // 1. Bounds
    if !context.grid.config().contains(coord) {
        return Err(RejectionError::OutOfBounds {
            x: coord.x,
            y: coord.y,
        });
    }

    // 2. Color
    let color: Color = request.color.parse()?;

    // 3. Identity
    let identity = context
        .identity
        .resolve(&request.participant)
        .ok_or(RejectionError::NotLoggedIn)?;
    context
        .gate
        .register(identity.id.clone(), &identity.display_name);

    let now = now_ms();

    // 4/5. Bypass or rate gate, then 6. commit. Gate update happens iff the
    // grid write lands, all inside this serialized section.
    let committed = match request.bypass {
        Some(authorization) => {
            let paid_color = context
                .ledger
                .consume(authorization, &request.participant, coord, now)
                .map_err(RejectionError::from)?;
            let committed = context
                .grid
                .set(coord, paid_color, request.participant.clone(), now)?;
            context.gate.record_paid_commit(&request.participant);
            tracing::info!(
                participant = %request.participant,
                %coord,
                %authorization,
                "committed bypass mutation"
            );
            committed
        }
        None => match context.gate.try_consume_free(&request.participant, now) {
            GateDecision::Blocked { retry_after_ms } => {
                return Err(RejectionError::Cooldown { retry_after_ms });
            }
            GateDecision::Allowed => {
                let committed = context
                    .grid
                    .set(coord, color, request.participant.clone(), now)?;
                context.gate.record_free_commit(&request.participant, now);
                tracing::info!(
                    participant = %request.participant,
                    %coord,
                    "committed free mutation"
                );
                committed
            }
        },
    };

    context.fanout.publish(&committed);
    Ok(committed)
}

fn handle_import(context: &PipelineContext, cells: Vec<CommittedMutation>) -> usize {
    let mut imported = 0;
    for m in cells {
        match context.grid.set(m.coord(), m.color, m.painted_by, m.committed_at) {
            Ok(committed) => {
                context.fanout.publish(&committed);
                imported += 1;
            }
            Err(err) => {
                tracing::warn!(%err, "skipping cell during import");
            }
        }
    }
    tracing::info!(imported, "imported board cells");
    imported
}

/// Snapshot current state inside the serialized section, hand it to the
/// persistence writer
fn persist_after_commit(context: &PipelineContext, updates: &watch::Sender<PersistedState>) {
    let state = PersistedState {
        cells: context.grid.snapshot(),
        participants: context.gate.export(),
    };
    // send only errors once the writer task has stopped.
    let _ = updates.send(state);
}

/// Single persistence writer for one grid instance
///
/// Writes are strictly sequential and the watch channel coalesces bursts to
/// the newest state, so snapshot files are never written concurrently and an
/// older snapshot never lands after a newer one.
async fn persist_task(
    mut latest: watch::Receiver<PersistedState>,
    persistence: Arc<dyn SnapshotPersistence>,
) {
    while latest.changed().await.is_ok() {
        let state = latest.borrow_and_update().clone();
        let persistence = Arc::clone(&persistence);
        match tokio::task::spawn_blocking(move || persistence.persist(&state)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                // Accepted durability trade-off: the in-memory commit stands.
                tracing::error!(%err, "snapshot persistence failed");
            }
            Err(err) => {
                tracing::error!(%err, "snapshot persistence writer panicked");
            }
        }
    }
    tracing::debug!("persistence writer stopped");
}
