//! Per-participant cooldown gate
//!
//! Decides whether a free mutation is currently permitted. The gate check is
//! deliberately read-only: `try_consume_free` answers "would this be allowed
//! now", and the caller records the commit with `record_free_commit` iff the
//! mutation actually lands. The mutation pipeline performs both inside its
//! serialization point so check-then-update is never racy.

use crate::types::{Participant, ParticipantId, Timestamp};
use dashmap::DashMap;

/// Outcome of a free-path gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Free mutation permitted now
    Allowed,
    /// Still cooling down
    Blocked {
        /// Remaining wait in milliseconds, floored at zero
        retry_after_ms: Timestamp,
    },
}

impl GateDecision {
    /// Whether the mutation may proceed
    #[inline]
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Per-participant cooldown clock and bookkeeping
#[derive(Debug)]
pub struct RateGate {
    cooldown_ms: Timestamp,
    participants: DashMap<ParticipantId, Participant>,
}

impl RateGate {
    /// Create a gate with the given cooldown
    #[inline]
    #[must_use]
    pub fn new(cooldown_ms: Timestamp) -> Self {
        Self {
            cooldown_ms,
            participants: DashMap::new(),
        }
    }

    /// Cooldown duration in milliseconds
    #[inline]
    #[must_use]
    pub fn cooldown_ms(&self) -> Timestamp {
        self.cooldown_ms
    }

    /// Ensure a participant record exists, creating a fresh one if needed
    pub fn register(&self, id: ParticipantId, display_name: &str) {
        self.participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id, display_name));
    }

    /// Look up a participant's current bookkeeping
    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants.get(id).map(|p| p.clone())
    }

    /// Check whether a free mutation is permitted at `now`
    ///
    /// Read-only; the caller must follow up with [`record_free_commit`] iff
    /// the mutation commits.
    ///
    /// [`record_free_commit`]: RateGate::record_free_commit
    #[must_use]
    pub fn try_consume_free(&self, id: &ParticipantId, now: Timestamp) -> GateDecision {
        let last = self
            .participants
            .get(id)
            .and_then(|p| p.last_free_mutation_at);

        match last {
            None => GateDecision::Allowed,
            Some(last_free) => {
                let retry_after_ms = (self.cooldown_ms - (now - last_free)).max(0);
                if retry_after_ms == 0 {
                    GateDecision::Allowed
                } else {
                    GateDecision::Blocked { retry_after_ms }
                }
            }
        }
    }

    /// Record a committed free mutation
    ///
    /// Advances `last_free_mutation_at` (never rewinds it) and bumps the
    /// mutation counter.
    pub fn record_free_commit(&self, id: &ParticipantId, now: Timestamp) {
        if let Some(mut p) = self.participants.get_mut(id) {
            p.last_free_mutation_at = Some(match p.last_free_mutation_at {
                Some(prev) => prev.max(now),
                None => now,
            });
            p.mutation_count += 1;
        }
    }

    /// Record a committed paid (bypass) mutation
    ///
    /// Bumps the counter only; the cooldown clock is untouched by design.
    pub fn record_paid_commit(&self, id: &ParticipantId) {
        if let Some(mut p) = self.participants.get_mut(id) {
            p.mutation_count += 1;
        }
    }

    /// All participant records, for persistence
    #[must_use]
    pub fn export(&self) -> Vec<Participant> {
        self.participants.iter().map(|p| p.clone()).collect()
    }

    /// Reload participant records from a persisted snapshot
    pub fn restore<I>(&self, participants: I) -> usize
    where
        I: IntoIterator<Item = Participant>,
    {
        let mut restored = 0;
        for p in participants {
            self.participants.insert(p.id.clone(), p);
            restored += 1;
        }
        restored
    }
}
