//! Snapshot and reconciliation protocol
//!
//! A newly joined or desynchronized observer fetches the full authoritative
//! state, applies it, then subscribes to the fan-out. Because a mutation may
//! arrive that the snapshot already reflects, replica application is
//! idempotent: a cell only changes when the incoming commit timestamp is
//! newer, so replays and overlaps are no-ops.

use mural_core::{Cell, CommittedMutation, Coord, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Full authoritative state at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// All painted cells
    pub cells: Vec<CommittedMutation>,
    /// Server's logical "now" when the snapshot was taken, ms epoch
    pub taken_at: Timestamp,
}

impl Snapshot {
    /// Number of painted cells in the snapshot
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the canvas was empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Observer-side reconstruction of the canvas
#[derive(Debug, Clone, Default)]
pub struct Replica {
    cells: HashMap<Coord, Cell>,
}

impl Replica {
    /// Create an empty replica
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace local state with a snapshot
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.cells.clear();
        for m in &snapshot.cells {
            self.apply(m);
        }
    }

    /// Apply one broadcast mutation; returns whether local state changed
    ///
    /// Older or equal-timestamp repeats of an already-applied commit are
    /// no-ops, which makes overlap between a snapshot and the live stream
    /// harmless.
    pub fn apply(&mut self, mutation: &CommittedMutation) -> bool {
        let coord = mutation.coord();
        match self.cells.get(&coord) {
            Some(current) if current.committed_at > mutation.committed_at => false,
            Some(current)
                if current.committed_at == mutation.committed_at
                    && current.color == mutation.color
                    && current.painted_by == mutation.painted_by =>
            {
                false
            }
            _ => {
                self.cells.insert(
                    coord,
                    Cell {
                        color: mutation.color,
                        painted_by: mutation.painted_by.clone(),
                        committed_at: mutation.committed_at,
                    },
                );
                true
            }
        }
    }

    /// Local view of one coordinate
    #[must_use]
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    /// Number of painted cells in the local view
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the local view is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
