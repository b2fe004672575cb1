//! Authoritative grid store
//!
//! Single source of truth for cell state. `set` is the only mutator and is
//! atomic per call; readers (`get`, `snapshot`) observe a consistent prefix
//! of the commit sequence because both sides go through one `RwLock`.
//!
//! The store never performs I/O; persistence is a collaborator upstream.

use crate::error::RejectionError;
use crate::types::{Cell, Color, CommittedMutation, Coord, GridConfig, ParticipantId, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Authoritative coordinate → cell mapping
#[derive(Debug)]
pub struct GridStore {
    config: GridConfig,
    cells: RwLock<HashMap<Coord, Cell>>,
}

impl GridStore {
    /// Create an empty grid
    #[inline]
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Grid configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Current state of one coordinate, if ever painted
    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<Cell> {
        self.cells.read().get(&coord).cloned()
    }

    /// Overwrite one cell
    ///
    /// Writes are total overwrites, never merges. The committed timestamp is
    /// clamped to `max(now, previous)` so `committed_at` never rewinds on a
    /// cell even if the caller's clock does.
    ///
    /// # Errors
    /// `RejectionError::OutOfBounds` if the coordinate falls outside the grid;
    /// the store is untouched in that case.
    pub fn set(
        &self,
        coord: Coord,
        color: Color,
        painted_by: ParticipantId,
        now: Timestamp,
    ) -> Result<CommittedMutation, RejectionError> {
        if !self.config.contains(coord) {
            return Err(RejectionError::OutOfBounds {
                x: coord.x,
                y: coord.y,
            });
        }

        let mut cells = self.cells.write();
        let committed_at = match cells.get(&coord) {
            Some(prev) => now.max(prev.committed_at),
            None => now,
        };
        cells.insert(
            coord,
            Cell {
                color,
                painted_by: painted_by.clone(),
                committed_at,
            },
        );

        Ok(CommittedMutation {
            x: coord.x,
            y: coord.y,
            color,
            painted_by,
            committed_at,
        })
    }

    /// All non-empty cells as one consistent view
    #[must_use]
    pub fn snapshot(&self) -> Vec<CommittedMutation> {
        self.cells
            .read()
            .iter()
            .map(|(coord, cell)| CommittedMutation {
                x: coord.x,
                y: coord.y,
                color: cell.color,
                painted_by: cell.painted_by.clone(),
                committed_at: cell.committed_at,
            })
            .collect()
    }

    /// Replay previously committed cells, e.g. a persisted snapshot at startup
    ///
    /// Goes through the same overwrite path as live writes so the per-cell
    /// timestamp invariant holds across restarts.
    pub fn restore<I>(&self, cells: I) -> usize
    where
        I: IntoIterator<Item = CommittedMutation>,
    {
        let mut restored = 0;
        for m in cells {
            match self.set(m.coord(), m.color, m.painted_by, m.committed_at) {
                Ok(_) => restored += 1,
                Err(err) => {
                    tracing::warn!(%err, "skipping out-of-bounds cell during restore");
                }
            }
        }
        restored
    }

    /// Number of painted cells
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Whether no cell has ever been painted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_grid() -> GridStore {
        GridStore::new(GridConfig::new().with_dimensions(4, 4))
    }

    fn red() -> Color {
        Color::rgb(255, 0, 0)
    }

    #[test]
    fn set_then_get_round_trips() {
        let grid = small_grid();
        let committed = grid
            .set(Coord::new(1, 1), red(), "p1".into(), 1_000)
            .unwrap();

        assert_eq!(committed.x, 1);
        assert_eq!(committed.y, 1);

        let cell = grid.get(Coord::new(1, 1)).unwrap();
        assert_eq!(cell.color, red());
        assert_eq!(cell.painted_by, "p1".into());
        assert_eq!(cell.committed_at, 1_000);
    }

    #[test]
    fn out_of_bounds_never_mutates() {
        let grid = small_grid();
        let result = grid.set(Coord::new(4, 0), red(), "p1".into(), 1_000);
        assert_eq!(
            result,
            Err(RejectionError::OutOfBounds { x: 4, y: 0 })
        );
        assert!(grid.is_empty());
    }

    #[test]
    fn last_writer_wins() {
        let grid = small_grid();
        let coord = Coord::new(2, 3);
        grid.set(coord, red(), "p1".into(), 1_000).unwrap();
        grid.set(coord, Color::rgb(0, 255, 0), "p2".into(), 2_000)
            .unwrap();

        let cell = grid.get(coord).unwrap();
        assert_eq!(cell.color, Color::rgb(0, 255, 0));
        assert_eq!(cell.painted_by, "p2".into());
    }

    #[test]
    fn committed_at_never_rewinds() {
        let grid = small_grid();
        let coord = Coord::new(0, 0);
        grid.set(coord, red(), "p1".into(), 5_000).unwrap();
        // Caller clock stepped backwards; cell timestamp must not.
        let committed = grid
            .set(coord, Color::rgb(0, 0, 255), "p2".into(), 3_000)
            .unwrap();
        assert_eq!(committed.committed_at, 5_000);
        assert_eq!(grid.get(coord).unwrap().committed_at, 5_000);
    }

    #[test]
    fn snapshot_lists_painted_cells_only() {
        let grid = small_grid();
        grid.set(Coord::new(1, 1), red(), "p1".into(), 1_000).unwrap();
        grid.set(Coord::new(2, 2), Color::rgb(0, 0, 255), "p1".into(), 2_000)
            .unwrap();

        let snapshot = grid.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn restore_replays_through_set() {
        let grid = small_grid();
        grid.set(Coord::new(1, 0), red(), "p1".into(), 1_000).unwrap();
        let saved = grid.snapshot();

        let reloaded = small_grid();
        let restored = reloaded.restore(saved);
        assert_eq!(restored, 1);
        assert_eq!(
            reloaded.get(Coord::new(1, 0)).unwrap().color,
            red()
        );
    }

    #[test]
    fn restore_skips_out_of_bounds_cells() {
        let grid = small_grid();
        let restored = grid.restore(vec![CommittedMutation {
            x: 99,
            y: 99,
            color: red(),
            painted_by: "p1".into(),
            committed_at: 1_000,
        }]);
        assert_eq!(restored, 0);
        assert!(grid.is_empty());
    }
}
