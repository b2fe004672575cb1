//! Persistence collaborator
//!
//! The grid must survive restart: the service loads the last persisted
//! snapshot before accepting mutations and persists after each commit.
//! Persist failures are logged and never block or undo the in-memory commit;
//! the accepted trade-off is that a crash can lose the most recent mutations.

use mural_core::{CommittedMutation, Participant};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Underlying I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file exists but cannot be decoded
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Everything the service persists between restarts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// All painted cells
    pub cells: Vec<CommittedMutation>,
    /// Participant bookkeeping (cooldown clocks, counters)
    pub participants: Vec<Participant>,
}

/// Snapshot persistence collaborator
pub trait SnapshotPersistence: Send + Sync {
    /// Load the last persisted state; an absent store yields the default
    ///
    /// # Errors
    /// Only for a present-but-unreadable store.
    fn load(&self) -> Result<PersistedState, PersistError>;

    /// Persist the given state
    ///
    /// # Errors
    /// On any I/O or encoding failure; the caller logs and carries on.
    fn persist(&self, state: &PersistedState) -> Result<(), PersistError>;
}

/// JSON file persistence: one board file, one participants file
///
/// Writes go through a sibling temp file and an atomic rename so a crash
/// mid-write never corrupts the previous snapshot.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    board_path: PathBuf,
    participants_path: PathBuf,
}

impl JsonFilePersistence {
    /// Create a store over the two snapshot files
    #[must_use]
    pub fn new(board_path: impl Into<PathBuf>, participants_path: impl Into<PathBuf>) -> Self {
        Self {
            board_path: board_path.into(),
            participants_path: participants_path.into(),
        }
    }

    fn load_json<T: Default + for<'de> Deserialize<'de>>(
        path: &Path,
    ) -> Result<T, PersistError> {
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
        let tmp = path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, value)?;
            file.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl SnapshotPersistence for JsonFilePersistence {
    fn load(&self) -> Result<PersistedState, PersistError> {
        let cells: Vec<CommittedMutation> = Self::load_json(&self.board_path)?;
        let participants: Vec<Participant> = Self::load_json(&self.participants_path)?;
        Ok(PersistedState {
            cells,
            participants,
        })
    }

    fn persist(&self, state: &PersistedState) -> Result<(), PersistError> {
        Self::write_json(&self.board_path, &state.cells)?;
        Self::write_json(&self.participants_path, &state.participants)?;
        Ok(())
    }
}

/// No-op persistence for tests and ephemeral canvases
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPersistence;

impl SnapshotPersistence for NullPersistence {
    fn load(&self) -> Result<PersistedState, PersistError> {
        Ok(PersistedState::default())
    }

    fn persist(&self, _state: &PersistedState) -> Result<(), PersistError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mural_core::{Color, Participant, ParticipantId};
    use pretty_assertions::assert_eq;

    fn file_store(dir: &tempfile::TempDir) -> JsonFilePersistence {
        JsonFilePersistence::new(
            dir.path().join("board.json"),
            dir.path().join("participants.json"),
        )
    }

    #[test]
    fn missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir);
        let state = store.load().unwrap();
        assert!(state.cells.is_empty());
        assert!(state.participants.is_empty());
    }

    #[test]
    fn persist_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir);

        let mut participant = Participant::new(ParticipantId::from("p1"), "Pat");
        participant.mutation_count = 3;
        participant.last_free_mutation_at = Some(10_000);

        let state = PersistedState {
            cells: vec![CommittedMutation {
                x: 1,
                y: 1,
                color: Color::rgb(255, 0, 0),
                painted_by: "p1".into(),
                committed_at: 10_000,
            }],
            participants: vec![participant],
        };

        store.persist(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.cells, state.cells);
        assert_eq!(loaded.participants.len(), 1);
        assert_eq!(loaded.participants[0].mutation_count, 3);
    }

    #[test]
    fn persist_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir);

        store.persist(&PersistedState::default()).unwrap();
        let state = PersistedState {
            cells: vec![CommittedMutation {
                x: 0,
                y: 0,
                color: Color::rgb(0, 255, 0),
                painted_by: "p1".into(),
                committed_at: 1,
            }],
            participants: vec![],
        };
        store.persist(&state).unwrap();

        assert_eq!(store.load().unwrap().cells.len(), 1);
    }

    #[test]
    fn corrupt_snapshot_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("board.json"), "{not json").unwrap();
        let store = file_store(&dir);
        assert!(matches!(store.load(), Err(PersistError::Corrupt(_))));
    }

    #[test]
    fn blank_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("board.json"), "  \n").unwrap();
        let store = file_store(&dir);
        assert!(store.load().unwrap().cells.is_empty());
    }
}
