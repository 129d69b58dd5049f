//! Persisted save schema and the local/remote stores.
//!
//! The save format is self-contained: dedicated serde structs decoupled
//! from the in-memory model, so the engine types can evolve without
//! breaking old saves. Unreadable or corrupt data always degrades to
//! "no save", never to an error.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::board::{Board, SIZE};
use crate::state::GameState;

/// Save format changelog:
/// v1: initial format
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCell {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

/// One serialized game. Tile ids are session-local animation state and
/// are deliberately absent; a restore assigns fresh ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub save_version: u32,
    pub cells: Vec<SavedCell>,
    pub score: u64,
    /// Derived from the board on load; stored so a remote copy can be
    /// displayed without reconstructing the board.
    pub level: u32,
    pub seconds: u64,
    pub undos_used: u32,
    pub manual_fours_used: u32,
}

impl SavedGame {
    pub fn from_state(state: &GameState) -> Self {
        let cells = state
            .board
            .tiles()
            .into_iter()
            .map(|t| SavedCell {
                row: t.row,
                col: t.col,
                value: t.value,
            })
            .collect();
        SavedGame {
            save_version: SAVE_VERSION,
            cells,
            score: state.score,
            level: state.level(),
            seconds: state.seconds,
            undos_used: state.undos_used,
            manual_fours_used: state.manual_fours_used,
        }
    }

    pub fn into_state(&self) -> GameState {
        let mut grid = [[0u32; SIZE]; SIZE];
        for cell in &self.cells {
            if cell.row < SIZE && cell.col < SIZE {
                grid[cell.row][cell.col] = cell.value;
            }
        }
        GameState {
            board: Board::from_values(&grid),
            score: self.score,
            seconds: self.seconds,
            undos_used: self.undos_used,
            manual_fours_used: self.manual_fours_used,
        }
    }
}

/// The cloud copy of a save: the game plus a monotonic version counter,
/// bumped on every remote store, carried alongside the score comparator
/// used for conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSave {
    pub version: u64,
    pub game: SavedGame,
}

/// Local persistence of a serialized game.
pub trait SaveStore {
    fn save(&self, game: &SavedGame) -> Result<()>;
    /// `Ok(None)` both when nothing was ever saved and when the stored
    /// data is unreadable.
    fn load(&self) -> Result<Option<SavedGame>>;
}

/// Remote persistence. Implementations are driven off the control thread
/// (see `remote::spawn_fetch`), hence `Send + Sync`.
pub trait RemoteStore: Send + Sync {
    fn fetch(&self) -> Result<Option<RemoteSave>>;
    /// Store the game under the next version; returns the version written.
    fn store(&self, game: &SavedGame) -> Result<u64>;
}

/// JSON file-backed local store.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SaveStore for FileStore {
    fn save(&self, game: &SavedGame) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating save directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(game)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing save file {}", self.path.display()))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<SavedGame>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                warn!("save file {} unreadable: {err}", self.path.display());
                return Ok(None);
            }
        };
        match serde_json::from_str::<SavedGame>(&text) {
            Ok(game) => Ok(Some(game)),
            Err(err) => {
                warn!(
                    "save file {} corrupt, treating as absent: {err}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<SavedGame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn save(&self, game: &SavedGame) -> Result<()> {
        *self.slot.lock().unwrap() = Some(game.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SavedGame>> {
        Ok(self.slot.lock().unwrap().clone())
    }
}

/// JSON file standing in for the cloud copy. Bumps the stored version on
/// every write so divergent devices can be told apart.
pub struct FileRemote {
    path: PathBuf,
}

impl FileRemote {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileRemote {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RemoteStore for FileRemote {
    fn fetch(&self) -> Result<Option<RemoteSave>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading cloud save {}", self.path.display()))?;
        match serde_json::from_str::<RemoteSave>(&text) {
            Ok(save) => Ok(Some(save)),
            Err(err) => {
                warn!(
                    "cloud save {} corrupt, treating as absent: {err}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    fn store(&self, game: &SavedGame) -> Result<u64> {
        let version = match self.fetch() {
            Ok(Some(existing)) => existing.version + 1,
            _ => 1,
        };
        let save = RemoteSave {
            version,
            game: game.clone(),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating cloud directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&save)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing cloud save {}", self.path.display()))?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_state() -> GameState {
        let mut state = GameState::new();
        state.board = Board::from_values(&[
            [2, 0, 4, 0],
            [0, 0, 0, 0],
            [0, 8, 0, 0],
            [0, 0, 0, 4096],
        ]);
        state.score = 1234;
        state.seconds = 321;
        state.undos_used = 2;
        state.manual_fours_used = 1;
        state
    }

    #[test]
    fn saved_game_round_trips_every_field() {
        let state = sample_state();
        let saved = SavedGame::from_state(&state);
        assert_eq!(saved.save_version, SAVE_VERSION);
        assert_eq!(saved.level, 2);

        let restored = saved.into_state();
        assert_eq!(restored.board.value_grid(), state.board.value_grid());
        assert_eq!(restored.score, state.score);
        assert_eq!(restored.seconds, state.seconds);
        assert_eq!(restored.undos_used, state.undos_used);
        assert_eq!(restored.manual_fours_used, state.manual_fours_used);
        assert_eq!(restored.level(), 2);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("save.json"));
        assert!(store.load().unwrap().is_none());

        let saved = SavedGame::from_state(&sample_state());
        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), Some(saved));
    }

    #[test]
    fn corrupt_file_loads_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        let saved = SavedGame::from_state(&sample_state());
        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), Some(saved));
    }

    #[test]
    fn file_remote_bumps_version_per_store() {
        let dir = tempdir().unwrap();
        let remote = FileRemote::new(dir.path().join("cloud.json"));
        assert!(remote.fetch().unwrap().is_none());

        let saved = SavedGame::from_state(&sample_state());
        assert_eq!(remote.store(&saved).unwrap(), 1);
        assert_eq!(remote.store(&saved).unwrap(), 2);

        let fetched = remote.fetch().unwrap().unwrap();
        assert_eq!(fetched.version, 2);
        assert_eq!(fetched.game, saved);
    }

    #[test]
    fn corrupt_remote_loads_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");
        std::fs::write(&path, "garbage").unwrap();
        let remote = FileRemote::new(&path);
        assert!(remote.fetch().unwrap().is_none());
        // A corrupt remote restarts the version series.
        let saved = SavedGame::from_state(&sample_state());
        assert_eq!(remote.store(&saved).unwrap(), 1);
    }
}
