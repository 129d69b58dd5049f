//! Headless engine for a sliding-tile merge puzzle (2048 family, extended
//! past the 2048 target) with score/level tracking, undo, manual tile
//! insertion, elapsed-time tracking, and cloud/local save reconciliation.
//!
//! The engine is fully operable without a UI and deterministic given its
//! seed: randomness is injected through [`spawn::SpawnPolicy`], and the
//! only asynchronous piece — the cloud fetch — re-enters the engine
//! through the [`cloud::CloudReconciler`] transition rather than mutating
//! state mid-flight.
//!
//! ```
//! use puzzle_core::{Direction, GameSession};
//!
//! let mut session = GameSession::new(42);
//! session.new_game();
//! let result = session.make_move(Direction::Left);
//! println!("score {} changed {}", session.state().score, result.changed);
//! ```

pub mod board;
pub mod cloud;
pub mod history;
pub mod moves;
pub mod remote;
pub mod session;
pub mod spawn;
pub mod state;
pub mod store;
pub mod timer;

pub use board::{Board, PlacedTile, Pos, Tile, TileId, CELLS, SIZE};
pub use cloud::{CloudReconciler, FetchOutcome, RequestToken};
pub use history::UndoHistory;
pub use moves::{Direction, SlideOutcome};
pub use remote::{spawn_fetch, FetchCompletion};
pub use session::{GameSession, MoveResult};
pub use spawn::SpawnPolicy;
pub use state::GameState;
pub use store::{
    FileRemote, FileStore, MemoryStore, RemoteSave, RemoteStore, SaveStore, SavedGame,
    SAVE_VERSION,
};
pub use timer::Timer;
