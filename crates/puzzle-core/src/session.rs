//! The engine facade consumed by a presentation layer.
//!
//! `GameSession` is the single logical owner of `GameState`; every
//! operation here is synchronous and meant to be serialized on one
//! control thread. Remote I/O runs elsewhere (`remote::spawn_fetch`) and
//! re-enters through the reconciler methods.

use anyhow::Result;
use log::{debug, info, warn};

use crate::board::PlacedTile;
use crate::cloud::{CloudReconciler, FetchOutcome, RequestToken};
use crate::history::UndoHistory;
use crate::moves::Direction;
use crate::spawn::SpawnPolicy;
use crate::state::GameState;
use crate::store::{RemoteSave, RemoteStore, SaveStore, SavedGame};
use crate::timer::Timer;

/// What one move request amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    /// False for a blocked move: nothing spawned, nothing recorded.
    pub changed: bool,
    /// Score gained this move (sum of merged values).
    pub gained: u32,
    /// `Some(total)` iff at least one merge happened.
    pub merged: Option<u32>,
    /// The tile inserted after a changing move, if the board had room.
    pub spawned: Option<PlacedTile>,
}

impl MoveResult {
    fn blocked() -> Self {
        MoveResult {
            changed: false,
            gained: 0,
            merged: None,
            spawned: None,
        }
    }
}

pub struct GameSession {
    state: GameState,
    history: UndoHistory,
    timer: Timer,
    spawner: SpawnPolicy,
    reconciler: CloudReconciler,
    /// Bumped on every observable mutation; a renderer polls this instead
    /// of the engine pushing change notifications into it.
    revision: u64,
}

impl GameSession {
    /// A session with an empty board, awaiting `new_game` or a load.
    pub fn new(seed: u64) -> Self {
        GameSession {
            state: GameState::new(),
            history: UndoHistory::new(),
            timer: Timer::new(),
            spawner: SpawnPolicy::new(seed),
            reconciler: CloudReconciler::new(),
            revision: 0,
        }
    }

    pub fn with_spawner(seed: u64, four_probability: f64) -> Self {
        let mut session = Self::new(seed);
        session.spawner = SpawnPolicy::with_four_probability(seed, four_probability);
        session
    }

    /// Reset everything: empty board plus two spawned tiles, zeroed
    /// score/seconds/counters, cleared history, timer running.
    pub fn new_game(&mut self) {
        self.state = GameState::new();
        self.spawner.spawn(&mut self.state.board);
        self.spawner.spawn(&mut self.state.board);
        self.history.clear();
        self.timer.start();
        self.bump();
        info!("new game started");
    }

    /// Slide toward `dir`. On a changing move the pre-move state is
    /// recorded for undo, score accumulates the merged total, and exactly
    /// one tile spawns. A blocked move mutates nothing.
    pub fn make_move(&mut self, dir: Direction) -> MoveResult {
        let snapshot = self.state.clone();
        let outcome = self.state.board.slide(dir);
        if !outcome.changed {
            debug!("move {dir:?} blocked");
            return MoveResult::blocked();
        }

        self.history.push(snapshot);
        self.state.score += outcome.gained as u64;
        let spawned = self.spawner.spawn(&mut self.state.board);
        if spawned.is_none() {
            // Unreachable through normal play: a changing slide frees a
            // cell. Guarded so it degrades to a missing spawn.
            warn!("board full after a changing move; spawn skipped");
        }
        self.bump();
        debug!(
            "move {dir:?}: +{} score, {} undo depth",
            outcome.gained,
            self.history.len()
        );
        MoveResult {
            changed: true,
            gained: outcome.gained,
            merged: outcome.merged,
            spawned,
        }
    }

    /// Restore the most recent snapshot. Seconds keep their current value
    /// (time keeps advancing through an undo) and `undos_used` is
    /// preserved then incremented; every other field reverts.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                let seconds = self.state.seconds;
                let undos = self.state.undos_used;
                self.state = snapshot;
                self.state.seconds = seconds;
                self.state.undos_used = undos + 1;
                self.bump();
                debug!("undo applied, {} snapshots left", self.history.len());
                true
            }
            None => false,
        }
    }

    /// Manually insert a 4, recording undo history and the manual-four
    /// counter. `None` (and no mutation at all) on a full board.
    pub fn force_tile(&mut self) -> Option<PlacedTile> {
        if self.state.board.is_full() {
            return None;
        }
        let snapshot = self.state.clone();
        let placed = self.spawner.force_four(&mut self.state.board)?;
        self.history.push(snapshot);
        self.state.manual_fours_used += 1;
        self.bump();
        Some(placed)
    }

    pub fn start_timer(&mut self) {
        self.timer.start();
    }

    pub fn stop_timer(&mut self) {
        self.timer.stop();
    }

    /// One-second cadence from the caller's scheduler. Suspended while a
    /// version conflict awaits its decision.
    pub fn tick(&mut self) {
        if self.reconciler.is_conflict_pending() {
            return;
        }
        if self.timer.is_running() {
            self.timer.tick(&mut self.state.seconds);
            self.bump();
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// No direction changes the board: game over.
    pub fn is_over(&self) -> bool {
        self.state.board.is_stuck()
    }

    // --- persistence ----------------------------------------------------

    pub fn to_saved(&self) -> SavedGame {
        SavedGame::from_state(&self.state)
    }

    /// Replace the session state with a restored save. Undo history does
    /// not survive a load.
    pub fn apply_saved(&mut self, saved: &SavedGame) {
        self.state = saved.into_state();
        self.history.clear();
        self.bump();
    }

    /// Serialize to the local store, then attempt the cloud store. A
    /// cloud failure is logged and non-fatal; a local failure propagates.
    pub fn save_game(&self, local: &dyn SaveStore, remote: &dyn RemoteStore) -> Result<()> {
        let saved = self.to_saved();
        local.save(&saved)?;
        match remote.store(&saved) {
            Ok(version) => debug!("cloud save stored as v{version}"),
            Err(err) => warn!("cloud save failed (local copy intact): {err:#}"),
        }
        Ok(())
    }

    // --- cloud reconciliation -------------------------------------------

    pub fn begin_cloud_fetch(&mut self) -> Option<RequestToken> {
        self.reconciler.begin_fetch()
    }

    pub fn complete_cloud_fetch(
        &mut self,
        token: RequestToken,
        result: Result<Option<RemoteSave>>,
    ) -> FetchOutcome {
        self.reconciler
            .complete_fetch(token, self.state.score, result)
    }

    /// Resolve a pending conflict. Returns true when the cloud copy was
    /// applied (which also clears undo history).
    pub fn apply_version_choice(&mut self, use_cloud: bool) -> bool {
        match self.reconciler.apply_version_choice(use_cloud) {
            Some(game) => {
                info!("conflict resolved: cloud copy (score {}) applied", game.score);
                self.apply_saved(&game);
                true
            }
            None => false,
        }
    }

    pub fn abandon_cloud_fetch(&mut self) {
        self.reconciler.abandon();
    }

    pub fn is_cloud_loading(&self) -> bool {
        self.reconciler.is_loading()
    }

    pub fn is_conflict_pending(&self) -> bool {
        self.reconciler.is_conflict_pending()
    }

    pub fn pending_remote(&self) -> Option<&RemoteSave> {
        self.reconciler.pending_remote()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::store::MemoryStore;
    use anyhow::anyhow;

    fn session_with_board(grid: [[u32; 4]; 4]) -> GameSession {
        let mut session = GameSession::new(1);
        session.state_mut().board = Board::from_values(&grid);
        session
    }

    #[test]
    fn new_game_spawns_two_tiles_and_starts_timer() {
        let mut session = GameSession::new(42);
        session.new_game();
        assert_eq!(session.state().board.tiles().len(), 2);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.state().seconds, 0);
        assert_eq!(session.state().undos_used, 0);
        assert_eq!(session.state().manual_fours_used, 0);
        assert_eq!(session.undo_depth(), 0);

        session.tick();
        assert_eq!(session.state().seconds, 1);
    }

    #[test]
    fn changing_move_scores_spawns_and_records_history() {
        let mut session = session_with_board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let result = session.make_move(Direction::Left);

        assert!(result.changed);
        assert_eq!(result.gained, 4);
        assert_eq!(result.merged, Some(4));
        assert!(result.spawned.is_some());
        assert_eq!(session.state().score, 4);
        assert_eq!(session.state().board.value_grid()[0][0], 4);
        assert_eq!(session.undo_depth(), 1);
        // Exactly one spawned tile: merged 4 plus the new one.
        assert_eq!(session.state().board.tiles().len(), 2);
    }

    #[test]
    fn blocked_move_mutates_nothing() {
        let mut session = session_with_board([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        let before_grid = session.state().board.value_grid();
        let before_revision = session.revision();

        for dir in Direction::all() {
            let result = session.make_move(dir);
            assert!(!result.changed);
            assert!(result.spawned.is_none());
        }
        assert_eq!(session.state().board.value_grid(), before_grid);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.undo_depth(), 0);
        assert_eq!(session.revision(), before_revision);
        assert!(session.is_over());
    }

    #[test]
    fn undo_is_a_true_inverse_except_seconds_and_undo_counter() {
        let mut session = session_with_board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        session.start_timer();
        let grid_before = session.state().board.value_grid();

        session.make_move(Direction::Left);
        session.tick();
        assert!(session.undo());

        assert_eq!(session.state().board.value_grid(), grid_before);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.state().manual_fours_used, 0);
        // Documented exceptions: time kept advancing, undo counter counts.
        assert_eq!(session.state().seconds, 1);
        assert_eq!(session.state().undos_used, 1);
    }

    #[test]
    fn repeated_undo_counts_each_application() {
        let mut session = session_with_board([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]);
        session.make_move(Direction::Left);
        session.make_move(Direction::Left);
        assert!(session.undo());
        assert!(session.undo());
        assert_eq!(session.state().undos_used, 2);
        assert!(!session.undo());
        assert_eq!(session.state().undos_used, 2);
    }

    #[test]
    fn undo_with_empty_history_leaves_state_unchanged() {
        let mut session = session_with_board([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let before = session.state().clone();
        assert!(!session.undo());
        assert_eq!(*session.state(), before);
    }

    #[test]
    fn force_tile_inserts_a_four_and_counts() {
        let mut session = session_with_board([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let placed = session.force_tile().unwrap();
        assert_eq!(placed.value, 4);
        assert_eq!(session.state().manual_fours_used, 1);
        assert_eq!(session.undo_depth(), 1);

        // Undo restores the counter too.
        assert!(session.undo());
        assert_eq!(session.state().manual_fours_used, 0);
    }

    #[test]
    fn force_tile_on_full_board_is_a_no_op() {
        let mut session = session_with_board([[2; 4]; 4]);
        assert!(session.force_tile().is_none());
        assert_eq!(session.state().manual_fours_used, 0);
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn tick_suspended_while_conflict_pending() {
        let mut session = session_with_board([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        session.start_timer();

        let token = session.begin_cloud_fetch().unwrap();
        // Still ticking while merely fetching.
        session.tick();
        assert_eq!(session.state().seconds, 1);

        let mut richer = GameState::new();
        richer.score = 999;
        let remote = RemoteSave {
            version: 3,
            game: SavedGame::from_state(&richer),
        };
        assert_eq!(
            session.complete_cloud_fetch(token, Ok(Some(remote))),
            FetchOutcome::Conflict
        );
        session.tick();
        session.tick();
        assert_eq!(session.state().seconds, 1);

        session.apply_version_choice(false);
        session.tick();
        assert_eq!(session.state().seconds, 2);
    }

    #[test]
    fn choosing_cloud_replaces_state_and_clears_history() {
        let mut session = session_with_board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        session.make_move(Direction::Left);
        assert_eq!(session.undo_depth(), 1);
        let local_score = session.state().score;

        let mut richer = GameState::new();
        richer.board = Board::from_values(&[[8192, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        richer.score = local_score + 496;
        richer.seconds = 55;
        let remote = RemoteSave {
            version: 9,
            game: SavedGame::from_state(&richer),
        };

        let token = session.begin_cloud_fetch().unwrap();
        assert_eq!(
            session.complete_cloud_fetch(token, Ok(Some(remote))),
            FetchOutcome::Conflict
        );
        assert!(session.apply_version_choice(true));

        assert_eq!(session.state().score, local_score + 496);
        assert_eq!(session.state().seconds, 55);
        assert_eq!(session.state().max_tile(), 8192);
        assert_eq!(session.state().level(), 3);
        assert_eq!(session.undo_depth(), 0);
        assert!(!session.undo());
    }

    #[test]
    fn failed_fetch_leaves_local_state_and_history_alone() {
        let mut session = session_with_board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        session.make_move(Direction::Left);
        let before = session.state().clone();
        let depth = session.undo_depth();

        let token = session.begin_cloud_fetch().unwrap();
        let outcome = session.complete_cloud_fetch(token, Err(anyhow!("offline")));
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert_eq!(*session.state(), before);
        assert_eq!(session.undo_depth(), depth);
    }

    #[test]
    fn save_game_survives_cloud_failure() {
        struct FailingRemote;
        impl RemoteStore for FailingRemote {
            fn fetch(&self) -> Result<Option<RemoteSave>> {
                Err(anyhow!("offline"))
            }
            fn store(&self, _game: &SavedGame) -> Result<u64> {
                Err(anyhow!("offline"))
            }
        }

        let mut session = session_with_board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        session.make_move(Direction::Left);
        let local = MemoryStore::new();

        session.save_game(&local, &FailingRemote).unwrap();
        let loaded = local.load().unwrap().unwrap();
        assert_eq!(loaded.score, session.state().score);
    }

    #[test]
    fn saved_session_round_trips_through_apply() {
        let mut session = session_with_board([[2, 2, 4, 4], [0; 4], [0; 4], [0; 4]]);
        session.make_move(Direction::Left);
        session.state_mut().seconds = 17;
        let saved = session.to_saved();

        let mut other = GameSession::new(99);
        other.apply_saved(&saved);
        assert_eq!(
            other.state().board.value_grid(),
            session.state().board.value_grid()
        );
        assert_eq!(other.state().score, session.state().score);
        assert_eq!(other.state().seconds, 17);
        assert_eq!(other.undo_depth(), 0);
    }

    #[test]
    fn deterministic_given_the_same_seed() {
        let mut a = GameSession::new(1234);
        let mut b = GameSession::new(1234);
        a.new_game();
        b.new_game();
        for dir in [
            Direction::Left,
            Direction::Up,
            Direction::Right,
            Direction::Down,
            Direction::Left,
        ] {
            a.make_move(dir);
            b.make_move(dir);
        }
        assert_eq!(a.state().board.value_grid(), b.state().board.value_grid());
        assert_eq!(a.state().score, b.state().score);
    }

    #[test]
    fn revision_advances_on_observable_mutations_only() {
        let mut session = GameSession::new(5);
        let r0 = session.revision();
        session.new_game();
        let r1 = session.revision();
        assert!(r1 > r0);

        // A blocked probe of a full checkerboard changes nothing.
        let mut stuck = session_with_board([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        let r = stuck.revision();
        stuck.make_move(Direction::Up);
        assert_eq!(stuck.revision(), r);
    }
}
