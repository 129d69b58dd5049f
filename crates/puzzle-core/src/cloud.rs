//! Cloud-vs-local reconciliation state machine.
//!
//! Deliberately free of I/O: the caller performs the fetch (see
//! `remote::spawn_fetch`) and feeds the completion back in. A conflict is
//! held as a pending decision rather than delivered through a UI
//! callback, so the engine never silently overwrites local progress and
//! never depends on a presentation framework.

use log::{debug, info, warn};

use crate::store::{RemoteSave, SavedGame};

/// Identifies one fetch request. A completion carrying a token the
/// reconciler no longer waits for is discarded, which is what makes
/// abandoning a fetch safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

#[derive(Debug)]
enum State {
    Idle,
    Fetching { token: RequestToken },
    ConflictPending { remote: RemoteSave },
}

/// What a delivered fetch completion amounted to.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No remote copy exists; local stands.
    NoRemote,
    /// Remote does not beat local; resolved to local with no prompt.
    KeepLocal,
    /// Remote strictly beats local; a decision is now pending.
    Conflict,
    /// The fetch failed; local state is untouched.
    Failed(String),
    /// Token mismatch or not fetching: a stale or abandoned completion,
    /// dropped on the floor.
    Stale,
}

#[derive(Debug, Default)]
pub struct CloudReconciler {
    state: State,
    next_token: u64,
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

impl CloudReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `idle -> fetching`. Returns `None` while a fetch is already in
    /// flight or a conflict awaits its decision: the state is the lock
    /// against concurrent fetches.
    pub fn begin_fetch(&mut self) -> Option<RequestToken> {
        match self.state {
            State::Idle => {
                let token = RequestToken(self.next_token);
                self.next_token += 1;
                self.state = State::Fetching { token };
                debug!("cloud fetch {token:?} started");
                Some(token)
            }
            _ => None,
        }
    }

    /// Deliver the completion for `token`, comparing the remote copy
    /// against `local_score`.
    pub fn complete_fetch(
        &mut self,
        token: RequestToken,
        local_score: u64,
        result: anyhow::Result<Option<RemoteSave>>,
    ) -> FetchOutcome {
        match self.state {
            State::Fetching { token: current } if current == token => {}
            _ => {
                debug!("discarding stale cloud completion {token:?}");
                return FetchOutcome::Stale;
            }
        }
        match result {
            Err(err) => {
                // Fail-safe: a cloud failure never destroys local progress.
                warn!("cloud fetch failed: {err:#}");
                self.state = State::Idle;
                FetchOutcome::Failed(format!("{err:#}"))
            }
            Ok(None) => {
                self.state = State::Idle;
                FetchOutcome::NoRemote
            }
            Ok(Some(remote)) => {
                if remote.game.score > local_score {
                    info!(
                        "cloud save v{} (score {}) beats local (score {local_score}); awaiting choice",
                        remote.version, remote.game.score
                    );
                    self.state = State::ConflictPending { remote };
                    FetchOutcome::Conflict
                } else {
                    self.state = State::Idle;
                    FetchOutcome::KeepLocal
                }
            }
        }
    }

    /// Consume the pending decision. `Some(game)` when the cloud copy was
    /// chosen and should replace local state (the caller also clears its
    /// undo history); `None` when local is kept or no decision was
    /// pending. Always back to idle afterwards.
    pub fn apply_version_choice(&mut self, use_cloud: bool) -> Option<SavedGame> {
        match std::mem::take(&mut self.state) {
            State::ConflictPending { remote } if use_cloud => Some(remote.game),
            State::ConflictPending { .. } => None,
            other => {
                // Nothing pending; leave whatever state we were in alone.
                self.state = other;
                None
            }
        }
    }

    /// Drop an in-flight fetch. Its eventual completion is rejected by
    /// the token guard.
    pub fn abandon(&mut self) {
        if let State::Fetching { token } = self.state {
            debug!("cloud fetch {token:?} abandoned");
            self.state = State::Idle;
        }
    }

    /// The in-flight flag, for a presentation layer's spinner.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, State::Fetching { .. })
    }

    pub fn is_conflict_pending(&self) -> bool {
        matches!(self.state, State::ConflictPending { .. })
    }

    /// The remote candidate awaiting a decision, for display.
    pub fn pending_remote(&self) -> Option<&RemoteSave> {
        match &self.state {
            State::ConflictPending { remote } => Some(remote),
            _ => None,
        }
    }
}
