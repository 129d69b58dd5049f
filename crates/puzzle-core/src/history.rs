use crate::state::GameState;

/// Stack of pre-mutation snapshots, most-recent-last. Unbounded within a
/// session; cleared on new-game and on any load.
#[derive(Debug, Default)]
pub struct UndoHistory {
    snapshots: Vec<GameState>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state as it was before a state-changing move or forced
    /// insertion.
    pub fn push(&mut self, snapshot: GameState) {
        self.snapshots.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<GameState> {
        self.snapshots.pop()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
