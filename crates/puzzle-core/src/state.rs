use crate::board::Board;

/// Exponent of the base tile for the level series: 2^11 = 2048 is level 1.
const LEVEL_BASE_EXP: u32 = 11;

/// The full engine-owned game state. The presentation layer only ever
/// reads a snapshot of this; all mutation goes through the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub score: u64,
    pub seconds: u64,
    pub undos_used: u32,
    pub manual_fours_used: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            board: Board::new(),
            score: 0,
            seconds: 0,
            undos_used: 0,
            manual_fours_used: 0,
        }
    }

    /// The largest tile value on the board. The display goal (2x this)
    /// is owned by the presentation layer.
    pub fn max_tile(&self) -> u32 {
        self.board.max_tile()
    }

    /// Derived tier: 1 up to the base tile (2048), plus one per doubling
    /// past it (4096 -> 2, 8192 -> 3, ...). Never stored, so it is
    /// monotone in the board's maximum as play progresses.
    pub fn level(&self) -> u32 {
        level_for(self.max_tile())
    }
}

pub fn level_for(max_tile: u32) -> u32 {
    if max_tile == 0 {
        return 1;
    }
    let exp = max_tile.ilog2();
    exp.saturating_sub(LEVEL_BASE_EXP) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[test]
    fn level_series_starts_at_base_tile() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(2), 1);
        assert_eq!(level_for(1024), 1);
        assert_eq!(level_for(2048), 1);
        assert_eq!(level_for(4096), 2);
        assert_eq!(level_for(8192), 3);
        assert_eq!(level_for(16384), 4);
    }

    #[test]
    fn level_is_monotone_in_max_tile() {
        let mut last = 0;
        for exp in 1..=17 {
            let level = level_for(1 << exp);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn state_level_tracks_board() {
        let mut state = GameState::new();
        assert_eq!(state.level(), 1);
        state.board = Board::from_values(&[[4096, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(state.level(), 2);
        assert_eq!(state.max_tile(), 4096);
    }
}
