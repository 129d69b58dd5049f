use serde::{Deserialize, Serialize};

use crate::board::{Board, Pos, Tile, SIZE};

/// A direction to slide/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }
}

/// Result of sliding the board in one direction. Pure: no spawn, no RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideOutcome {
    /// Whether any cell's value layout differed from the pre-slide layout.
    pub changed: bool,
    /// Sum of post-doubling merged values this slide.
    pub gained: u32,
    /// `Some(total)` iff at least one merge happened.
    pub merged: Option<u32>,
}

/// Cell positions of line `line`, ordered from the moving edge inward.
fn line_positions(dir: Direction, line: usize) -> [Pos; SIZE] {
    let mut out = [Pos { row: 0, col: 0 }; SIZE];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = match dir {
            Direction::Left => Pos { row: line, col: i },
            Direction::Right => Pos {
                row: line,
                col: SIZE - 1 - i,
            },
            Direction::Up => Pos { row: i, col: line },
            Direction::Down => Pos {
                row: SIZE - 1 - i,
                col: line,
            },
        };
    }
    out
}

impl Board {
    /// Slide and merge every line toward `dir`'s leading edge.
    ///
    /// Per line: extract occupied tiles in travel order, compress out the
    /// gaps, merge adjacent equal pairs front-to-back (each tile merges at
    /// most once per slide, the edge-most pair wins, a freshly merged tile
    /// never merges again), then write the compacted line back. The
    /// surviving tile of a merge keeps the leading tile's id.
    pub fn slide(&mut self, dir: Direction) -> SlideOutcome {
        let before = self.value_grid();
        let mut gained = 0u32;

        for line in 0..SIZE {
            let positions = line_positions(dir, line);
            // Extraction doubles as the compress step.
            let tiles: Vec<Tile> = positions.iter().filter_map(|&p| self.get(p)).collect();

            let mut resolved: Vec<Tile> = Vec::with_capacity(tiles.len());
            let mut last_merged = false;
            for tile in tiles {
                match resolved.last_mut() {
                    Some(head) if !last_merged && head.value == tile.value => {
                        head.value *= 2;
                        gained += head.value;
                        last_merged = true;
                    }
                    _ => {
                        resolved.push(tile);
                        last_merged = false;
                    }
                }
            }

            for (i, &pos) in positions.iter().enumerate() {
                self.set(pos, resolved.get(i).copied());
            }
        }

        let changed = self.value_grid() != before;
        SlideOutcome {
            changed,
            gained,
            merged: (gained > 0).then_some(gained),
        }
    }

    /// Whether a slide toward `dir` would change the board.
    pub fn can_move(&self, dir: Direction) -> bool {
        let mut probe = self.clone();
        probe.slide(dir).changed
    }

    /// True when no direction changes the board: the game is over.
    pub fn is_stuck(&self) -> bool {
        Direction::all().iter().all(|&dir| !self.can_move(dir))
    }
}
