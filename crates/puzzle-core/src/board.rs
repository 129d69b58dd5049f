use std::fmt;

use serde::{Deserialize, Serialize};

/// Board edge length. The grid is always square.
pub const SIZE: usize = 4;
/// Number of cells on the board.
pub const CELLS: usize = SIZE * SIZE;

/// Identity of a tile, stable across slides and merges within a session.
///
/// Assigned from a per-board counter at spawn time so a renderer can
/// correlate the same tile before and after a move. Ids are not persisted;
/// a restored board assigns fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId(pub u64);

/// A tile as stored in a cell: identity plus its power-of-two value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
}

/// A cell coordinate, row-major from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    #[inline]
    pub fn index(self) -> usize {
        self.row * SIZE + self.col
    }

    #[inline]
    pub fn from_index(idx: usize) -> Self {
        Pos {
            row: idx / SIZE,
            col: idx % SIZE,
        }
    }
}

/// An occupied cell, as handed to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub id: TileId,
    pub value: u32,
    pub row: usize,
    pub col: usize,
}

/// The 4x4 grid. Cells are row-major; `None` is an empty cell, so the
/// one-tile-per-cell invariant is structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Tile>; CELLS],
    next_id: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty board with the id counter at zero.
    pub fn new() -> Self {
        Board {
            cells: [None; CELLS],
            next_id: 0,
        }
    }

    /// Allocate a fresh tile id.
    pub(crate) fn alloc_id(&mut self) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Tile> {
        self.cells[pos.index()]
    }

    #[inline]
    pub(crate) fn set(&mut self, pos: Pos, tile: Option<Tile>) {
        self.cells[pos.index()] = tile;
    }

    /// Place a new tile with a fresh id at `pos`. Caller ensures the cell
    /// is empty.
    pub(crate) fn place_new(&mut self, pos: Pos, value: u32) -> PlacedTile {
        debug_assert!(self.get(pos).is_none(), "placing onto an occupied cell");
        let id = self.alloc_id();
        self.set(pos, Some(Tile { id, value }));
        PlacedTile {
            id,
            value,
            row: pos.row,
            col: pos.col,
        }
    }

    /// Occupied cells in row-major order.
    pub fn tiles(&self) -> Vec<PlacedTile> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| {
                cell.map(|tile| {
                    let pos = Pos::from_index(idx);
                    PlacedTile {
                        id: tile.id,
                        value: tile.value,
                        row: pos.row,
                        col: pos.col,
                    }
                })
            })
            .collect()
    }

    /// Value per cell (0 = empty). Used for change detection, persistence
    /// and tests, where tile identity is irrelevant.
    pub fn value_grid(&self) -> [[u32; SIZE]; SIZE] {
        let mut grid = [[0u32; SIZE]; SIZE];
        for (idx, cell) in self.cells.iter().enumerate() {
            if let Some(tile) = cell {
                let pos = Pos::from_index(idx);
                grid[pos.row][pos.col] = tile.value;
            }
        }
        grid
    }

    /// All empty positions in row-major order.
    pub fn empty_positions(&self) -> Vec<Pos> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(idx, _)| Pos::from_index(idx))
            .collect()
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// The largest tile value on the board, 0 when empty.
    pub fn max_tile(&self) -> u32 {
        self.cells
            .iter()
            .filter_map(|cell| cell.map(|t| t.value))
            .max()
            .unwrap_or(0)
    }

    /// Sum of all tile values. Merges strictly increase this; nothing else
    /// inside a slide changes it.
    pub fn value_sum(&self) -> u64 {
        self.cells
            .iter()
            .filter_map(|cell| cell.map(|t| t.value as u64))
            .sum()
    }

    /// Rebuild a board from a value grid, assigning fresh ids. Zero cells
    /// stay empty; used when restoring a save.
    pub fn from_values(grid: &[[u32; SIZE]; SIZE]) -> Self {
        let mut board = Board::new();
        for (row, cols) in grid.iter().enumerate() {
            for (col, &value) in cols.iter().enumerate() {
                if value != 0 {
                    board.place_new(Pos { row, col }, value);
                }
            }
        }
        board
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------+------+------+------+")?;
        for row in 0..SIZE {
            write!(f, "|")?;
            for col in 0..SIZE {
                match self.get(Pos { row, col }) {
                    Some(tile) => write!(f, "{:^6}|", tile.value)?,
                    None => write!(f, "      |")?,
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        Ok(())
    }
}
