use crate::error::{PuzzleError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Tile = u16;

/// Largest side whose tiles still fit in a `Tile`.
pub const MAX_SIDE: usize = 255;

// Up, down, left, right, as moves of the blank. The order decides discovery
// order in the search, so it shows up in expansion counts.
pub const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// One configuration of an N x N sliding-tile board.
///
/// `cells` holds the tiles in row-major order with `0` as the blank. A `State`
/// can only be built through [`State::new`] or [`State::goal`], so the cells
/// are always a permutation of `0..N²` and `blank_index` always points at the
/// `0`. Since `side` and `blank_index` follow from `cells`, the derived
/// equality and hash are equivalent to comparing the cells alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StateFile", into = "StateFile")]
pub struct State {
    side: usize,
    cells: Box<[Tile]>,
    blank_index: usize,
}

#[derive(Serialize, Deserialize)]
struct StateFile {
    side: usize,
    cells: Vec<Tile>,
}

impl TryFrom<StateFile> for State {
    type Error = PuzzleError;

    fn try_from(file: StateFile) -> Result<Self> {
        State::new(file.cells, file.side)
    }
}

impl From<State> for StateFile {
    fn from(state: State) -> Self {
        StateFile {
            side: state.side,
            cells: state.cells.into_vec(),
        }
    }
}

fn check_side(side: usize) -> Result<()> {
    if side < 2 {
        return Err(PuzzleError::invalid_state(format!(
            "side must be at least 2, got {side}"
        )));
    }
    if side > MAX_SIDE {
        return Err(PuzzleError::invalid_state(format!(
            "side must be at most {MAX_SIDE}, got {side}"
        )));
    }
    Ok(())
}

impl State {
    pub fn new(cells: Vec<Tile>, side: usize) -> Result<Self> {
        check_side(side)?;

        let len = side * side;
        if cells.len() != len {
            return Err(PuzzleError::invalid_state(format!(
                "side {side} needs {len} cells, got {}",
                cells.len()
            )));
        }

        let mut seen = vec![false; len];
        for &value in &cells {
            let value = value as usize;
            if value >= len {
                return Err(PuzzleError::invalid_state(format!(
                    "tile {value} out of range for side {side}"
                )));
            }
            if seen[value] {
                return Err(PuzzleError::invalid_state(format!(
                    "tile {value} appears more than once"
                )));
            }
            seen[value] = true;
        }

        // A permutation of 0..len always contains the blank.
        let blank_index = cells
            .iter()
            .position(|&value| value == 0)
            .ok_or_else(|| PuzzleError::invalid_state("no blank cell"))?;

        Ok(State {
            side,
            cells: cells.into_boxed_slice(),
            blank_index,
        })
    }

    /// The solved board `[1, 2, ..., N²-1, 0]`.
    pub fn goal(side: usize) -> Result<Self> {
        check_side(side)?;
        let len = side * side;
        let cells: Box<[Tile]> = (1..len as Tile).chain(std::iter::once(0)).collect();
        Ok(State {
            side,
            cells,
            blank_index: len - 1,
        })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn cells(&self) -> &[Tile] {
        &self.cells
    }

    pub fn blank_index(&self) -> usize {
        self.blank_index
    }

    pub fn is_goal(&self) -> bool {
        let last = self.cells.len() - 1;
        self.cells
            .iter()
            .enumerate()
            .all(|(index, &value)| {
                if index == last {
                    value == 0
                } else {
                    value as usize == index + 1
                }
            })
    }

    /// Every board reachable by sliding one tile into the blank, in
    /// [`DIRECTIONS`] order.
    pub fn neighbors(&self) -> Vec<State> {
        let side = self.side as isize;
        let row = (self.blank_index / self.side) as isize;
        let col = (self.blank_index % self.side) as isize;

        let mut neighbors = Vec::with_capacity(DIRECTIONS.len());
        for &(dx, dy) in &DIRECTIONS {
            let new_row = row + dx;
            let new_col = col + dy;
            if new_row < 0 || new_col < 0 || new_row >= side || new_col >= side {
                continue;
            }

            let new_blank = (new_row * side + new_col) as usize;
            let mut cells = self.cells.clone();
            cells.swap(self.blank_index, new_blank);
            neighbors.push(State {
                side: self.side,
                cells,
                blank_index: new_blank,
            });
        }

        neighbors
    }

    /// Sum of the grid distances of every tile to its home cell, where tile `v`
    /// belongs at linear index `v - 1`. Admissible and consistent under unit
    /// move cost.
    pub fn manhattan(&self) -> usize {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != 0)
            .map(|(index, &value)| {
                let target = value as usize - 1;
                let (row, col) = (index / self.side, index % self.side);
                let (target_row, target_col) = (target / self.side, target % self.side);
                row.abs_diff(target_row) + col.abs_diff(target_col)
            })
            .sum()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (self.cells.len() - 1).to_string().len();
        for (row_index, row) in self.cells.chunks(self.side).enumerate() {
            if row_index > 0 {
                writeln!(f)?;
            }
            for (col_index, value) in row.iter().enumerate() {
                if col_index > 0 {
                    write!(f, " ")?;
                }
                match *value {
                    0 => write!(f, "{:>width$}", "_")?,
                    value => write!(f, "{value:>width$}")?,
                }
            }
        }
        Ok(())
    }
}
