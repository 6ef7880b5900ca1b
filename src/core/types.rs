//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulation tick counter (1-based once the first tick has run)
pub type Tick = u64;

/// Grid coordinate in (row, col) form, row 0 at the top of the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Offset by a signed (row, col) delta, `None` if either coordinate goes negative
    #[inline]
    pub fn offset(self, d_row: isize, d_col: isize) -> Option<Self> {
        Some(Self {
            row: self.row.checked_add_signed(d_row)?,
            col: self.col.checked_add_signed(d_col)?,
        })
    }
}

/// Rendered as `[r,c]`, the format used in trace logs
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.row, self.col)
    }
}

/// Facing direction of the agent
///
/// The declaration order is the clockwise cycle North→East→South→West,
/// which `rotated` walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    fn index(self) -> i32 {
        match self {
            Orientation::North => 0,
            Orientation::East => 1,
            Orientation::South => 2,
            Orientation::West => 3,
        }
    }

    /// Step `delta` places through the clockwise cycle (negative is counter-clockwise)
    pub fn rotated(self, delta: i32) -> Self {
        Self::ALL[(self.index() + delta.rem_euclid(4)).rem_euclid(4) as usize]
    }

    /// Unit (row, col) vector for one forward step
    pub fn unit_vector(self) -> (isize, isize) {
        match self {
            Orientation::North => (-1, 0),
            Orientation::East => (0, 1),
            Orientation::South => (1, 0),
            Orientation::West => (0, -1),
        }
    }

    /// Arrow glyph used in step records
    pub fn symbol(self) -> char {
        match self {
            Orientation::North => '^',
            Orientation::East => '>',
            Orientation::South => 'v',
            Orientation::West => '<',
        }
    }
}
