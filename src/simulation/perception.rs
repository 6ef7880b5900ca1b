//! Perception system - the five-field percept the agent reacts to

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::Orientation;
use crate::entity::agent::Agent;
use crate::spatial::grid::{Cell, GridWorld};

/// What the agent sees in one forward-arc cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sighting {
    /// `.`
    Free,
    /// `L`
    Obstacle,
    /// `P`: a wall, or off the edge of the grid
    Wall,
}

impl Sighting {
    pub const ALL: [Sighting; 3] = [Sighting::Free, Sighting::Obstacle, Sighting::Wall];

    pub fn symbol(self) -> char {
        match self {
            Sighting::Free => '.',
            Sighting::Obstacle => 'L',
            Sighting::Wall => 'P',
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "." => Some(Sighting::Free),
            "L" => Some(Sighting::Obstacle),
            "P" => Some(Sighting::Wall),
            _ => None,
        }
    }

    fn from_cell(cell: Option<Cell>) -> Self {
        match cell {
            None | Some(Cell::Wall) => Sighting::Wall,
            Some(Cell::Obstacle) => Sighting::Obstacle,
            Some(Cell::Free) => Sighting::Free,
        }
    }
}

/// Ordered percept `(floor, left, center, right, contact)`
///
/// Also the rule-table key, so equality is structural over all five fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Percept {
    /// Agent is standing on an obstacle cell
    pub floor: bool,
    pub left: Sighting,
    pub center: Sighting,
    pub right: Sighting,
    /// Last forward-motion attempt collided
    pub contact: bool,
}

impl Percept {
    pub const FIELD_NAMES: [&'static str; 5] = ["floor", "left", "center", "right", "contact"];

    /// Number of distinct percepts (2 * 3 * 3 * 3 * 2)
    pub const SPACE_SIZE: usize = 108;

    /// Parse the five textual fields, returning the index of the first bad one
    pub fn from_fields(fields: [&str; 5]) -> Result<Self, usize> {
        let floor = parse_flag(fields[0]).ok_or(0usize)?;
        let left = Sighting::from_symbol(fields[1]).ok_or(1usize)?;
        let center = Sighting::from_symbol(fields[2]).ok_or(2usize)?;
        let right = Sighting::from_symbol(fields[3]).ok_or(3usize)?;
        let contact = parse_flag(fields[4]).ok_or(4usize)?;
        Ok(Self {
            floor,
            left,
            center,
            right,
            contact,
        })
    }

    /// The five fields as their table symbols
    pub fn symbols(&self) -> [char; 5] {
        [
            flag_symbol(self.floor),
            self.left.symbol(),
            self.center.symbol(),
            self.right.symbol(),
            flag_symbol(self.contact),
        ]
    }

    /// Every possible percept, in table order
    pub fn all() -> impl Iterator<Item = Percept> {
        [false, true].into_iter().flat_map(|floor| {
            Sighting::ALL.into_iter().flat_map(move |left| {
                Sighting::ALL.into_iter().flat_map(move |center| {
                    Sighting::ALL.into_iter().flat_map(move |right| {
                        [false, true].into_iter().map(move |contact| Percept {
                            floor,
                            left,
                            center,
                            right,
                            contact,
                        })
                    })
                })
            })
        })
    }
}

/// Rendered in rule-table form, e.g. `0,.,L,P,1`
impl fmt::Display for Percept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [floor, left, center, right, contact] = self.symbols();
        write!(f, "{},{},{},{},{}", floor, left, center, right, contact)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn flag_symbol(flag: bool) -> char {
    if flag {
        '1'
    } else {
        '0'
    }
}

/// (row, col) offsets of the left-diagonal, straight-ahead and right-diagonal cells
pub fn forward_arc(orientation: Orientation) -> [(isize, isize); 3] {
    match orientation {
        Orientation::North => [(-1, -1), (-1, 0), (-1, 1)],
        Orientation::East => [(-1, 1), (0, 1), (1, 1)],
        Orientation::South => [(1, 1), (1, 0), (1, -1)],
        Orientation::West => [(1, -1), (0, -1), (-1, -1)],
    }
}

/// Compute the agent's current percept
///
/// `floor` describes the cell the agent occupies now (after any motion), and
/// `contact` is copied from the agent's blocked flag rather than recomputed.
pub fn sense(grid: &GridWorld, agent: &Agent) -> Percept {
    let pos = agent.position();
    let [left, center, right] = forward_arc(agent.orientation())
        .map(|(d_row, d_col)| Sighting::from_cell(grid.cell_at_offset(pos, d_row, d_col)));

    Percept {
        floor: grid.cell(pos) == Some(Cell::Obstacle),
        left,
        center,
        right,
        contact: agent.is_blocked(),
    }
}
