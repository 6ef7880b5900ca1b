//! The reflex agent: where it stands, where it faces, and whether its last step hit a wall

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::AgentError;
use crate::core::types::{Orientation, Position};
use crate::spatial::grid::GridWorld;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    position: Position,
    orientation: Orientation,
    /// Set by the most recent forward-motion attempt
    blocked: bool,
}

impl Agent {
    /// Spawn with a random orientation on a cell drawn uniformly from the
    /// walkable interior
    ///
    /// Hand-built grids may have walls inside the border or no interior at
    /// all. Those fall back to any walkable cell before giving up.
    pub fn spawn<R: Rng + ?Sized>(grid: &GridWorld, rng: &mut R) -> Result<Self, AgentError> {
        let orientation = Orientation::ALL[rng.gen_range(0..Orientation::ALL.len())];

        let mut candidates: Vec<Position> = grid
            .iter()
            .map(|(pos, _)| pos)
            .filter(|&pos| grid.is_interior(pos) && grid.is_walkable(pos))
            .collect();
        if candidates.is_empty() {
            candidates = grid
                .iter()
                .map(|(pos, _)| pos)
                .filter(|&pos| grid.is_walkable(pos))
                .collect();
        }
        let position = *candidates
            .choose(rng)
            .ok_or(AgentError::NoWalkableCell)?;

        Ok(Self {
            position,
            orientation,
            blocked: false,
        })
    }

    /// Place at a specific cell, which must be inside the grid and not a wall
    pub fn place(
        grid: &GridWorld,
        position: Position,
        orientation: Orientation,
    ) -> Result<Self, AgentError> {
        if !grid.is_walkable(position) {
            return Err(AgentError::InvalidPlacement(position));
        }
        Ok(Self {
            position,
            orientation,
            blocked: false,
        })
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Rotate `delta` steps through N→E→S→W; +1 is clockwise on screen
    pub fn set_orientation(&mut self, delta: i32) {
        self.orientation = self.orientation.rotated(delta);
    }

    /// Step one cell forward unless the target is a wall or off the grid
    ///
    /// Returns true if the agent moved. Obstacles do not stop motion.
    pub fn move_forward(&mut self, grid: &GridWorld) -> bool {
        let (d_row, d_col) = self.orientation.unit_vector();
        match self.position.offset(d_row, d_col) {
            Some(target) if grid.is_walkable(target) => {
                self.position = target;
                self.blocked = false;
                true
            }
            _ => {
                self.blocked = true;
                false
            }
        }
    }
}
