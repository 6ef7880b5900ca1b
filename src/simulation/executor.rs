//! Applies a single action to the agent

use crate::entity::agent::Agent;
use crate::rules::action::Action;
use crate::spatial::grid::GridWorld;

/// What happened when an action was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Moved,
    Blocked,
    Rotated,
}

pub fn apply(agent: &mut Agent, grid: &GridWorld, action: Action) -> ActionOutcome {
    match action.rotation_delta() {
        Some(delta) => {
            agent.set_orientation(delta);
            ActionOutcome::Rotated
        }
        None if agent.move_forward(grid) => ActionOutcome::Moved,
        None => ActionOutcome::Blocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Orientation, Position};

    fn setup(at: Position, facing: Orientation) -> (GridWorld, Agent) {
        let grid = GridWorld::from_ascii(&["#####", "#...#", "#...#", "#...#", "#####"]).unwrap();
        let agent = Agent::place(&grid, at, facing).unwrap();
        (grid, agent)
    }

    #[test]
    fn test_rotate_right_turns_north_to_west() {
        let (grid, mut agent) = setup(Position::new(2, 2), Orientation::North);
        assert_eq!(apply(&mut agent, &grid, Action::RotateRight), ActionOutcome::Rotated);
        assert_eq!(agent.orientation(), Orientation::West);
    }

    #[test]
    fn test_rotate_left_turns_north_to_east() {
        let (grid, mut agent) = setup(Position::new(2, 2), Orientation::North);
        apply(&mut agent, &grid, Action::RotateLeft);
        assert_eq!(agent.orientation(), Orientation::East);
    }

    #[test]
    fn test_rotation_keeps_position_and_blocked_flag() {
        let (grid, mut agent) = setup(Position::new(1, 2), Orientation::North);
        assert_eq!(apply(&mut agent, &grid, Action::MoveForward), ActionOutcome::Blocked);

        apply(&mut agent, &grid, Action::RotateLeft);
        assert_eq!(agent.position(), Position::new(1, 2));
        assert!(agent.is_blocked());
    }

    #[test]
    fn test_move_forward() {
        let (grid, mut agent) = setup(Position::new(2, 2), Orientation::North);
        assert_eq!(apply(&mut agent, &grid, Action::MoveForward), ActionOutcome::Moved);
        assert_eq!(agent.position(), Position::new(1, 2));
    }
}
