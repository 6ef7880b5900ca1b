//! The closed set of actions a rule can prescribe

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    MoveForward,
    /// Counter-clockwise on screen: North becomes West
    RotateRight,
    /// Clockwise on screen: North becomes East
    RotateLeft,
}

impl Action {
    /// Canonical table symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Action::MoveForward => "MOVE_FORWARD",
            Action::RotateRight => "ROTATE_RIGHT",
            Action::RotateLeft => "ROTATE_LEFT",
        }
    }

    /// Parse a table symbol; legacy tables spell these AVANZAR / ROTAR+90 / ROTAR-90
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "MOVE_FORWARD" | "AVANZAR" => Some(Action::MoveForward),
            "ROTATE_RIGHT" | "ROTAR+90" => Some(Action::RotateRight),
            "ROTATE_LEFT" | "ROTAR-90" => Some(Action::RotateLeft),
            _ => None,
        }
    }

    /// Orientation delta for rotations, `None` for motion
    ///
    /// ROTATE_RIGHT carries the legacy `+90` label (a positive angle in
    /// the math convention), which on a row-down grid turns the agent
    /// counter-clockwise, hence -1.
    pub fn rotation_delta(self) -> Option<i32> {
        match self {
            Action::MoveForward => None,
            Action::RotateRight => Some(-1),
            Action::RotateLeft => Some(1),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Join an action sequence the way trace logs show it
pub fn join_actions(actions: &[Action]) -> String {
    actions
        .iter()
        .map(|a| a.symbol())
        .collect::<Vec<_>>()
        .join(" y ")
}
