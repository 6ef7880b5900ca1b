//! Grid world model

pub mod grid;

pub use grid::{Cell, GridWorld, MIN_GRID_SIDE};
