use thiserror::Error;

use crate::core::types::Position;

/// Grid construction failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Invalid grid dimension {rows}x{cols}: both sides must be at least {min}")]
    InvalidDimension { rows: usize, cols: usize, min: usize },

    #[error("Invalid obstacle density {0}: must be within [0, 1]")]
    InvalidDensity(f64),
}

/// Agent placement failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Cannot place agent at {0}: cell is a wall or outside the grid")]
    InvalidPlacement(Position),

    #[error("Cannot spawn agent: the grid has no walkable cell")]
    NoWalkableCell,
}

/// Rule table load failures; any of these rejects the whole table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleTableError {
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("Invalid percept value '{value}' for field '{field}' on line {line}")]
    InvalidPercept {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("Unknown action '{symbol}' on line {line}")]
    UnknownAction { line: u64, symbol: String },

    #[error("Duplicate rule for percept {percept} on line {line} (first seen as #{first_index})")]
    DuplicateRule {
        line: u64,
        percept: String,
        first_index: usize,
    },

    #[error("Failed to read rule table: {0}")]
    Read(String),
}

/// Session configuration failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid map size {rows}x{cols}: both sides must be at least {min}")]
    InvalidDimension { rows: usize, cols: usize, min: usize },

    #[error("Invalid obstacle density {0}: must be within [0, 1]")]
    InvalidDensity(f64),

    #[error("Invalid auto interval for {tier}: must be a positive number of milliseconds")]
    InvalidInterval { tier: &'static str },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Crate-level error surfaced to whoever starts a session
#[derive(Error, Debug)]
pub enum ReflexError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Rule table error: {0}")]
    RuleTable(#[from] RuleTableError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReflexError>;
