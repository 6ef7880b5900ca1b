pub mod config;
pub mod error;
pub mod types;

pub use config::{AutoIntervals, PacingMode, SessionConfig, MIN_MAP_SIDE};
pub use error::{AgentError, ConfigError, GridError, ReflexError, Result, RuleTableError};
pub use types::{Orientation, Position, Tick};
