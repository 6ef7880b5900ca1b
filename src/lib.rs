//! Reflex Grid - a simple reflex agent on a bounded grid world
//!
//! The agent keeps no memory: every tick it senses a five-field percept,
//! looks it up in a rule table, and runs the matching action sequence.

pub mod core;
pub mod entity;
pub mod rules;
pub mod simulation;
pub mod spatial;
