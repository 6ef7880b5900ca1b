//! Percept-action rule tables loaded from CSV

pub mod action;
pub mod table;
mod loader;

pub use action::{join_actions, Action};
pub use loader::{load_rule_table, parse_rule_table};
pub use table::{Rule, RuleTable};
