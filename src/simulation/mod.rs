//! Simulation engine: perception, decision, action and the stepper that paces them

pub mod controller;
pub mod executor;
pub mod perception;
pub mod stepper;
pub mod trace;

pub use controller::{decide, Decision, FALLBACK_ACTIONS};
pub use executor::{apply, ActionOutcome};
pub use perception::{sense, Percept, Sighting};
pub use stepper::{StepObserver, StepPhase, Stepper, TraceLog};
pub use trace::{StepRecord, TraceSummary, TraceWriter, TRACE_HEADER};
