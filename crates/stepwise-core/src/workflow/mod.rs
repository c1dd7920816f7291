//! Workflow engine core: document handling, step execution and run control.
//!
//! - `definition` -- JSON/YAML parsing, validation, import/export
//! - `pricing` -- per-model token rates and cost formatting
//! - `executor` -- single-step execution with bounded retries
//! - `controller` -- run state machine over the ordered steps

pub mod controller;
pub mod definition;
pub mod executor;
pub mod pricing;

pub use controller::{EngineError, RunController};
pub use definition::WorkflowError;
pub use executor::{StepExecutor, StepOutcome};
pub use pricing::RateTable;
