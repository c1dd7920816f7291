//! Execution engine for Stepwise workflows.
//!
//! This crate defines the provider capability (`llm`), the event sink
//! capability (`event`), the validation strategies, and the step executor
//! and run controller that drive a workflow to a terminal state. It depends
//! only on `stepwise-types` -- never on `stepwise-infra` or any network crate.

pub mod event;
pub mod llm;
pub mod validation;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
