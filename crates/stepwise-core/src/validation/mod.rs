//! Acceptance checks applied to model output.
//!
//! Each strategy is a function from (output, rule parameters) to a
//! [`ValidationOutcome`]. Strategies never return `Err`: every problem,
//! including missing configuration, becomes a failed outcome with a
//! diagnostic. [`ValidationDispatcher`] routes rules to strategies.

pub mod assertion;
pub mod dispatcher;
pub mod format;
pub mod judge;
pub mod syntax;
pub mod text;

pub use dispatcher::ValidationDispatcher;

/// Verdict of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub passed: bool,
    /// Human-readable diagnostic; always set when `passed` is false.
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(error.into()),
        }
    }
}
