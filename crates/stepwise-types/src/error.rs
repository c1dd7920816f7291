use thiserror::Error;

use crate::run::RunStatus;

/// Errors raised when run state would be moved illegally.
#[derive(Debug, Error)]
pub enum RunStateError {
    #[error("invalid run status transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
}
