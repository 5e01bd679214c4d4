//! Error types for the edit engine

use thiserror::Error;

use crate::selection::{SelectionId, SelectionStatus};

#[derive(Error, Debug)]
pub enum EngineError {
    /// An illegal state-machine edge was requested. Never swallowed.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: SelectionStatus,
        to: SelectionStatus,
    },

    #[error("selection text must not be empty")]
    EmptySelection,

    #[error("duplicate selection id: {0}")]
    DuplicateId(SelectionId),

    #[error("selection not found: {0}")]
    NotFound(SelectionId),

    /// A completed selection is missing its result payload.
    #[error("selection {0} has no edit result")]
    MissingResult(SelectionId),

    /// The document adapter could not locate or replace the target
    /// range. The selection stays `Completed` so the caller can retry,
    /// regenerate, or reject.
    #[error("apply conflict: {0}")]
    ApplyConflict(String),
}
