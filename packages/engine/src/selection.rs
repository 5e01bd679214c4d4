//! # Tracked Selections
//!
//! Data model for a span of user-selected text submitted for AI
//! rewriting, and the state machine it moves through.
//!
//! ## Lifecycle
//!
//! ```text
//! pending --(dispatched by queue)--> processing
//! processing --(rewrite succeeds)--> completed
//! processing --(rewrite fails)--> error
//! pending|processing|error --(cancel)--> cancelled (entry removed)
//! completed|error --(regenerate)--> pending
//! completed --(apply/reject)--> removed from store
//! ```
//!
//! Selections are owned exclusively by the [`SelectionStore`]; other
//! components receive clones and route every mutation through the
//! store's transition methods.
//!
//! [`SelectionStore`]: crate::store::SelectionStore

use std::fmt;

use chrono::Utc;
use redraft_diff::Diff;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a tracked selection
pub type SelectionId = Uuid;

/// Lifecycle state of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStatus {
    /// Waiting for a queue slot
    Pending,

    /// Rewrite call in flight
    Processing,

    /// Rewrite succeeded; result available
    Completed,

    /// Rewrite failed; message available
    Error,

    /// Withdrawn before completion
    Cancelled,
}

impl SelectionStatus {
    /// Whether the state machine allows the edge `self` → `next`
    pub fn can_transition_to(self, next: SelectionStatus) -> bool {
        use SelectionStatus::*;

        match (self, next) {
            (Pending, Processing) => true,
            (Processing, Completed) => true,
            (Processing, Error) => true,
            (Pending, Cancelled) | (Processing, Cancelled) | (Error, Cancelled) => true,
            // regenerate
            (Completed, Pending) | (Error, Pending) => true,
            _ => false,
        }
    }

    /// Terminal states hold their result until applied, rejected,
    /// regenerated, or removed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SelectionStatus::Completed | SelectionStatus::Error | SelectionStatus::Cancelled
        )
    }
}

impl fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionStatus::Pending => "pending",
            SelectionStatus::Processing => "processing",
            SelectionStatus::Completed => "completed",
            SelectionStatus::Error => "error",
            SelectionStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful rewrite attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    /// Text sent to the rewriter
    pub original: String,

    /// Text returned by the rewriter (post response-filter)
    pub modified: String,

    /// Structural diff between the two
    pub diff: Diff,
}

/// One tracked span of user-selected text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSelection {
    /// Generated at creation; never changes
    pub id: SelectionId,

    /// Original text captured at selection time; immutable
    pub selected_text: String,

    /// 0-based first line of the captured range
    pub start_line: usize,

    /// 0-based last line of the captured range (inclusive)
    ///
    /// Anchors are captured once and NOT re-validated against document
    /// mutations that happen while the selection is queued. Apply-time
    /// verification is opt-in via engine config.
    pub end_line: usize,

    /// Current state-machine position
    pub status: SelectionStatus,

    /// Present only when `status == Completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_result: Option<EditResult>,

    /// Present only when `status == Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation time, UTC epoch milliseconds
    pub timestamp: i64,
}

impl TextSelection {
    /// Capture a new selection in `Pending` state with a fresh id.
    pub fn new(selected_text: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            selected_text: selected_text.into(),
            start_line,
            end_line,
            status: SelectionStatus::Pending,
            edit_result: None,
            error_message: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
