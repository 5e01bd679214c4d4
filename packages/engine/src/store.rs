//! # Selection Store
//!
//! Single source of truth for all tracked selections.
//!
//! ## Design Principles
//!
//! 1. **Exclusive ownership**: readers receive clones; every mutation
//!    goes through [`SelectionStore::transition`] or removal methods
//! 2. **Validated edges**: the state machine in
//!    [`SelectionStatus::can_transition_to`] is enforced on every
//!    transition; illegal edges surface as `InvalidTransition`
//! 3. **Payload by construction**: each [`Transition`] variant carries
//!    exactly the data its edge produces, so a completed selection can
//!    never be missing its result
//!
//! The store is shared across the async queue behind a mutex; the lock
//! is only held across synchronous sections, never across an await.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::selection::{EditResult, SelectionId, SelectionStatus, TextSelection};

/// A requested state-machine edge, carrying the data that edge
/// produces.
#[derive(Debug, Clone)]
pub enum Transition {
    /// pending → processing (queue dispatch)
    Dispatch,

    /// processing → completed, with the rewrite result
    Complete(EditResult),

    /// processing → error, with the failure message
    Fail(String),

    /// pending | processing | error → cancelled; the entry is removed
    Cancel,

    /// completed | error → pending (regenerate); result payloads are
    /// cleared so the next attempt starts clean
    Requeue,
}

impl Transition {
    fn target_status(&self) -> SelectionStatus {
        match self {
            Transition::Dispatch => SelectionStatus::Processing,
            Transition::Complete(_) => SelectionStatus::Completed,
            Transition::Fail(_) => SelectionStatus::Error,
            Transition::Cancel => SelectionStatus::Cancelled,
            Transition::Requeue => SelectionStatus::Pending,
        }
    }
}

/// Counts by status for UI and capacity decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatistics {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

/// Registry of all tracked selections
#[derive(Debug)]
pub struct SelectionStore {
    selections: Mutex<HashMap<SelectionId, TextSelection>>,
    events: EventBus,
}

impl SelectionStore {
    pub fn new(events: EventBus) -> Self {
        Self {
            selections: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Register a selection. The stored entry always starts `Pending`
    /// with no result payloads, whatever the caller passed in.
    ///
    /// Fails with `EmptySelection` for empty text and `DuplicateId` if
    /// the id is already tracked.
    pub fn add(&self, selection: TextSelection) -> Result<TextSelection, EngineError> {
        if selection.selected_text.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let stored = TextSelection {
            status: SelectionStatus::Pending,
            edit_result: None,
            error_message: None,
            ..selection
        };

        {
            let mut selections = self.selections.lock().unwrap();
            if selections.contains_key(&stored.id) {
                return Err(EngineError::DuplicateId(stored.id));
            }
            selections.insert(stored.id, stored.clone());
        }

        tracing::debug!(
            selection_id = %stored.id,
            start_line = stored.start_line,
            end_line = stored.end_line,
            "selection added"
        );
        self.events.emit(EngineEvent::selection_added(stored.id));

        Ok(stored)
    }

    /// Snapshot of one selection
    pub fn get(&self, id: SelectionId) -> Option<TextSelection> {
        self.selections.lock().unwrap().get(&id).cloned()
    }

    /// Snapshot of every tracked selection, oldest first
    pub fn get_all(&self) -> Vec<TextSelection> {
        let mut all: Vec<TextSelection> =
            self.selections.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|s| (s.timestamp, s.id));
        all
    }

    pub fn contains(&self, id: SelectionId) -> bool {
        self.selections.lock().unwrap().contains_key(&id)
    }

    /// Move a selection along one state-machine edge.
    ///
    /// Returns the selection as it looks after the transition.
    /// `Cancel` removes the entry from the store, per the lifecycle
    /// table. Illegal edges fail with `InvalidTransition` and leave the
    /// selection untouched.
    pub fn transition(
        &self,
        id: SelectionId,
        transition: Transition,
    ) -> Result<TextSelection, EngineError> {
        let target = transition.target_status();

        let snapshot = {
            let mut selections = self.selections.lock().unwrap();
            let selection = selections.get_mut(&id).ok_or(EngineError::NotFound(id))?;

            let from = selection.status;
            if !from.can_transition_to(target) {
                return Err(EngineError::InvalidTransition { from, to: target });
            }

            selection.status = target;
            match &transition {
                Transition::Dispatch => {}
                Transition::Complete(result) => {
                    selection.edit_result = Some(result.clone());
                    selection.error_message = None;
                }
                Transition::Fail(message) => {
                    selection.error_message = Some(message.clone());
                    selection.edit_result = None;
                }
                Transition::Requeue => {
                    selection.edit_result = None;
                    selection.error_message = None;
                }
                Transition::Cancel => {}
            }

            let snapshot = selection.clone();
            if matches!(transition, Transition::Cancel) {
                selections.remove(&id);
            }
            snapshot
        };

        tracing::debug!(selection_id = %id, status = %snapshot.status, "selection transitioned");
        match &transition {
            Transition::Dispatch => self.events.emit(EngineEvent::edit_started(id)),
            Transition::Complete(_) => self.events.emit(EngineEvent::edit_completed(id)),
            Transition::Fail(_) => self.events.emit(EngineEvent::edit_error(id)),
            Transition::Requeue => self.events.emit(EngineEvent::selection_requeued(id)),
            Transition::Cancel => {}
        }

        Ok(snapshot)
    }

    /// Drop one selection regardless of state
    pub fn remove(&self, id: SelectionId) -> Result<TextSelection, EngineError> {
        let removed = self
            .selections
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(EngineError::NotFound(id))?;
        tracing::debug!(selection_id = %id, "selection removed");
        Ok(removed)
    }

    /// Drop every tracked selection and return the removed ids so the
    /// queue can discard matching work.
    pub fn clear_all(&self) -> Vec<SelectionId> {
        let drained: Vec<SelectionId> = {
            let mut selections = self.selections.lock().unwrap();
            selections.drain().map(|(id, _)| id).collect()
        };
        tracing::debug!(count = drained.len(), "store cleared");
        drained
    }

    /// Counts by status
    pub fn statistics(&self) -> StoreStatistics {
        let selections = self.selections.lock().unwrap();
        let mut stats = StoreStatistics {
            total: selections.len(),
            ..StoreStatistics::default()
        };

        for selection in selections.values() {
            match selection.status {
                SelectionStatus::Pending => stats.pending += 1,
                SelectionStatus::Processing => stats.processing += 1,
                SelectionStatus::Completed => stats.completed += 1,
                SelectionStatus::Error => stats.error += 1,
                // cancelled entries are removed at transition time
                SelectionStatus::Cancelled => {}
            }
        }

        stats
    }
}
