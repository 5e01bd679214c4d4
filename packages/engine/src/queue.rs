//! # Edit Queue
//!
//! Decides when a pending selection is dispatched to the rewrite
//! operation, bounded by a configurable concurrency limit.
//!
//! ## Scheduling
//!
//! - FIFO dispatch in enqueue order; completion order is not
//!   guaranteed above concurrency 1
//! - The pump runs whenever capacity might have freed: after enqueue,
//!   resume, and every settled rewrite
//! - A rewrite failure marks its selection `Error` and the pump moves
//!   on; the loop never halts because one call rejected
//!
//! ## Cancellation
//!
//! `cancel_all` clears queued work and cancels selections that were
//! still pending. An already-in-flight rewrite cannot be aborted; its
//! result is discarded on arrival if the selection has left the store
//! in the meantime.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::rewrite::Rewriter;
use crate::selection::{EditResult, SelectionId, TextSelection};
use crate::store::{SelectionStore, Transition};

/// Queue-level counters for UI and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatistics {
    pub queued: usize,
    pub processing: usize,
    pub is_paused: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    fifo: VecDeque<SelectionId>,
    // membership mirrors of the fifo and of in-flight work, for O(1)
    // duplicate checks
    queued: HashSet<SelectionId>,
    processing: HashSet<SelectionId>,
    paused: bool,
}

struct QueueInner {
    store: Arc<SelectionStore>,
    rewriter: Arc<dyn Rewriter>,
    events: EventBus,
    state: Mutex<QueueState>,
    max_concurrent: usize,
}

/// Scheduler that drains pending selections through the rewriter.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct EditQueue {
    inner: Arc<QueueInner>,
}

impl EditQueue {
    pub fn new(
        store: Arc<SelectionStore>,
        rewriter: Arc<dyn Rewriter>,
        events: EventBus,
        max_concurrent: usize,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                store,
                rewriter,
                events,
                state: Mutex::new(QueueState::default()),
                // 0 would wedge the queue; treat it as sequential
                max_concurrent: max_concurrent.max(1),
            }),
        }
    }

    /// Add a selection id to the FIFO. No-op if the id is already
    /// queued or processing.
    pub fn enqueue(&self, id: SelectionId) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.queued.contains(&id) || state.processing.contains(&id) {
                tracing::debug!(selection_id = %id, "enqueue ignored, already tracked");
                return;
            }
            state.fifo.push_back(id);
            state.queued.insert(id);
        }
        tracing::debug!(selection_id = %id, "selection enqueued");
        self.pump();
    }

    /// Stop dispatching new work. In-flight rewrites finish normally.
    /// Idempotent.
    pub fn pause(&self) {
        let newly_paused = {
            let mut state = self.inner.state.lock().unwrap();
            let newly = !state.paused;
            state.paused = true;
            newly
        };
        if newly_paused {
            tracing::info!("queue paused");
            self.inner.events.emit(EngineEvent::queue_paused());
        }
    }

    /// Restart dispatch. Idempotent.
    pub fn resume(&self) {
        let newly_resumed = {
            let mut state = self.inner.state.lock().unwrap();
            let newly = state.paused;
            state.paused = false;
            newly
        };
        if newly_resumed {
            tracing::info!("queue resumed");
            self.inner.events.emit(EngineEvent::queue_resumed());
        }
        self.pump();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().unwrap().paused
    }

    /// Drop all queued work and cancel the selections that were still
    /// pending. In-flight rewrites are left to finish; their results
    /// are discarded at write-back if the selection is gone.
    ///
    /// Returns the ids that were removed from the FIFO.
    pub fn cancel_all(&self) -> Vec<SelectionId> {
        let drained: Vec<SelectionId> = {
            let mut state = self.inner.state.lock().unwrap();
            state.queued.clear();
            state.fifo.drain(..).collect()
        };

        for id in &drained {
            // entries may have been removed behind the queue's back;
            // that is not an error here
            if let Err(err) = self.inner.store.transition(*id, Transition::Cancel) {
                tracing::debug!(selection_id = %id, error = %err, "cancel skipped");
            }
        }

        tracing::info!(count = drained.len(), "queued work cancelled");
        self.inner.events.emit(EngineEvent::queue_cleared());
        drained
    }

    pub fn statistics(&self) -> QueueStatistics {
        let state = self.inner.state.lock().unwrap();
        QueueStatistics {
            queued: state.fifo.len(),
            processing: state.processing.len(),
            is_paused: state.paused,
        }
    }

    /// Reset a terminal selection back to pending and re-enter the
    /// FIFO. Only valid on `Completed` or `Error` selections.
    pub fn regenerate(&self, id: SelectionId) -> Result<TextSelection, EngineError> {
        let requeued = self.inner.store.transition(id, Transition::Requeue)?;
        tracing::debug!(selection_id = %id, "selection regenerating");
        self.enqueue(id);
        Ok(requeued)
    }

    /// Dispatch loop: fill free concurrency slots from the FIFO.
    ///
    /// Runs synchronously; the spawned rewrite tasks call back in when
    /// they settle.
    fn pump(&self) {
        loop {
            let id = {
                let mut state = self.inner.state.lock().unwrap();
                if state.paused || state.processing.len() >= self.inner.max_concurrent {
                    return;
                }
                let Some(id) = state.fifo.pop_front() else {
                    return;
                };
                state.queued.remove(&id);
                state.processing.insert(id);
                id
            };

            match self.inner.store.transition(id, Transition::Dispatch) {
                Ok(_) => {
                    tracing::debug!(selection_id = %id, "dispatching rewrite");
                    self.spawn_rewrite(id);
                }
                Err(err) => {
                    // removed or moved since enqueue; skip it
                    tracing::debug!(selection_id = %id, error = %err, "dispatch skipped");
                    self.inner.state.lock().unwrap().processing.remove(&id);
                }
            }
        }
    }

    fn spawn_rewrite(&self, id: SelectionId) {
        let queue = self.clone();
        tokio::spawn(async move {
            let settled = queue.run_rewrite(id).await;

            // write-back and slot release are one critical section:
            // a regenerate that observes the terminal status can never
            // find the slot still occupied, and a fresh dispatch can
            // never start while this selection still reads `processing`
            {
                let mut state = queue.inner.state.lock().unwrap();
                if let Some(transition) = settled {
                    // a concurrent cancel can still win the race; the
                    // result is dropped, never half-written
                    if let Err(err) = queue.inner.store.transition(id, transition) {
                        tracing::debug!(selection_id = %id, error = %err, "write-back discarded");
                    }
                }
                state.processing.remove(&id);
            }

            queue.pump();
        });
    }

    /// Execute one rewrite attempt and turn its outcome into the
    /// terminal transition to write back, unless the selection has been
    /// removed in the meantime.
    async fn run_rewrite(&self, id: SelectionId) -> Option<Transition> {
        let Some(selection) = self.inner.store.get(id) else {
            tracing::debug!(selection_id = %id, "selection vanished before rewrite");
            return None;
        };

        let outcome = self.inner.rewriter.rewrite(&selection).await;

        if !self.inner.store.contains(id) {
            tracing::debug!(selection_id = %id, "discarding rewrite result for removed selection");
            return None;
        }

        match outcome {
            Ok(outcome) => {
                let diff = redraft_diff::compute_diff(&selection.selected_text, &outcome.modified);
                tracing::info!(
                    selection_id = %id,
                    inserted = diff.inserted_chars(),
                    deleted = diff.deleted_chars(),
                    "rewrite completed"
                );
                Some(Transition::Complete(EditResult {
                    original: selection.selected_text.clone(),
                    modified: outcome.modified,
                    diff,
                }))
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(selection_id = %id, error = %message, "rewrite failed");
                Some(Transition::Fail(message))
            }
        }
    }
}
