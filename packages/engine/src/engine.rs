//! # Edit Engine
//!
//! Facade wiring the selection store, edit queue, notification bus,
//! and document adapter into one public surface.
//!
//! The engine owns nothing about the AI itself: the rewrite operation
//! and the host document are injected at construction. Tracking,
//! scheduling, diffing, and reconciliation happen here.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::config::EngineConfig;
use crate::document::DocumentAdapter;
use crate::errors::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::queue::{EditQueue, QueueStatistics};
use crate::rewrite::Rewriter;
use crate::selection::{SelectionId, SelectionStatus, TextSelection};
use crate::store::{SelectionStore, StoreStatistics};

/// Orchestrates the full select → rewrite → reconcile lifecycle
pub struct EditEngine {
    config: EngineConfig,
    events: EventBus,
    store: Arc<SelectionStore>,
    queue: EditQueue,
    document: tokio::sync::Mutex<Box<dyn DocumentAdapter>>,
}

impl EditEngine {
    pub fn new(
        config: EngineConfig,
        rewriter: Arc<dyn Rewriter>,
        document: Box<dyn DocumentAdapter>,
    ) -> Self {
        let events = EventBus::new(config.event_channel_capacity);
        let store = Arc::new(SelectionStore::new(events.clone()));
        let queue = EditQueue::new(
            store.clone(),
            rewriter,
            events.clone(),
            config.max_concurrent_edits,
        );

        Self {
            config,
            events,
            store,
            queue,
            document: tokio::sync::Mutex::new(document),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Selection lifecycle
    // ------------------------------------------------------------------

    /// Capture a selection and schedule it for rewriting in one step.
    pub fn submit(
        &self,
        selected_text: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Result<TextSelection, EngineError> {
        let stored = self
            .store
            .add(TextSelection::new(selected_text, start_line, end_line))?;
        self.queue.enqueue(stored.id);
        Ok(stored)
    }

    /// Register a selection without scheduling it
    pub fn add(&self, selection: TextSelection) -> Result<TextSelection, EngineError> {
        self.store.add(selection)
    }

    /// Schedule an already-registered selection
    pub fn enqueue(&self, id: SelectionId) -> Result<(), EngineError> {
        if !self.store.contains(id) {
            return Err(EngineError::NotFound(id));
        }
        self.queue.enqueue(id);
        Ok(())
    }

    pub fn get(&self, id: SelectionId) -> Option<TextSelection> {
        self.store.get(id)
    }

    pub fn get_all(&self) -> Vec<TextSelection> {
        self.store.get_all()
    }

    pub fn remove(&self, id: SelectionId) -> Result<TextSelection, EngineError> {
        self.store.remove(id)
    }

    /// Drop every tracked selection and all queued work. In-flight
    /// rewrites finish and their results are discarded on arrival.
    ///
    /// Returns how many selections were removed.
    pub fn clear_all(&self) -> usize {
        let tracked = self.store.statistics().total;
        // cancel queued work first so pending entries leave through the
        // state machine, then drop whatever remains
        self.queue.cancel_all();
        self.store.clear_all();
        tracked
    }

    pub fn statistics(&self) -> StoreStatistics {
        self.store.statistics()
    }

    // ------------------------------------------------------------------
    // Queue controls
    // ------------------------------------------------------------------

    pub fn pause_queue(&self) {
        self.queue.pause();
    }

    pub fn resume_queue(&self) {
        self.queue.resume();
    }

    pub fn cancel_all(&self) -> Vec<SelectionId> {
        self.queue.cancel_all()
    }

    pub fn queue_statistics(&self) -> QueueStatistics {
        self.queue.statistics()
    }

    /// Re-submit a terminal (completed/error) selection for a fresh
    /// rewrite attempt.
    pub fn regenerate(&self, id: SelectionId) -> Result<TextSelection, EngineError> {
        self.queue.regenerate(id)
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Commit a completed rewrite into the live document, then drop the
    /// selection from the store.
    ///
    /// Atomic from the caller's perspective: on any failure the
    /// document is unchanged and the selection stays `Completed`, so
    /// the user can retry, regenerate, or reject.
    pub async fn apply(&self, id: SelectionId) -> Result<(), EngineError> {
        let selection = self.store.get(id).ok_or(EngineError::NotFound(id))?;
        if selection.status != SelectionStatus::Completed {
            return Err(EngineError::InvalidTransition {
                from: selection.status,
                to: SelectionStatus::Completed,
            });
        }
        let result = selection
            .edit_result
            .as_ref()
            .ok_or(EngineError::MissingResult(id))?;

        let mut document = self.document.lock().await;

        if self.config.verify_content_on_apply {
            let current = document
                .read_range(selection.start_line, selection.end_line)
                .await
                .map_err(|err| EngineError::ApplyConflict(err.to_string()))?;
            if current != result.original {
                tracing::warn!(
                    selection_id = %id,
                    start_line = selection.start_line,
                    end_line = selection.end_line,
                    "document changed since capture, refusing to apply"
                );
                return Err(EngineError::ApplyConflict(
                    "document content changed since the selection was captured".to_string(),
                ));
            }
        }

        document
            .replace_range(selection.start_line, selection.end_line, &result.modified)
            .await
            .map_err(|err| EngineError::ApplyConflict(err.to_string()))?;
        drop(document);

        self.store.remove(id)?;
        tracing::info!(
            selection_id = %id,
            start_line = selection.start_line,
            end_line = selection.end_line,
            "edit applied"
        );
        Ok(())
    }

    /// Discard a completed rewrite without touching the document.
    pub fn reject(&self, id: SelectionId) -> Result<(), EngineError> {
        let selection = self.store.get(id).ok_or(EngineError::NotFound(id))?;
        if selection.status != SelectionStatus::Completed {
            return Err(EngineError::InvalidTransition {
                from: selection.status,
                to: SelectionStatus::Completed,
            });
        }

        self.store.remove(id)?;
        tracing::info!(selection_id = %id, "edit rejected");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Subscribe to lifecycle events. Drop the receiver to
    /// unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Lifecycle events as a `Stream`
    pub fn events(&self) -> BroadcastStream<EngineEvent> {
        self.events.stream()
    }
}
