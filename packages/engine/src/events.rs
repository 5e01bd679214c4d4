//! # Notification Bus
//!
//! Broadcasts lifecycle events so observers (UI, logging) can react
//! without polling the store.
//!
//! The bus is an injectable value, not a module-level singleton, so
//! independent engine instances can coexist in tests. Subscribers hold
//! a `broadcast::Receiver`; dropping it unsubscribes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::selection::SelectionId;

/// Lifecycle notification emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SelectionAdded { selection_id: SelectionId, timestamp: i64 },
    EditStarted { selection_id: SelectionId, timestamp: i64 },
    EditCompleted { selection_id: SelectionId, timestamp: i64 },
    EditError { selection_id: SelectionId, timestamp: i64 },
    SelectionRequeued { selection_id: SelectionId, timestamp: i64 },
    QueuePaused { timestamp: i64 },
    QueueResumed { timestamp: i64 },
    QueueCleared { timestamp: i64 },
}

impl EngineEvent {
    pub fn selection_added(selection_id: SelectionId) -> Self {
        Self::SelectionAdded {
            selection_id,
            timestamp: now_ms(),
        }
    }

    pub fn edit_started(selection_id: SelectionId) -> Self {
        Self::EditStarted {
            selection_id,
            timestamp: now_ms(),
        }
    }

    pub fn edit_completed(selection_id: SelectionId) -> Self {
        Self::EditCompleted {
            selection_id,
            timestamp: now_ms(),
        }
    }

    pub fn edit_error(selection_id: SelectionId) -> Self {
        Self::EditError {
            selection_id,
            timestamp: now_ms(),
        }
    }

    pub fn selection_requeued(selection_id: SelectionId) -> Self {
        Self::SelectionRequeued {
            selection_id,
            timestamp: now_ms(),
        }
    }

    pub fn queue_paused() -> Self {
        Self::QueuePaused { timestamp: now_ms() }
    }

    pub fn queue_resumed() -> Self {
        Self::QueueResumed { timestamp: now_ms() }
    }

    pub fn queue_cleared() -> Self {
        Self::QueueCleared { timestamp: now_ms() }
    }

    /// The selection this event concerns, if any. Queue-level events
    /// carry no selection id.
    pub fn selection_id(&self) -> Option<SelectionId> {
        match self {
            EngineEvent::SelectionAdded { selection_id, .. }
            | EngineEvent::EditStarted { selection_id, .. }
            | EngineEvent::EditCompleted { selection_id, .. }
            | EngineEvent::EditError { selection_id, .. }
            | EngineEvent::SelectionRequeued { selection_id, .. } => Some(*selection_id),
            EngineEvent::QueuePaused { .. }
            | EngineEvent::QueueResumed { .. }
            | EngineEvent::QueueCleared { .. } => None,
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Broadcast channel wrapper shared by store, queue, and engine
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events. Drop the receiver to
    /// unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream` for `while let Some(..)` consumers.
    pub fn stream(&self) -> BroadcastStream<EngineEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Fire an event. Delivery to zero subscribers is not an error.
    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
