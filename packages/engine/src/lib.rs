//! # Redraft Engine
//!
//! AI edit queue and diff reconciliation engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ UI layer: captures a selection              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine: select → rewrite → reconcile        │
//! │  - store: selection registry + state machine│
//! │  - queue: FIFO dispatch, bounded concurrency│
//! │  - events: lifecycle broadcast bus          │
//! │  - document: host editor adapter            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ redraft-diff: original/modified → segments  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Store is source of truth**: every status change goes through
//!    its validated transition table
//! 2. **Injected boundaries**: the AI call ([`Rewriter`]) and the host
//!    document ([`DocumentAdapter`]) are supplied by the embedder
//! 3. **The queue never crashes**: a failed rewrite marks one
//!    selection and dispatch continues
//! 4. **Nothing is silently lost**: late results for withdrawn
//!    selections are discarded with a log line, apply conflicts
//!    surface to the caller
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redraft_engine::{EditEngine, EngineConfig, MemoryDocument};
//!
//! let engine = EditEngine::new(
//!     EngineConfig::default(),
//!     my_rewriter,                                  // Arc<dyn Rewriter>
//!     Box::new(MemoryDocument::new(document_text)),
//! );
//!
//! // Capture and schedule a selection
//! let selection = engine.submit("hello world", 4, 4)?;
//!
//! // ... rewrite completes, UI shows the inline diff ...
//!
//! // Commit or discard
//! engine.apply(selection.id).await?;
//! ```

mod config;
mod document;
mod engine;
mod errors;
mod events;
mod queue;
mod rewrite;
mod selection;
mod store;

pub use config::EngineConfig;
pub use document::{DocumentAdapter, DocumentError, FileDocument, MemoryDocument};
pub use engine::EditEngine;
pub use errors::EngineError;
pub use events::{EngineEvent, EventBus};
pub use queue::{EditQueue, QueueStatistics};
pub use rewrite::{RewriteOutcome, Rewriter};
pub use selection::{EditResult, SelectionId, SelectionStatus, TextSelection};
pub use store::{SelectionStore, StoreStatistics, Transition};

// Re-export the diff surface for convenience
pub use redraft_diff::{compute_diff, render_inline, Diff, DiffSegment, InlineSpan, SegmentKind, SpanStyle};
