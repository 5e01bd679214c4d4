//! Integration tests for the edit engine
//!
//! Drives the full select → rewrite → reconcile lifecycle with
//! scripted rewriters and an in-memory document.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redraft_engine::{
    DocumentAdapter, DocumentError, EditEngine, EngineConfig, EngineError, EngineEvent,
    MemoryDocument, RewriteOutcome, Rewriter, SegmentKind, SelectionId, SelectionStatus,
    TextSelection,
};
use tokio::sync::Semaphore;

/// Document handle the test keeps a view into after handing the engine
/// its adapter
#[derive(Clone)]
struct SharedDocument(Arc<tokio::sync::Mutex<MemoryDocument>>);

impl SharedDocument {
    fn new(text: &str) -> Self {
        Self(Arc::new(tokio::sync::Mutex::new(MemoryDocument::new(text))))
    }

    async fn text(&self) -> String {
        self.0.lock().await.text()
    }
}

#[async_trait]
impl DocumentAdapter for SharedDocument {
    async fn read_range(
        &self,
        start_line: usize,
        end_line: usize,
    ) -> Result<String, DocumentError> {
        self.0.lock().await.read_range(start_line, end_line).await
    }

    async fn replace_range(
        &mut self,
        start_line: usize,
        end_line: usize,
        text: &str,
    ) -> Result<(), DocumentError> {
        self.0
            .lock()
            .await
            .replace_range(start_line, end_line, text)
            .await
    }
}

// ----------------------------------------------------------------------
// Scripted rewriters
// ----------------------------------------------------------------------

/// Applies a fixed text mapping; unknown inputs echo back unchanged.
/// Records the order in which selections were processed.
struct MappingRewriter {
    mapping: Vec<(&'static str, &'static str)>,
    calls: AtomicUsize,
    processed: Mutex<Vec<String>>,
}

impl MappingRewriter {
    fn new(mapping: Vec<(&'static str, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            mapping,
            calls: AtomicUsize::new(0),
            processed: Mutex::new(Vec::new()),
        })
    }

    fn echo() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Rewriter for MappingRewriter {
    async fn rewrite(&self, selection: &TextSelection) -> anyhow::Result<RewriteOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.processed
            .lock()
            .unwrap()
            .push(selection.selected_text.clone());

        let modified = self
            .mapping
            .iter()
            .find(|(from, _)| *from == selection.selected_text)
            .map(|(_, to)| to.to_string())
            .unwrap_or_else(|| selection.selected_text.clone());
        Ok(RewriteOutcome { modified })
    }
}

/// Fails every call whose input is "bad", succeeds otherwise
struct FlakyRewriter {
    calls: AtomicUsize,
}

#[async_trait]
impl Rewriter for FlakyRewriter {
    async fn rewrite(&self, selection: &TextSelection) -> anyhow::Result<RewriteOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if selection.selected_text == "bad" {
            anyhow::bail!("network down");
        }
        Ok(RewriteOutcome {
            modified: selection.selected_text.to_uppercase(),
        })
    }
}

/// Blocks every call on a gate until the test releases permits, and
/// tracks the highest number of calls in flight at once.
struct GatedRewriter {
    gate: Semaphore,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

impl GatedRewriter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl Rewriter for GatedRewriter {
    async fn rewrite(&self, selection: &TextSelection) -> anyhow::Result<RewriteOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let _permit = self.gate.acquire().await?;
        self.active.fetch_sub(1, Ordering::SeqCst);

        Ok(RewriteOutcome {
            modified: format!("{}!", selection.selected_text),
        })
    }
}

/// Returns a versioned rewrite so attempts are distinguishable
struct VersionedRewriter {
    calls: AtomicUsize,
}

#[async_trait]
impl Rewriter for VersionedRewriter {
    async fn rewrite(&self, selection: &TextSelection) -> anyhow::Result<RewriteOutcome> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RewriteOutcome {
            modified: format!("{} v{attempt}", selection.selected_text),
        })
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn engine_with(rewriter: Arc<dyn Rewriter>, document: &str, config: EngineConfig) -> EditEngine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    EditEngine::new(config, rewriter, Box::new(MemoryDocument::new(document)))
}

async fn wait_for_status(engine: &EditEngine, id: SelectionId, status: SelectionStatus) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if engine.get(id).map(|s| s.status) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("selection {id} never reached {status}"));
}

async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting until {description}"));
}

// ----------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_submit_to_completion_with_expected_diff() {
    let rewriter = MappingRewriter::new(vec![("hello world", "hello, world!")]);
    let engine = engine_with(rewriter, "hello world", EngineConfig::default());

    let id = engine.submit("hello world", 0, 0).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    let selection = engine.get(id).unwrap();
    let result = selection.edit_result.unwrap();
    assert_eq!(result.original, "hello world");
    assert_eq!(result.modified, "hello, world!");

    let kinds: Vec<(SegmentKind, &str)> = result
        .diff
        .segments
        .iter()
        .map(|s| (s.kind, s.text.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (SegmentKind::Equal, "hello"),
            (SegmentKind::Insert, ","),
            (SegmentKind::Equal, " world"),
            (SegmentKind::Insert, "!"),
        ]
    );
}

#[tokio::test]
async fn test_lifecycle_events_in_order() {
    let engine = engine_with(MappingRewriter::echo(), "text", EngineConfig::default());
    let mut rx = engine.subscribe();

    let id = engine.submit("text", 0, 0).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    assert!(matches!(
        rx.recv().await.unwrap(),
        EngineEvent::SelectionAdded { selection_id, .. } if selection_id == id
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        EngineEvent::EditStarted { selection_id, .. } if selection_id == id
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        EngineEvent::EditCompleted { selection_id, .. } if selection_id == id
    ));
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let engine = engine_with(MappingRewriter::echo(), "text", EngineConfig::default());
    assert!(matches!(
        engine.submit("", 0, 0),
        Err(EngineError::EmptySelection)
    ));
}

// ----------------------------------------------------------------------
// Queue behavior
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_sequential_queue_statistics() {
    let rewriter = GatedRewriter::new();
    let engine = engine_with(rewriter.clone(), "a\nb", EngineConfig::default());

    let a = engine.submit("a", 0, 0).unwrap().id;
    let b = engine.submit("b", 1, 1).unwrap().id;

    // with maxConcurrentEdits = 1 exactly one rewrite starts
    wait_until("first dispatch", || rewriter.calls.load(Ordering::SeqCst) == 1).await;
    let stats = engine.queue_statistics();
    assert_eq!(stats.processing, 1);
    assert_eq!(stats.queued, 1);
    assert!(!stats.is_paused);

    rewriter.release(2);
    wait_for_status(&engine, a, SelectionStatus::Completed).await;
    wait_for_status(&engine, b, SelectionStatus::Completed).await;

    assert_eq!(rewriter.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrency_stays_within_limit() {
    let rewriter = GatedRewriter::new();
    let config = EngineConfig {
        max_concurrent_edits: 2,
        ..EngineConfig::default()
    };
    let engine = engine_with(rewriter.clone(), "a\nb\nc\nd\ne", config);

    let ids: Vec<SelectionId> = ["a", "b", "c", "d", "e"]
        .iter()
        .enumerate()
        .map(|(line, text)| engine.submit(*text, line, line).unwrap().id)
        .collect();

    wait_until("two dispatches", || rewriter.calls.load(Ordering::SeqCst) == 2).await;
    let stats = engine.queue_statistics();
    assert_eq!(stats.processing, 2);
    assert_eq!(stats.queued, 3);

    rewriter.release(5);
    for id in ids {
        wait_for_status(&engine, id, SelectionStatus::Completed).await;
    }
    assert!(rewriter.max_active.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_dispatch_preserves_fifo_order() {
    let rewriter = MappingRewriter::echo();
    let engine = engine_with(rewriter.clone(), "a\nb\nc", EngineConfig::default());

    engine.pause_queue();
    for (line, text) in ["first", "second", "third"].iter().enumerate() {
        engine.submit(*text, line, line).unwrap();
    }
    engine.resume_queue();

    wait_until("all processed", || rewriter.calls.load(Ordering::SeqCst) == 3).await;
    assert_eq!(
        *rewriter.processed.lock().unwrap(),
        vec!["first", "second", "third"]
    );
}

#[tokio::test]
async fn test_rewrite_failure_marks_error_and_queue_continues() {
    let rewriter = Arc::new(FlakyRewriter {
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(rewriter, "bad\ngood", EngineConfig::default());

    let bad = engine.submit("bad", 0, 0).unwrap().id;
    let good = engine.submit("good", 1, 1).unwrap().id;

    wait_for_status(&engine, bad, SelectionStatus::Error).await;
    // no manual intervention: the next queued selection proceeds
    wait_for_status(&engine, good, SelectionStatus::Completed).await;

    let failed = engine.get(bad).unwrap();
    assert_eq!(failed.error_message.as_deref(), Some("network down"));
    assert!(failed.edit_result.is_none());

    assert_eq!(
        engine.get(good).unwrap().edit_result.unwrap().modified,
        "GOOD"
    );
}

#[tokio::test]
async fn test_pause_and_resume_events() {
    let engine = engine_with(MappingRewriter::echo(), "text", EngineConfig::default());
    let mut rx = engine.subscribe();

    engine.pause_queue();
    engine.pause_queue(); // idempotent: only one event
    engine.resume_queue();

    assert!(matches!(rx.recv().await.unwrap(), EngineEvent::QueuePaused { .. }));
    assert!(matches!(rx.recv().await.unwrap(), EngineEvent::QueueResumed { .. }));
    assert!(rx.try_recv().is_err());
}

// ----------------------------------------------------------------------
// Cancellation
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_clear_all_cancels_pending_and_discards_late_result() {
    let rewriter = GatedRewriter::new();
    let engine = engine_with(rewriter.clone(), "a\nb\nc", EngineConfig::default());

    let inflight = engine.submit("a", 0, 0).unwrap().id;
    let pending_one = engine.submit("b", 1, 1).unwrap().id;
    let pending_two = engine.submit("c", 2, 2).unwrap().id;

    wait_until("first dispatch", || rewriter.calls.load(Ordering::SeqCst) == 1).await;

    // drops both pending selections and the in-flight entry
    let removed = engine.clear_all();
    assert_eq!(removed, 3);
    assert!(engine.get(pending_one).is_none());
    assert!(engine.get(pending_two).is_none());
    assert!(engine.get(inflight).is_none());
    assert_eq!(engine.queue_statistics().queued, 0);

    // the in-flight rewrite completes normally; its result arrives for
    // an id the store no longer contains and is discarded without panic
    rewriter.release(1);
    wait_until("in-flight settled", || {
        engine.queue_statistics().processing == 0
    })
    .await;
    assert!(engine.get(inflight).is_none());
    assert_eq!(engine.statistics().total, 0);
}

#[tokio::test]
async fn test_cancel_all_spares_in_flight_selection() {
    let rewriter = GatedRewriter::new();
    let engine = engine_with(rewriter.clone(), "a\nb", EngineConfig::default());

    let inflight = engine.submit("a", 0, 0).unwrap().id;
    let pending = engine.submit("b", 1, 1).unwrap().id;

    wait_until("first dispatch", || rewriter.calls.load(Ordering::SeqCst) == 1).await;

    let removed = engine.cancel_all();
    assert_eq!(removed, vec![pending]);
    assert!(engine.get(pending).is_none());

    // still tracked: cancel_all does not abort in-flight work
    assert_eq!(
        engine.get(inflight).unwrap().status,
        SelectionStatus::Processing
    );

    rewriter.release(1);
    wait_for_status(&engine, inflight, SelectionStatus::Completed).await;
    assert_eq!(
        engine.get(inflight).unwrap().edit_result.unwrap().modified,
        "a!"
    );
}

#[tokio::test]
async fn test_clear_all_emits_queue_cleared() {
    let engine = engine_with(MappingRewriter::echo(), "text", EngineConfig::default());
    engine.pause_queue();
    engine.submit("text", 0, 0).unwrap();

    let mut rx = engine.subscribe();
    engine.clear_all();

    loop {
        match rx.recv().await.unwrap() {
            EngineEvent::QueueCleared { .. } => break,
            _ => continue,
        }
    }
}

// ----------------------------------------------------------------------
// Regeneration
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_regenerate_resets_result_and_requeues() {
    let rewriter = Arc::new(VersionedRewriter {
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(rewriter, "draft", EngineConfig::default());

    let id = engine.submit("draft", 0, 0).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;
    assert_eq!(
        engine.get(id).unwrap().edit_result.unwrap().modified,
        "draft v1"
    );

    let requeued = engine.regenerate(id).unwrap();
    assert_eq!(requeued.status, SelectionStatus::Pending);
    assert!(requeued.edit_result.is_none());
    assert!(requeued.error_message.is_none());

    wait_for_status(&engine, id, SelectionStatus::Completed).await;
    assert_eq!(
        engine.get(id).unwrap().edit_result.unwrap().modified,
        "draft v2"
    );
}

#[tokio::test]
async fn test_regenerate_after_error() {
    let rewriter = Arc::new(FlakyRewriter {
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(rewriter, "bad", EngineConfig::default());

    let id = engine.submit("bad", 0, 0).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Error).await;

    let requeued = engine.regenerate(id).unwrap();
    assert!(requeued.error_message.is_none());

    // the retry fails again, but through a fresh attempt
    wait_for_status(&engine, id, SelectionStatus::Error).await;
}

// ----------------------------------------------------------------------
// Apply / reject
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_apply_replaces_document_range() {
    let document = SharedDocument::new("alpha\nbeta\ngamma");
    let rewriter = MappingRewriter::new(vec![("beta", "BETA")]);
    let engine = EditEngine::new(
        EngineConfig::default(),
        rewriter,
        Box::new(document.clone()),
    );

    let id = engine.submit("beta", 1, 1).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    engine.apply(id).await.unwrap();

    assert_eq!(document.text().await, "alpha\nBETA\ngamma");
    // applied selections leave the store
    assert!(engine.get(id).is_none());
    assert_eq!(engine.statistics().total, 0);
}

#[tokio::test]
async fn test_apply_empty_rewrite_deletes_range() {
    let document = SharedDocument::new("alpha\nbeta\ngamma");
    let rewriter = MappingRewriter::new(vec![("beta", "")]);
    let engine = EditEngine::new(
        EngineConfig::default(),
        rewriter,
        Box::new(document.clone()),
    );

    let id = engine.submit("beta", 1, 1).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    let result = engine.get(id).unwrap().edit_result.unwrap();
    assert_eq!(result.modified, "");
    assert_eq!(result.diff.segments.len(), 1);
    assert_eq!(result.diff.segments[0].kind, SegmentKind::Delete);

    engine.apply(id).await.unwrap();
    assert_eq!(document.text().await, "alpha\ngamma");
}

#[tokio::test]
async fn test_apply_identity_rewrite_is_a_noop() {
    let document = SharedDocument::new("alpha\nbeta");
    let engine = EditEngine::new(
        EngineConfig::default(),
        MappingRewriter::echo(),
        Box::new(document.clone()),
    );

    let id = engine.submit("beta", 1, 1).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    let result = engine.get(id).unwrap().edit_result.unwrap();
    assert!(result.diff.is_identity());
    engine.apply(id).await.unwrap();
    assert_eq!(document.text().await, "alpha\nbeta");
}

#[tokio::test]
async fn test_apply_requires_completed_status() {
    let rewriter = GatedRewriter::new();
    let engine = engine_with(rewriter.clone(), "text", EngineConfig::default());

    let id = engine.submit("text", 0, 0).unwrap().id;
    wait_until("dispatch", || rewriter.calls.load(Ordering::SeqCst) == 1).await;

    // still processing
    let err = engine.apply(id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    rewriter.release(1);
}

#[tokio::test]
async fn test_apply_unknown_selection() {
    let engine = engine_with(MappingRewriter::echo(), "text", EngineConfig::default());
    let err = engine.apply(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_apply_conflict_when_content_verification_enabled() {
    let config = EngineConfig {
        verify_content_on_apply: true,
        ..EngineConfig::default()
    };
    // the captured text does not match what the document holds at
    // lines 1..=1, as if the document changed while queued
    let document = SharedDocument::new("alpha\nbeta\ngamma");
    let engine = EditEngine::new(config, MappingRewriter::echo(), Box::new(document.clone()));

    let id = engine.submit("stale text", 1, 1).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    let err = engine.apply(id).await.unwrap_err();
    assert!(matches!(err, EngineError::ApplyConflict(_)));

    // the document is untouched and the selection stays completed so
    // the user can retry, regenerate, or reject
    assert_eq!(document.text().await, "alpha\nbeta\ngamma");
    assert_eq!(engine.get(id).unwrap().status, SelectionStatus::Completed);
}

#[tokio::test]
async fn test_reject_discards_without_touching_document() {
    let document = SharedDocument::new("alpha\nbeta");
    let rewriter = MappingRewriter::new(vec![("beta", "BETA")]);
    let engine = EditEngine::new(
        EngineConfig::default(),
        rewriter,
        Box::new(document.clone()),
    );

    let id = engine.submit("beta", 1, 1).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Completed).await;

    engine.reject(id).unwrap();
    assert!(engine.get(id).is_none());
    assert_eq!(document.text().await, "alpha\nbeta");
}

#[tokio::test]
async fn test_reject_requires_completed_status() {
    let rewriter = Arc::new(FlakyRewriter {
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(rewriter, "bad", EngineConfig::default());

    let id = engine.submit("bad", 0, 0).unwrap().id;
    wait_for_status(&engine, id, SelectionStatus::Error).await;

    let err = engine.reject(id).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    // errored selections are dismissed via remove instead
    engine.remove(id).unwrap();
    assert!(engine.get(id).is_none());
}
