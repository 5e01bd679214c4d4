//! External rewrite seam.
//!
//! The AI call lives outside this crate: provider selection, prompt
//! construction, client timeouts, and response filtering are all the
//! collaborator's concern. The engine only sees the filtered
//! replacement text or an opaque error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::selection::TextSelection;

/// Replacement text produced by a rewrite call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub modified: String,
}

/// Injected async rewrite operation.
///
/// Implementations are expected to impose their own timeout; the queue
/// does not add one and cannot abort a call once it is in flight.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, selection: &TextSelection) -> anyhow::Result<RewriteOutcome>;
}
