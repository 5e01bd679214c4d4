use serde::{Deserialize, Serialize};

/// Engine configuration supplied by the settings layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum rewrite calls in flight at once. 1 means strictly
    /// sequential dispatch.
    #[serde(default = "default_max_concurrent_edits")]
    pub max_concurrent_edits: usize,

    /// Capacity of the notification broadcast channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// When true, `apply` compares the document's current range text
    /// against the captured original and fails with a conflict on
    /// mismatch. Off by default: anchors are trusted as captured.
    #[serde(default)]
    pub verify_content_on_apply: bool,
}

fn default_max_concurrent_edits() -> usize {
    1
}

fn default_event_channel_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_edits: default_max_concurrent_edits(),
            event_channel_capacity: default_event_channel_capacity(),
            verify_content_on_apply: false,
        }
    }
}
