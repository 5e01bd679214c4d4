//! Inline rendering of diffs as display-agnostic annotated spans.

use serde::{Deserialize, Serialize};

use crate::differ::{Diff, SegmentKind};

/// Visual treatment of a rendered span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStyle {
    Unchanged,
    Added,
    Removed,
}

/// One styled run of text for a UI layer to decorate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    pub style: SpanStyle,
    pub text: String,
}

/// Map a diff to inline spans showing both sides of the change.
///
/// Removed text is kept in the output so a renderer can strike it
/// through next to its replacement. Has no side effects on any
/// document state.
pub fn render_inline(diff: &Diff) -> Vec<InlineSpan> {
    diff.segments
        .iter()
        .map(|segment| InlineSpan {
            style: match segment.kind {
                SegmentKind::Equal => SpanStyle::Unchanged,
                SegmentKind::Insert => SpanStyle::Added,
                SegmentKind::Delete => SpanStyle::Removed,
            },
            text: segment.text.clone(),
        })
        .collect()
}
