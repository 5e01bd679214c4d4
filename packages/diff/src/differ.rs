//! # Structural Text Diffing
//!
//! Computes an ordered sequence of equal/insert/delete segments between
//! an original string and its rewritten form.
//!
//! ## Semantics
//!
//! - Comparison is character-level (LCS family, via Myers), so edits
//!   inside a word are still isolated into their own segments.
//! - Consecutive characters with the same change tag are collapsed into
//!   one segment.
//! - `compute_diff(x, x)` yields a diff containing only equal segments.
//! - `compute_diff(x, "")` yields a pure-delete diff, not an error.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// What a diff segment does to the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Text present in both original and modified
    Equal,

    /// Text present only in modified
    Insert,

    /// Text present only in original
    Delete,
}

/// One run of characters sharing a change kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

/// Ordered list of segments describing original → modified
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub segments: Vec<DiffSegment>,
}

impl Diff {
    /// True when the diff carries no insertions or deletions.
    ///
    /// An empty diff (both inputs empty) counts as an identity diff;
    /// applying it is a no-op.
    pub fn is_identity(&self) -> bool {
        self.segments.iter().all(|s| s.kind == SegmentKind::Equal)
    }

    /// Rebuild the original text from equal + delete segments
    pub fn reconstruct_original(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Insert)
            .map(|s| s.text.as_str())
            .collect()
    }

    /// Rebuild the modified text from equal + insert segments
    pub fn reconstruct_modified(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Delete)
            .map(|s| s.text.as_str())
            .collect()
    }

    /// Number of characters inserted by this diff
    pub fn inserted_chars(&self) -> usize {
        self.kind_chars(SegmentKind::Insert)
    }

    /// Number of characters deleted by this diff
    pub fn deleted_chars(&self) -> usize {
        self.kind_chars(SegmentKind::Delete)
    }

    fn kind_chars(&self, kind: SegmentKind) -> usize {
        self.segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.text.chars().count())
            .sum()
    }
}

/// Compute the character-level diff between `original` and `modified`.
///
/// Pure and deterministic: identical inputs always produce the same
/// segment list.
pub fn compute_diff(original: &str, modified: &str) -> Diff {
    let text_diff = TextDiff::from_chars(original, modified);

    let mut segments: Vec<DiffSegment> = Vec::new();
    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => SegmentKind::Equal,
            ChangeTag::Insert => SegmentKind::Insert,
            ChangeTag::Delete => SegmentKind::Delete,
        };

        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => segments.push(DiffSegment {
                kind,
                text: change.value().to_string(),
            }),
        }
    }

    Diff { segments }
}
