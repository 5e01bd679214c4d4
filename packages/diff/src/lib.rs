//! # Redraft Diff
//!
//! Pure diff/patch engine for comparing original and rewritten text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ differ: (original, modified) → Diff         │
//! │  - character-level LCS comparison           │
//! │  - deterministic for identical inputs       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ inline: Diff → annotated spans              │
//! │  - display-agnostic insert/delete styling   │
//! │  - no document side effects                 │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The engine crate consumes `Diff` values to render inline previews and
//! to decide what an accepted rewrite replaces. Nothing in this crate
//! touches document state.

mod differ;
mod inline;

pub use differ::{compute_diff, Diff, DiffSegment, SegmentKind};
pub use inline::{render_inline, InlineSpan, SpanStyle};
