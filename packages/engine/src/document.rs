//! # Document Adapter
//!
//! Boundary to the host editor's live document.
//!
//! Ranges are inclusive 0-based line spans, matching the anchors a
//! selection captures. Two adapters ship with the engine:
//!
//! - **MemoryDocument**: in-memory lines, for tests and headless use
//! - **FileDocument**: single file on disk, re-read on every operation
//!
//! `replace_range` is atomic: the range is validated before anything is
//! written, so a failed replacement leaves the document unchanged.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("line range {start}..={end} is out of bounds (document has {len} lines)")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host editor integration consumed by the engine at apply time
#[async_trait]
pub trait DocumentAdapter: Send + Sync {
    /// Current text of an inclusive line range, lines joined with `\n`
    async fn read_range(
        &self,
        start_line: usize,
        end_line: usize,
    ) -> Result<String, DocumentError>;

    /// Replace an inclusive line range with `text`.
    ///
    /// Empty `text` removes the range's lines entirely. Either the full
    /// replacement lands or the document is left untouched.
    async fn replace_range(
        &mut self,
        start_line: usize,
        end_line: usize,
        text: &str,
    ) -> Result<(), DocumentError>;
}

fn check_range(start: usize, end: usize, len: usize) -> Result<(), DocumentError> {
    if start > end || end >= len {
        return Err(DocumentError::RangeOutOfBounds { start, end, len });
    }
    Ok(())
}

fn splice_lines(lines: &mut Vec<String>, start: usize, end: usize, text: &str) {
    let replacement: Vec<String> = if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').map(String::from).collect()
    };
    lines.splice(start..=end, replacement);
}

/// In-memory document (for testing, headless embedding)
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    lines: Vec<String>,
}

impl MemoryDocument {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(String::from).collect(),
        }
    }

    /// Full document text
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl DocumentAdapter for MemoryDocument {
    async fn read_range(
        &self,
        start_line: usize,
        end_line: usize,
    ) -> Result<String, DocumentError> {
        check_range(start_line, end_line, self.lines.len())?;
        Ok(self.lines[start_line..=end_line].join("\n"))
    }

    async fn replace_range(
        &mut self,
        start_line: usize,
        end_line: usize,
        text: &str,
    ) -> Result<(), DocumentError> {
        check_range(start_line, end_line, self.lines.len())?;
        splice_lines(&mut self.lines, start_line, end_line, text);
        Ok(())
    }
}

/// File-backed document (single-user editing)
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_lines(&self) -> Result<Vec<String>, DocumentError> {
        let source = std::fs::read_to_string(&self.path)?;
        Ok(source.split('\n').map(String::from).collect())
    }
}

#[async_trait]
impl DocumentAdapter for FileDocument {
    async fn read_range(
        &self,
        start_line: usize,
        end_line: usize,
    ) -> Result<String, DocumentError> {
        let lines = self.read_lines()?;
        check_range(start_line, end_line, lines.len())?;
        Ok(lines[start_line..=end_line].join("\n"))
    }

    async fn replace_range(
        &mut self,
        start_line: usize,
        end_line: usize,
        text: &str,
    ) -> Result<(), DocumentError> {
        let mut lines = self.read_lines()?;
        check_range(start_line, end_line, lines.len())?;
        splice_lines(&mut lines, start_line, end_line, text);
        std::fs::write(&self.path, lines.join("\n"))?;
        Ok(())
    }
}
