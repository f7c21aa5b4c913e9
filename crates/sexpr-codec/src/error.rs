//! Parse errors with source-span context.
//!
//! The parser never recovers: the first error aborts the parse. This mirrors
//! the rest of the workspace's error layering (a closed `thiserror` enum per
//! crate) but carries the extra positional fields a hand-written recursive
//! descent parser needs to point a caller at the offending byte.

use thiserror::Error;

/// A parse failure with enough context to reproduce it in an editor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at {line}:{column} (offset {offset}): expected {expected}, found {found}")]
pub struct ParseError {
    /// Byte offset into the source buffer.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// What the parser was looking for.
    pub expected: String,
    /// What it actually saw, rendered for display.
    pub found: String,
}

impl ParseError {
    pub(crate) fn new(
        offset: usize,
        line: usize,
        column: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            offset,
            line,
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }
}
