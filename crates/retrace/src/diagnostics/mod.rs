//! # Failure Diagnostics
//!
//! The engine reports failures as raw input offsets. This module turns them
//! into something a person can act on: [`FailureReport`] picks out the
//! furthest failure and the item found there, and an [`OffsetMapper`] such
//! as [`LineIndex`] turns the offset into a line and column. Rendering
//! (snippets, colors, carets) is left to the embedder.

mod line_index;

pub use line_index::{LineCol, LineIndex};

use crate::engine::ParseResult;
use crate::input::{LexToken, Span, source_span};
use std::fmt;

/// Translates character offsets into line/column positions.
pub trait OffsetMapper {
    fn line_col(&self, offset: usize) -> LineCol;
}

/// Where a parse went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport<T> {
    /// Furthest offset any attempt failed at, in input items.
    pub offset: usize,
    /// Item at `offset`; `None` at the end of input.
    pub found: Option<T>,
    /// Where the root match ended, if it matched a prefix.
    pub matched_until: Option<usize>,
}

impl<T: Clone> FailureReport<T> {
    /// Report on a parse that did not fully match; `None` if it did.
    #[must_use]
    pub fn new<V>(result: &ParseResult<V>, input: &[T]) -> Option<Self> {
        if result.full_match {
            return None;
        }
        Some(Self {
            offset: result.furthest_failure,
            found: input.get(result.furthest_failure).cloned(),
            matched_until: result.matched.then_some(result.end_position),
        })
    }

    /// Line and column of the failure in character input.
    #[must_use]
    pub fn location(&self, mapper: &impl OffsetMapper) -> LineCol {
        mapper.line_col(self.offset)
    }
}

impl<T: LexToken> FailureReport<T> {
    /// Character range of the offending token in the underlying source.
    #[must_use]
    pub fn source_span(&self, tokens: &[T]) -> Span {
        let span = if self.offset < tokens.len() {
            Span::at(self.offset, 1)
        } else {
            Span::empty(self.offset)
        };
        source_span(tokens, span)
    }
}

impl<T: fmt::Debug> fmt::Display for FailureReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            Some(found) => write!(f, "unexpected {found:?} at offset {}", self.offset),
            None => write!(f, "unexpected end of input at offset {}", self.offset),
        }
    }
}
