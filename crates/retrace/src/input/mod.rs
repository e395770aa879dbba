//! # Input
//!
//! What the engine parses: a random-access slice of items. Character
//! grammars parse `&[char]` (see [`code_points`]); token grammars parse a
//! slice of pre-lexed tokens that remember their position in the
//! underlying character stream through [`LexToken`].

mod span;

pub use span::Span;

use std::fmt;

/// Bound satisfied by every item type a grammar can match against.
pub trait InputItem: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> InputItem for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// A pre-lexed token.
///
/// Parse positions over token input are token indices; the source span lets
/// diagnostics translate them back into character offsets.
pub trait LexToken {
    /// Character range this token was lexed from.
    fn source_span(&self) -> Span;
}

/// Decode `text` into the code-point sequence character grammars run on.
#[must_use]
pub fn code_points(text: &str) -> Vec<char> {
    text.chars().collect()
}

/// Map a span of token indices to the character range it covers.
///
/// An empty span maps to the empty character span where the token at its
/// start begins, or where the last token ends when it points past the input.
#[must_use]
pub fn source_span<T: LexToken>(tokens: &[T], span: Span) -> Span {
    let end_of_input = tokens.last().map_or(0, |t| t.source_span().end());
    let start = tokens
        .get(span.start())
        .map_or(end_of_input, |t| t.source_span().start());
    if span.is_empty() {
        return Span::empty(start);
    }
    let end = span
        .end()
        .checked_sub(1)
        .and_then(|last| tokens.get(last))
        .map_or(end_of_input, |t| t.source_span().end());
    Span::new(start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tok(usize, usize);

    impl LexToken for Tok {
        fn source_span(&self) -> Span {
            Span::new(self.0, self.1)
        }
    }

    #[test]
    fn test_code_points_counts_chars_not_bytes() {
        let points = code_points("héllo");
        assert_eq!(points.len(), 5);
        assert_eq!(points[1], 'é');
    }

    #[test]
    fn test_source_span_covers_tokens() {
        let tokens = [Tok(0, 3), Tok(4, 5), Tok(6, 10)];
        assert_eq!(source_span(&tokens, Span::new(0, 2)), Span::new(0, 5));
        assert_eq!(source_span(&tokens, Span::new(1, 3)), Span::new(4, 10));
    }

    #[test]
    fn test_source_span_empty_and_past_end() {
        let tokens = [Tok(0, 3), Tok(4, 5)];
        assert_eq!(source_span(&tokens, Span::empty(1)), Span::empty(4));
        assert_eq!(source_span(&tokens, Span::empty(2)), Span::empty(5));
    }
}
