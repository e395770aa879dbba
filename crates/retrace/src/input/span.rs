#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open range `[start, end)` over an input sequence.
///
/// Offsets count input items: code points for character grammars, tokens
/// for token grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    #[must_use]
    pub const fn at(start: usize, len: usize) -> Self {
        Self::new(start, start + len)
    }

    /// Zero-width span at `offset`.
    #[must_use]
    pub const fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    #[must_use]
    pub const fn start(self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub const fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    #[must_use]
    pub const fn contains_span(self, other: Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The items of `input` inside this span, clamped to the input length.
    #[must_use]
    pub fn slice<T>(self, input: &[T]) -> &[T] {
        let end = self.end.min(input.len());
        let start = self.start.min(end);
        &input[start..end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(feature = "diagnostics")]
impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        Self::new(miette::SourceOffset::from(span.start()), span.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_at() {
        let span = Span::at(10, 5);
        assert_eq!(span.start(), 10);
        assert_eq!(span.end(), 15);
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(10, 20);

        assert!(!span.contains(9));
        assert!(span.contains(10));
        assert!(span.contains(15));
        assert!(!span.contains(20)); // exclusive end
    }

    #[test]
    fn test_span_contains_span() {
        let outer = Span::new(10, 30);
        assert!(outer.contains_span(Span::new(15, 25)));
        assert!(!outer.contains_span(Span::new(5, 15)));
        assert!(outer.contains_span(outer));
    }

    #[test]
    fn test_span_cover() {
        let covered = Span::new(3, 5).cover(Span::new(8, 9));
        assert_eq!(covered, Span::new(3, 9));
    }

    #[test]
    fn test_span_slice_clamps() {
        let input = ['a', 'b', 'c'];
        assert_eq!(Span::new(1, 3).slice(&input), &['b', 'c']);
        assert_eq!(Span::new(2, 10).slice(&input), &['c']);
        assert!(Span::new(7, 9).slice(&input).is_empty());
    }

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(10, 20)), "10..20");
    }
}
