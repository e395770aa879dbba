/// Outcome of a top-level parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult<V> {
    /// The root matched, and consumed all input if
    /// [`ParseConfig::require_full_match`](crate::ParseConfig::require_full_match)
    /// is set.
    pub full_match: bool,
    /// The root matched some prefix of the input.
    pub matched: bool,
    /// Where the root's match ended; `0` if it did not match.
    pub end_position: usize,
    /// Deepest position at which any attempt failed.
    pub furthest_failure: usize,
    /// Value stack left by the match, bottom first.
    pub stack: Vec<V>,
}

impl<V> ParseResult<V> {
    #[must_use]
    pub fn top(&self) -> Option<&V> {
        self.stack.last()
    }

    #[must_use]
    pub fn into_top(mut self) -> Option<V> {
        self.stack.pop()
    }
}
