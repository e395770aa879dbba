//! Line and column lookup over code-point offsets.

use crate::diagnostics::OffsetMapper;

/// Zero-based line and column of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineCol {
    pub line: u32,
    /// Column in code points.
    pub column: u32,
}

impl LineCol {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Line start table for one input.
///
/// Built once in a single scan; each lookup is a binary search. `\n`, `\r\n`
/// and a lone `\r` all end a line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Offsets where lines begin, starting with 0.
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::from_chars(text.chars())
    }

    /// Index an already-decoded input, such as the slice a character grammar
    /// parsed.
    #[must_use]
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut line_starts = vec![0];
        let mut len = 0;
        let mut after_cr = false;
        for c in chars {
            len += 1;
            match c {
                '\n' if after_cr => {
                    // `\r\n`: the line already ended at `\r`, move its start past `\n`.
                    if let Some(last) = line_starts.last_mut() {
                        *last = len;
                    }
                }
                '\n' | '\r' => line_starts.push(len),
                _ => {}
            }
            after_cr = c == '\r';
        }
        Self { line_starts, len }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Offset where `line` begins.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Length of the indexed input in code points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl OffsetMapper for LineIndex {
    /// Offsets past the end are clamped to the end.
    fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        LineCol {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(offset - start).unwrap_or(u32::MAX),
        }
    }
}
