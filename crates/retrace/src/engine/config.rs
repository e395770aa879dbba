#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Per-parse configuration.
///
/// # Example
///
/// ```rust
/// use retrace::ParseConfig;
///
/// // Run every memo node as a plain pass-through and accept prefixes.
/// let config = ParseConfig {
///     memoization: false,
///     require_full_match: false,
/// };
/// assert_ne!(config, ParseConfig::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ParseConfig {
    /// Consult and fill memo tables at memo nodes.
    ///
    /// When disabled a memo node simply runs its child. The outcome of the
    /// parse is the same either way.
    pub memoization: bool,

    /// Only count a parse as a full match if the root consumed all input.
    pub require_full_match: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            memoization: true,
            require_full_match: true,
        }
    }
}
