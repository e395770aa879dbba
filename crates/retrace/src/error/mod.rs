//! # Error Types
//!
//! The engine distinguishes three classes of failure:
//!
//! - **Non-match**: the input does not match. This is not an error; it is
//!   reported through [`ParseResult`](crate::ParseResult) and never surfaces
//!   as an `Err`.
//! - [`GrammarError`]: the grammar itself is malformed. Raised once, by
//!   [`GrammarBuilder::build`](crate::GrammarBuilder::build), never during a
//!   parse.
//! - [`FatalError`]: a custom node, stack action or state slot was misused at
//!   parse time. The whole parse is abandoned without backtracking.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, both error types implement
//! [`miette::Diagnostic`].

use crate::graph::ParserId;
use std::fmt;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// The well-formedness analysis that rejected a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// The node can invoke itself before consuming any input.
    LeftRecursion,
    /// The node repeats a body that can succeed without consuming input.
    NullableRepetition,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftRecursion => f.write_str("left recursion"),
            Self::NullableRepetition => f.write_str("nullable repetition"),
        }
    }
}

/// One problem found by the well-formedness analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub analysis: AnalysisKind,
    pub node: ParserId,
    /// Builder-supplied name of the node, if it has one.
    pub name: Option<String>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} in `{}` ({})", self.analysis, name, self.node),
            None => write!(f, "{} in {}", self.analysis, self.node),
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A grammar that cannot be finalized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("Forward reference `{name}` was declared but never defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_reference)))]
    UndefinedReference { name: String, node: ParserId },

    #[error("Forward reference `{name}` only resolves to other forward references")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::reference_cycle)))]
    ReferenceCycle { name: String, node: ParserId },

    #[error("Parser {node} is not a forward reference")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::not_a_reference)))]
    NotAReference { node: ParserId },

    #[error("Forward reference `{name}` is already defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::redefined)))]
    Redefined { name: String, node: ParserId },

    #[error("Parser {node} does not belong to this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_parser)))]
    UnknownParser { node: ParserId },

    #[error("Memo table #{table} does not belong to this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_memo_table)))]
    UnknownMemoTable { table: usize },

    #[error("Malformed grammar: {}", join_violations(.violations))]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::malformed),
            help("rewrite left-recursive rules iteratively and make repeated bodies consume input")
        )
    )]
    Malformed { violations: Vec<Violation> },
}

impl GrammarError {
    /// Violations of a malformed grammar; empty for every other error.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Malformed { violations } => violations,
            _ => &[],
        }
    }
}

/// Parse-time misuse that abandons the whole parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum FatalError {
    #[error("State slot `{key}` was read before any write and has no default")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::unset_slot)))]
    UnsetSlot { key: String },

    #[error("State slot `{key}` holds a value of a different type")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::slot_type)))]
    SlotType { key: String },

    #[error("State slot #{slot} does not belong to this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::unknown_slot)))]
    UnknownSlot { slot: usize },

    #[error("Parser {node} cannot be run by this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::unknown_parser)))]
    UnknownParser { node: ParserId },

    #[error("Custom parser `{kind}` failed: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::custom)))]
    Custom { kind: &'static str, message: String },

    #[error("Stack action failed: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::action)))]
    Action { message: String },
}

impl FatalError {
    /// Abort the parse from inside a stack action.
    #[must_use]
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action {
            message: message.into(),
        }
    }

    /// Abort the parse from inside a custom parser.
    #[must_use]
    pub fn custom(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Custom {
            kind,
            message: message.into(),
        }
    }
}
