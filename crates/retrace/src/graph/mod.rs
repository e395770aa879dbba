//! # Parser Graph
//!
//! A grammar is an arena of [`Node`]s addressed by [`ParserId`] handles.
//! Children are referenced by handle, so sub-parsers can be shared and rules
//! can refer to each other cyclically: a rule is first
//! [declared](GrammarBuilder::declare) as a forward reference, used freely,
//! and [defined](GrammarBuilder::define) later. [`GrammarBuilder::build`]
//! links the references, runs the well-formedness analyzer and freezes the
//! graph into an immutable, thread-shareable [`Grammar`].

mod builder;
mod grammar;
mod node;

pub use builder::GrammarBuilder;
pub use grammar::Grammar;
pub use node::{
    AssocOperator, ContextFn, CustomParser, FoldArgs, FoldFn, ItemTest, Node, StackAction,
    TrailingSeparator,
};

use std::fmt;

/// Handle of a node in a grammar arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParserId(u32);

impl ParserId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ParserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag of a node variant, used to key analysis dispatch tables.
///
/// Custom nodes are told apart by the kind string they report through
/// [`CustomParser::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Empty,
    Any,
    End,
    Item,
    Literal,
    Class,
    Seq,
    Choice,
    Longest,
    Repeat,
    Opt,
    Around,
    Lookahead,
    Not,
    LeftAssoc,
    RightAssoc,
    Memo,
    Action,
    Ref,
    Custom(&'static str),
}

impl NodeKind {
    /// Every built-in kind.
    pub const BUILTIN: [Self; 19] = [
        Self::Empty,
        Self::Any,
        Self::End,
        Self::Item,
        Self::Literal,
        Self::Class,
        Self::Seq,
        Self::Choice,
        Self::Longest,
        Self::Repeat,
        Self::Opt,
        Self::Around,
        Self::Lookahead,
        Self::Not,
        Self::LeftAssoc,
        Self::RightAssoc,
        Self::Memo,
        Self::Action,
        Self::Ref,
    ];
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(kind) => f.write_str(kind),
            other => write!(f, "{other:?}"),
        }
    }
}
