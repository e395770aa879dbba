//! # Retrace
//!
//! A backtracking parsing engine for PEG-style grammars.
//!
//! ## Overview
//!
//! A grammar is a graph of parser nodes (sequence, ordered choice,
//! repetition, separated lists, lookahead, operator tables, memo wrappers
//! and custom nodes) assembled with a [`GrammarBuilder`]. Building it links
//! forward references and runs a well-formedness analysis that rejects left
//! recursion and repetitions of nullable bodies, so a [`Grammar`] that built
//! cannot loop at parse time.
//!
//! Parsing happens in a [`ParseSession`]:
//!
//! - **Backtracking**: every change to the value stack or to a
//!   [`StateSlot`] is recorded in a reversible log. A node that fails is
//!   rolled back to the snapshot taken before it ran.
//! - **Context-sensitive state**: state slots carry information across the
//!   input (a tag name, a repetition count) and are restored on
//!   backtracking like the stack is.
//! - **Memoization**: memo nodes cache outcomes in a [`BoundedCache`] or a
//!   [`RobinHoodTable`] without changing what is parsed.
//! - **Failures**: a non-match is an ordinary result carrying the furthest
//!   failure position; misuse at parse time is a [`FatalError`] that ends
//!   the parse.
//!
//! ## Quick Start
//!
//! ```rust
//! use retrace::{AssocOperator, FoldArgs, GrammarBuilder, code_points};
//!
//! // sum = number ("+" number)*, folded into an i64
//! let mut g = GrammarBuilder::<char, i64>::new();
//! let digit = g.char_range('0', '9');
//! let digits = g.repeat(digit, 1);
//! let number = g.reduce(digits, |cx| {
//!     cx.text()
//!         .parse::<i64>()
//!         .map_err(|e| retrace::FatalError::action(e.to_string()))
//! });
//! let plus = g.item('+');
//! let sum = g.left_assoc(
//!     number,
//!     vec![AssocOperator::new(plus, |args: FoldArgs<i64>| {
//!         Ok(args.lhs[0] + args.rhs[0])
//!     })],
//! );
//! let grammar = g.build(sum).expect("grammar is well-formed");
//!
//! let result = grammar.parse(&code_points("1+20+300")).expect("no fatal error");
//! assert!(result.full_match);
//! assert_eq!(result.top(), Some(&321));
//! ```
//!
//! ## Feature Flags
//!
//! - `diagnostics`: `miette::Diagnostic` for [`GrammarError`] and [`FatalError`]
//! - `parallel`: batch parsing over a shared grammar with rayon
//! - `serialize`: serde support for [`ParseConfig`], [`MemoStrategy`] and [`Span`]
//!
//! ## Modules
//!
//! - [`graph`] - Parser nodes, the builder and the frozen grammar
//! - [`session`] - Parse sessions, the side-effect log and state slots
//! - [`engine`] - Node semantics and parse results
//! - [`memo`] - Memoizers
//! - [`analysis`] - Well-formedness analysis
//! - [`context`] - Ready-made context-sensitive nodes
//! - [`diagnostics`] - Failure reports and line/column mapping
//! - [`error`] - Error types

pub mod analysis;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod graph;
pub mod input;
pub mod memo;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod session;

pub use analysis::{Analysis, Analyzer, Facts, NodeRules};
pub use diagnostics::{FailureReport, LineCol, LineIndex, OffsetMapper};
pub use engine::{ParseConfig, ParseResult};
pub use error::{AnalysisKind, FatalError, GrammarError, Violation};
pub use graph::{
    AssocOperator, CustomParser, FoldArgs, Grammar, GrammarBuilder, Node, NodeKind, ParserId,
    StackAction, TrailingSeparator,
};
pub use input::{InputItem, LexToken, Span, code_points};
pub use memo::{
    BoundedCache, MemoContext, MemoEntry, MemoStrategy, MemoTableId, Memoizer, RobinHoodTable,
};
pub use session::{
    ActionContext, ParseSession, SideEffect, SlotId, Snapshot, StackValue, StateSlot,
};

#[cfg(feature = "parallel")]
pub use parallel::{BatchResult, ParallelParser, parse_batch};
