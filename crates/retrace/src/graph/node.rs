use crate::error::FatalError;
use crate::graph::{NodeKind, ParserId};
use crate::input::Span;
use crate::memo::{MemoContext, MemoTableId};
use crate::session::{ActionContext, ParseSession};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::sync::Arc;

/// Predicate over a single input item.
pub type ItemTest<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Computes the context value a memo node adds to its cache key.
pub type ContextFn<T, V> =
    Arc<dyn Fn(&mut ParseSession<'_, T, V>) -> Result<Option<MemoContext>, FatalError> + Send + Sync>;

/// Combines one operator application of an associative expression.
pub type FoldFn<V> = Arc<dyn Fn(FoldArgs<V>) -> Result<V, FatalError> + Send + Sync>;

type ReduceFn<T, V> =
    Arc<dyn Fn(&mut ActionContext<'_, '_, T, V>) -> Result<V, FatalError> + Send + Sync>;
type PredicateFn<T, V> =
    Arc<dyn Fn(&mut ActionContext<'_, '_, T, V>) -> Result<bool, FatalError> + Send + Sync>;
type ConsumeFn<T, V> =
    Arc<dyn Fn(&mut ActionContext<'_, '_, T, V>) -> Result<(), FatalError> + Send + Sync>;

/// Controls whether a trailing separator is allowed in separated lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingSeparator {
    /// `a, b, c` matches, the `,` of `a, b, c,` is left unconsumed.
    Forbid,
    /// Both `a, b, c` and `a, b, c,` match in full.
    Allow,
    /// Only `a, b, c,` matches (a list of zero items needs no separator).
    Require,
}

/// User code run after a child matched.
pub enum StackAction<T, V> {
    /// Replace the values pushed by the child with one value.
    Reduce(ReduceFn<T, V>),
    /// Accept or reject the match; `false` fails it and rolls it back.
    Predicate(PredicateFn<T, V>),
    /// Observe the match without touching the stack.
    Consume(ConsumeFn<T, V>),
}

impl<T, V> Clone for StackAction<T, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Reduce(f) => Self::Reduce(Arc::clone(f)),
            Self::Predicate(f) => Self::Predicate(Arc::clone(f)),
            Self::Consume(f) => Self::Consume(Arc::clone(f)),
        }
    }
}

impl<T, V> fmt::Debug for StackAction<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reduce(_) => f.write_str("Reduce"),
            Self::Predicate(_) => f.write_str("Predicate"),
            Self::Consume(_) => f.write_str("Consume"),
        }
    }
}

/// Values involved in one operator application.
#[derive(Debug, Clone)]
pub struct FoldArgs<V> {
    /// Values of the left operand (a single folded value after the first
    /// step of a left-associative chain).
    pub lhs: Vec<V>,
    /// Values pushed by the operator parser.
    pub operator: Vec<V>,
    /// Values of the right operand (a single folded value for every step of
    /// a right-associative chain but the innermost).
    pub rhs: Vec<V>,
    /// Input covered by `lhs operator rhs`.
    pub span: Span,
}

/// One row of an operator table.
pub struct AssocOperator<V> {
    pub operator: ParserId,
    pub fold: FoldFn<V>,
}

impl<V> AssocOperator<V> {
    pub fn new<F>(operator: ParserId, fold: F) -> Self
    where
        F: Fn(FoldArgs<V>) -> Result<V, FatalError> + Send + Sync + 'static,
    {
        Self {
            operator,
            fold: Arc::new(fold),
        }
    }
}

impl<V> Clone for AssocOperator<V> {
    fn clone(&self) -> Self {
        Self {
            operator: self.operator,
            fold: Arc::clone(&self.fold),
        }
    }
}

impl<V> fmt::Debug for AssocOperator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssocOperator")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

/// A node kind defined outside the engine.
///
/// The session passed to [`parse`](Self::parse) offers the same primitives
/// the built-in nodes use: [`attempt`](ParseSession::attempt) for children,
/// the logged stack operations, and state slots. A custom node that returns
/// `Ok(false)` is rolled back by the engine; returning `Err` abandons the
/// parse.
///
/// Analyses learn about custom kinds through
/// [`GrammarBuilder::register_rules`](crate::GrammarBuilder::register_rules).
pub trait CustomParser<T, V>: Send + Sync {
    /// Stable kind tag, used to look up analysis rules.
    fn kind(&self) -> &'static str;

    /// Sub-parsers this node may invoke.
    fn children(&self) -> SmallVec<[ParserId; 4]> {
        SmallVec::new()
    }

    fn parse(&self, session: &mut ParseSession<'_, T, V>) -> Result<bool, FatalError>;
}

/// A node of the parser graph.
pub enum Node<T, V> {
    /// Always matches, consumes nothing.
    Empty,
    /// Matches any single item.
    Any,
    /// Matches at the end of input only.
    End,
    /// Matches one item equal to the given one.
    Item(T),
    /// Matches the given items in order.
    Literal(Arc<[T]>),
    /// Matches one item accepted by `test`.
    Class { name: Arc<str>, test: ItemTest<T> },
    /// Matches every child in order.
    Seq(Vec<ParserId>),
    /// Ordered choice: the first matching child wins.
    Choice(Vec<ParserId>),
    /// Tries every child and keeps the one that consumed the most input.
    Longest(Vec<ParserId>),
    /// Matches `child` at least `min` and at most `max` times.
    Repeat {
        child: ParserId,
        min: usize,
        max: Option<usize>,
    },
    /// Matches `child` if possible, succeeds regardless.
    Opt(ParserId),
    /// Matches `item`s separated by `separator`.
    Around {
        item: ParserId,
        separator: ParserId,
        min: usize,
        trailing: TrailingSeparator,
    },
    /// Succeeds iff `child` matches; consumes nothing.
    Lookahead(ParserId),
    /// Succeeds iff `child` does not match; consumes nothing.
    Not(ParserId),
    /// `operand (operator operand)*`, folded from the left.
    LeftAssoc {
        operand: ParserId,
        operators: Vec<AssocOperator<V>>,
    },
    /// `operand (operator operand)*`, folded from the right.
    RightAssoc {
        operand: ParserId,
        operators: Vec<AssocOperator<V>>,
    },
    /// Caches the outcome of `child` in a memo table.
    Memo {
        child: ParserId,
        table: MemoTableId,
        context: Option<ContextFn<T, V>>,
    },
    /// Runs `action` after `child` matched.
    Action {
        child: ParserId,
        action: StackAction<T, V>,
    },
    /// Forward reference; `None` until defined.
    Ref(Option<ParserId>),
    Custom(Arc<dyn CustomParser<T, V>>),
}

impl<T, V> Node<T, V> {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Empty => NodeKind::Empty,
            Self::Any => NodeKind::Any,
            Self::End => NodeKind::End,
            Self::Item(_) => NodeKind::Item,
            Self::Literal(_) => NodeKind::Literal,
            Self::Class { .. } => NodeKind::Class,
            Self::Seq(_) => NodeKind::Seq,
            Self::Choice(_) => NodeKind::Choice,
            Self::Longest(_) => NodeKind::Longest,
            Self::Repeat { .. } => NodeKind::Repeat,
            Self::Opt(_) => NodeKind::Opt,
            Self::Around { .. } => NodeKind::Around,
            Self::Lookahead(_) => NodeKind::Lookahead,
            Self::Not(_) => NodeKind::Not,
            Self::LeftAssoc { .. } => NodeKind::LeftAssoc,
            Self::RightAssoc { .. } => NodeKind::RightAssoc,
            Self::Memo { .. } => NodeKind::Memo,
            Self::Action { .. } => NodeKind::Action,
            Self::Ref(_) => NodeKind::Ref,
            Self::Custom(custom) => NodeKind::Custom(custom.kind()),
        }
    }

    /// Every node this node may invoke, in declaration order.
    #[must_use]
    pub fn children(&self) -> SmallVec<[ParserId; 4]> {
        match self {
            Self::Empty | Self::Any | Self::End | Self::Item(_) | Self::Literal(_) => {
                SmallVec::new()
            }
            Self::Class { .. } | Self::Ref(None) => SmallVec::new(),
            Self::Seq(children) | Self::Choice(children) | Self::Longest(children) => {
                children.iter().copied().collect()
            }
            Self::Repeat { child, .. }
            | Self::Opt(child)
            | Self::Lookahead(child)
            | Self::Not(child)
            | Self::Memo { child, .. }
            | Self::Action { child, .. }
            | Self::Ref(Some(child)) => smallvec![*child],
            Self::Around {
                item, separator, ..
            } => smallvec![*item, *separator],
            Self::LeftAssoc { operand, operators } | Self::RightAssoc { operand, operators } => {
                std::iter::once(*operand)
                    .chain(operators.iter().map(|row| row.operator))
                    .collect()
            }
            Self::Custom(custom) => custom.children(),
        }
    }
}

impl<T: fmt::Debug, V> fmt::Debug for Node<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Any => f.write_str("Any"),
            Self::End => f.write_str("End"),
            Self::Item(item) => f.debug_tuple("Item").field(item).finish(),
            Self::Literal(items) => f.debug_tuple("Literal").field(items).finish(),
            Self::Class { name, .. } => f.debug_tuple("Class").field(name).finish(),
            Self::Seq(children) => f.debug_tuple("Seq").field(children).finish(),
            Self::Choice(children) => f.debug_tuple("Choice").field(children).finish(),
            Self::Longest(children) => f.debug_tuple("Longest").field(children).finish(),
            Self::Repeat { child, min, max } => f
                .debug_struct("Repeat")
                .field("child", child)
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Opt(child) => f.debug_tuple("Opt").field(child).finish(),
            Self::Around {
                item,
                separator,
                min,
                trailing,
            } => f
                .debug_struct("Around")
                .field("item", item)
                .field("separator", separator)
                .field("min", min)
                .field("trailing", trailing)
                .finish(),
            Self::Lookahead(child) => f.debug_tuple("Lookahead").field(child).finish(),
            Self::Not(child) => f.debug_tuple("Not").field(child).finish(),
            Self::LeftAssoc { operand, operators } => f
                .debug_struct("LeftAssoc")
                .field("operand", operand)
                .field("operators", operators)
                .finish(),
            Self::RightAssoc { operand, operators } => f
                .debug_struct("RightAssoc")
                .field("operand", operand)
                .field("operators", operators)
                .finish(),
            Self::Memo { child, table, .. } => f
                .debug_struct("Memo")
                .field("child", child)
                .field("table", table)
                .finish_non_exhaustive(),
            Self::Action { child, action } => f
                .debug_struct("Action")
                .field("child", child)
                .field("action", action)
                .finish(),
            Self::Ref(target) => f.debug_tuple("Ref").field(target).finish(),
            Self::Custom(custom) => f.debug_tuple("Custom").field(&custom.kind()).finish(),
        }
    }
}
