use crate::analysis::{Analysis, Analyzer};
use crate::engine::{ParseConfig, ParseResult};
use crate::error::FatalError;
use crate::graph::{Node, ParserId};
use crate::input::InputItem;
use crate::memo::{MemoStrategy, MemoTableId};
use crate::session::{ParseSession, SlotFactory, SlotId, SlotInfo, StackValue};
use lasso::{RodeoReader, Spur};
use std::fmt;

/// A linked, checked and immutable parser graph.
///
/// Produced by [`GrammarBuilder::build`](crate::GrammarBuilder::build). A
/// grammar holds no per-parse state, so one instance can serve any number of
/// sessions, on any number of threads, at the same time.
pub struct Grammar<T, V> {
    pub(crate) nodes: Vec<Node<T, V>>,
    pub(crate) names: Vec<Option<Spur>>,
    pub(crate) interner: RodeoReader,
    pub(crate) slots: Vec<SlotInfo>,
    pub(crate) memo_tables: Vec<MemoStrategy>,
    pub(crate) analyzer: Analyzer<T, V>,
    pub(crate) root: ParserId,
}

impl<T, V> Grammar<T, V> {
    #[must_use]
    pub fn node(&self, id: ParserId) -> Option<&Node<T, V>> {
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node<T, V>] {
        &self.nodes
    }

    #[must_use]
    pub const fn root(&self) -> ParserId {
        self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Name given to `id` with [`GrammarBuilder::name`](crate::GrammarBuilder::name)
    /// or [`declare`](crate::GrammarBuilder::declare).
    #[must_use]
    pub fn name(&self, id: ParserId) -> Option<&str> {
        let key = (*self.names.get(id.index())?)?;
        Some(self.interner.resolve(&key))
    }

    /// Human-readable label of a node for logs and diagnostics.
    #[must_use]
    pub fn describe(&self, id: ParserId) -> String {
        match (self.name(id), self.node(id)) {
            (Some(name), _) => format!("`{name}` ({id})"),
            (None, Some(node)) => format!("{} {id}", node.kind()),
            (None, None) => id.to_string(),
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Registration key of a slot; empty for a foreign slot.
    #[must_use]
    pub fn slot_key(&self, slot: SlotId) -> &str {
        self.slots
            .get(slot.index())
            .map_or("", |info| self.interner.resolve(&info.key))
    }

    pub(crate) fn slot_factory(&self, slot: SlotId) -> Option<&SlotFactory> {
        self.slots.get(slot.index())?.factory.as_ref()
    }

    #[must_use]
    pub fn memo_table_count(&self) -> usize {
        self.memo_tables.len()
    }

    #[must_use]
    pub fn memo_strategy(&self, table: MemoTableId) -> Option<MemoStrategy> {
        self.memo_tables.get(table.index()).copied()
    }

    /// Analyzer the grammar was checked with, including custom-kind rules.
    #[must_use]
    pub const fn analyzer(&self) -> &Analyzer<T, V> {
        &self.analyzer
    }

    /// Recompute nullability and first sets, for tooling.
    #[must_use]
    pub fn analyze(&self) -> Analysis {
        self.analyzer.analyze(self)
    }
}

impl<T, V> Grammar<T, V>
where
    T: InputItem,
    V: StackValue,
{
    /// Parse `input` from the root with the default configuration.
    pub fn parse(&self, input: &[T]) -> Result<ParseResult<V>, FatalError> {
        self.parse_with(input, ParseConfig::default())
    }

    pub fn parse_with(
        &self,
        input: &[T],
        config: ParseConfig,
    ) -> Result<ParseResult<V>, FatalError> {
        self.session(input, config).run(self.root)
    }

    /// Fresh session over `input`, for callers that drive the parse
    /// themselves or keep memo tables between parses.
    #[must_use]
    pub fn session<'a>(&'a self, input: &'a [T], config: ParseConfig) -> ParseSession<'a, T, V> {
        ParseSession::new(self, input, config)
    }
}

impl<T: fmt::Debug, V> fmt::Debug for Grammar<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (index, node) in self.nodes.iter().enumerate() {
            list.entry(&self.describe(ParserId::new(index)), node);
        }
        list.finish()
    }
}
