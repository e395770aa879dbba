use crate::analysis::{Analyzer, NodeRules};
use crate::error::{FatalError, GrammarError};
use crate::graph::{
    AssocOperator, CustomParser, Grammar, Node, NodeKind, ParserId, StackAction,
    TrailingSeparator,
};
use crate::memo::{MemoContext, MemoStrategy, MemoTableId};
use crate::session::{
    ActionContext, ParseSession, SlotFactory, SlotId, SlotInfo, SlotValue, StateSlot,
};
use hashbrown::HashMap;
use lasso::{Rodeo, Spur};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Mutable arena a grammar is assembled in.
///
/// Every constructor appends one node and returns its handle; handles can be
/// used as children of any node added later, and of forward references
/// defined later.
///
/// # Example
///
/// ```rust
/// use retrace::GrammarBuilder;
///
/// // list = item ("," item)*   item = [a-z]+
/// let mut g = GrammarBuilder::<char, ()>::new();
/// let letter = g.char_range('a', 'z');
/// let word = g.repeat(letter, 1);
/// let comma = g.item(',');
/// let tail = g.seq([comma, word]);
/// let tails = g.repeat(tail, 0);
/// let list = g.seq([word, tails]);
/// let grammar = g.build(list).expect("well-formed");
///
/// let input: Vec<char> = "ab,cd".chars().collect();
/// assert!(grammar.parse(&input).expect("no fatal error").full_match);
/// ```
pub struct GrammarBuilder<T, V> {
    nodes: Vec<Node<T, V>>,
    names: Vec<Option<Spur>>,
    interner: Rodeo,
    slots: Vec<SlotInfo>,
    slot_keys: HashMap<Spur, SlotId, ahash::RandomState>,
    memo_tables: Vec<MemoStrategy>,
    analyzer: Analyzer<T, V>,
}

impl<T, V> GrammarBuilder<T, V> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            names: Vec::new(),
            interner: Rodeo::default(),
            slots: Vec::new(),
            slot_keys: HashMap::with_hasher(ahash::RandomState::new()),
            memo_tables: Vec::new(),
            analyzer: Analyzer::new(),
        }
    }

    /// Append `node` as is.
    pub fn add(&mut self, node: Node<T, V>) -> ParserId {
        let id = ParserId::new(self.nodes.len());
        self.nodes.push(node);
        self.names.push(None);
        id
    }

    /// Node added under `id`, if any.
    #[must_use]
    pub fn node(&self, id: ParserId) -> Option<&Node<T, V>> {
        self.nodes.get(id.index())
    }

    /// Number of nodes added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a node that always matches and consumes nothing.
    pub fn empty(&mut self) -> ParserId {
        self.add(Node::Empty)
    }

    /// Create a node matching any single item.
    pub fn any(&mut self) -> ParserId {
        self.add(Node::Any)
    }

    /// Create a node matching only at the end of input.
    pub fn end(&mut self) -> ParserId {
        self.add(Node::End)
    }

    /// Create a node matching one item equal to `item`.
    pub fn item(&mut self, item: T) -> ParserId {
        self.add(Node::Item(item))
    }

    /// Create a node matching `items` in order. A mismatch is reported at
    /// the first differing item.
    pub fn literal(&mut self, items: impl IntoIterator<Item = T>) -> ParserId {
        self.add(Node::Literal(items.into_iter().collect()))
    }

    /// One item accepted by `test`; `name` labels it in diagnostics.
    pub fn class<F>(&mut self, name: &str, test: F) -> ParserId
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.add(Node::Class {
            name: Arc::from(name),
            test: Arc::new(test),
        })
    }

    /// Create a sequence: every child in order.
    pub fn seq(&mut self, children: impl IntoIterator<Item = ParserId>) -> ParserId {
        self.add(Node::Seq(children.into_iter().collect()))
    }

    /// Create an ordered choice: the first child that matches wins.
    pub fn choice(&mut self, children: impl IntoIterator<Item = ParserId>) -> ParserId {
        self.add(Node::Choice(children.into_iter().collect()))
    }

    /// Create a choice that tries every child and keeps the longest match.
    /// Ties go to the earlier child.
    pub fn longest(&mut self, children: impl IntoIterator<Item = ParserId>) -> ParserId {
        self.add(Node::Longest(children.into_iter().collect()))
    }

    /// `child` at least `min` times, as often as it matches.
    pub fn repeat(&mut self, child: ParserId, min: usize) -> ParserId {
        self.add(Node::Repeat {
            child,
            min,
            max: None,
        })
    }

    /// `child` between `min` and `max` times.
    pub fn repeat_range(&mut self, child: ParserId, min: usize, max: usize) -> ParserId {
        self.add(Node::Repeat {
            child,
            min,
            max: Some(max.max(min)),
        })
    }

    /// Create an optional node: `child` if it matches, nothing otherwise.
    pub fn opt(&mut self, child: ParserId) -> ParserId {
        self.add(Node::Opt(child))
    }

    /// `item (separator item)*` with at least `min` items.
    pub fn around(
        &mut self,
        item: ParserId,
        separator: ParserId,
        min: usize,
        trailing: TrailingSeparator,
    ) -> ParserId {
        self.add(Node::Around {
            item,
            separator,
            min,
            trailing,
        })
    }

    /// Create a positive lookahead: succeeds iff `child` matches, consumes
    /// nothing and leaves no effects.
    pub fn lookahead(&mut self, child: ParserId) -> ParserId {
        self.add(Node::Lookahead(child))
    }

    /// Create a negative lookahead: succeeds iff `child` does not match.
    /// Failures inside it are not reported.
    pub fn not(&mut self, child: ParserId) -> ParserId {
        self.add(Node::Not(child))
    }

    /// `operand (operator operand)*`, folded left to right.
    ///
    /// Operator rows are tried in order at each step; put longer operators
    /// that share a prefix with shorter ones first.
    pub fn left_assoc(&mut self, operand: ParserId, operators: Vec<AssocOperator<V>>) -> ParserId {
        self.add(Node::LeftAssoc { operand, operators })
    }

    /// `operand (operator operand)*`, folded right to left.
    pub fn right_assoc(
        &mut self,
        operand: ParserId,
        operators: Vec<AssocOperator<V>>,
    ) -> ParserId {
        self.add(Node::RightAssoc { operand, operators })
    }

    /// Register a memo table; memo nodes given the same table share it.
    pub fn memo_table(&mut self, strategy: MemoStrategy) -> MemoTableId {
        let id = MemoTableId::new(self.memo_tables.len());
        self.memo_tables.push(strategy);
        id
    }

    /// Memoize `child` in a table of its own with the default strategy.
    pub fn memo(&mut self, child: ParserId) -> ParserId {
        let table = self.memo_table(MemoStrategy::default());
        self.memo_in(child, table)
    }

    /// Memoize `child` in `table`.
    pub fn memo_in(&mut self, child: ParserId, table: MemoTableId) -> ParserId {
        self.add(Node::Memo {
            child,
            table,
            context: None,
        })
    }

    /// Memoize `child` keyed additionally on the value `context` computes
    /// from the session, for children whose outcome depends on state slots.
    pub fn memo_with_context<F>(&mut self, child: ParserId, table: MemoTableId, context: F) -> ParserId
    where
        F: Fn(&mut ParseSession<'_, T, V>) -> Result<Option<MemoContext>, FatalError>
            + Send
            + Sync
            + 'static,
    {
        self.add(Node::Memo {
            child,
            table,
            context: Some(Arc::new(context)),
        })
    }

    /// Run `action` after `child` matches.
    pub fn action(&mut self, child: ParserId, action: StackAction<T, V>) -> ParserId {
        self.add(Node::Action { child, action })
    }

    /// Replace the values `child` pushed with the one `reduce` returns.
    pub fn reduce<F>(&mut self, child: ParserId, reduce: F) -> ParserId
    where
        F: Fn(&mut ActionContext<'_, '_, T, V>) -> Result<V, FatalError> + Send + Sync + 'static,
    {
        self.action(child, StackAction::Reduce(Arc::new(reduce)))
    }

    /// Accept the match of `child` only if `predicate` returns `true`.
    pub fn predicate<F>(&mut self, child: ParserId, predicate: F) -> ParserId
    where
        F: Fn(&mut ActionContext<'_, '_, T, V>) -> Result<bool, FatalError>
            + Send
            + Sync
            + 'static,
    {
        self.action(child, StackAction::Predicate(Arc::new(predicate)))
    }

    /// Run `consume` after `child` matches, for actions that only touch
    /// state slots.
    pub fn consume<F>(&mut self, child: ParserId, consume: F) -> ParserId
    where
        F: Fn(&mut ActionContext<'_, '_, T, V>) -> Result<(), FatalError> + Send + Sync + 'static,
    {
        self.action(child, StackAction::Consume(Arc::new(consume)))
    }

    /// Create a node parsed by `parser`.
    pub fn custom<P: CustomParser<T, V> + 'static>(&mut self, parser: P) -> ParserId {
        self.add(Node::Custom(Arc::new(parser)))
    }

    /// Set the analysis rules of custom nodes reporting `kind`.
    pub fn register_rules(&mut self, kind: &'static str, rules: NodeRules<T, V>) {
        self.analyzer.register(NodeKind::Custom(kind), rules);
    }

    /// A named forward reference, to be filled in with [`define`](Self::define).
    pub fn declare(&mut self, name: &str) -> ParserId {
        let id = self.add(Node::Ref(None));
        self.name(id, name)
    }

    /// Fill in a reference created by [`declare`](Self::declare).
    pub fn define(&mut self, declared: ParserId, target: ParserId) -> Result<(), GrammarError> {
        if target.index() >= self.nodes.len() {
            return Err(GrammarError::UnknownParser { node: target });
        }
        let name = self.label(declared);
        match self.nodes.get_mut(declared.index()) {
            Some(Node::Ref(resolved)) => match resolved {
                None => {
                    *resolved = Some(target);
                    Ok(())
                }
                Some(_) => Err(GrammarError::Redefined {
                    name,
                    node: declared,
                }),
            },
            Some(_) => Err(GrammarError::NotAReference { node: declared }),
            None => Err(GrammarError::UnknownParser { node: declared }),
        }
    }

    /// Attach a rule name to `id` for diagnostics.
    pub fn name(&mut self, id: ParserId, name: &str) -> ParserId {
        let key = self.interner.get_or_intern(name);
        if let Some(slot) = self.names.get_mut(id.index()) {
            *slot = Some(key);
        }
        id
    }

    /// State slot registered under `key`; reading it before a write is a
    /// fatal error.
    pub fn slot<S: Send + Sync + 'static>(&mut self, key: &str) -> StateSlot<S> {
        StateSlot::new(self.register_slot(key, None))
    }

    /// State slot registered under `key`, created from `default` on first
    /// read in each session.
    pub fn slot_with_default<S, F>(&mut self, key: &str, default: F) -> StateSlot<S>
    where
        S: Send + Sync + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let factory: SlotFactory = Arc::new(move || -> SlotValue { Arc::new(default()) });
        StateSlot::new(self.register_slot(key, Some(factory)))
    }

    fn register_slot(&mut self, key: &str, factory: Option<SlotFactory>) -> SlotId {
        let key = self.interner.get_or_intern(key);
        if let Some(&id) = self.slot_keys.get(&key) {
            if let (Some(info), Some(factory)) = (self.slots.get_mut(id.index()), factory) {
                info.factory.get_or_insert(factory);
            }
            return id;
        }
        let id = SlotId::new(self.slots.len());
        self.slots.push(SlotInfo { key, factory });
        self.slot_keys.insert(key, id);
        id
    }

    fn label(&self, id: ParserId) -> String {
        self.names
            .get(id.index())
            .copied()
            .flatten()
            .map_or_else(|| id.to_string(), |key| self.interner.resolve(&key).to_owned())
    }

    /// Link forward references, check the graph and freeze it.
    pub fn build(mut self, root: ParserId) -> Result<Grammar<T, V>, GrammarError> {
        self.validate(root)?;
        self.link()?;
        let grammar = Grammar {
            nodes: self.nodes,
            names: self.names,
            interner: self.interner.into_reader(),
            slots: self.slots,
            memo_tables: self.memo_tables,
            analyzer: self.analyzer,
            root,
        };
        grammar.analyzer.check(&grammar)?;
        debug!(
            nodes = grammar.len(),
            slots = grammar.slot_count(),
            memo_tables = grammar.memo_table_count(),
            root = %grammar.describe(root),
            "grammar built"
        );
        Ok(grammar)
    }

    fn validate(&self, root: ParserId) -> Result<(), GrammarError> {
        let known = |node: ParserId| {
            if node.index() < self.nodes.len() {
                Ok(())
            } else {
                Err(GrammarError::UnknownParser { node })
            }
        };
        known(root)?;
        for node in &self.nodes {
            for child in node.children() {
                known(child)?;
            }
            if let Node::Memo { table, .. } = node {
                if table.index() >= self.memo_tables.len() {
                    return Err(GrammarError::UnknownMemoTable {
                        table: table.index(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Point every reference straight at the first real node of its chain.
    fn link(&mut self) -> Result<(), GrammarError> {
        let mut linked = 0;
        for index in 0..self.nodes.len() {
            if !matches!(self.nodes[index], Node::Ref(_)) {
                continue;
            }
            let declared = ParserId::new(index);
            let mut current = declared;
            let mut hops = 0;
            let resolved = loop {
                match &self.nodes[current.index()] {
                    Node::Ref(Some(next)) => {
                        current = *next;
                        hops += 1;
                        if hops > self.nodes.len() {
                            return Err(GrammarError::ReferenceCycle {
                                name: self.label(declared),
                                node: declared,
                            });
                        }
                    }
                    Node::Ref(None) => {
                        return Err(GrammarError::UndefinedReference {
                            name: self.label(current),
                            node: current,
                        });
                    }
                    _ => break current,
                }
            };
            self.nodes[index] = Node::Ref(Some(resolved));
            if self.names[resolved.index()].is_none() {
                self.names[resolved.index()] = self.names[index];
            }
            linked += 1;
        }
        debug!(references = linked, "forward references linked");
        Ok(())
    }
}

impl<V> GrammarBuilder<char, V> {
    /// The characters of `text`, in order.
    pub fn text(&mut self, text: &str) -> ParserId {
        self.literal(text.chars())
    }

    /// One character in `low..=high`.
    pub fn char_range(&mut self, low: char, high: char) -> ParserId {
        self.class(&format!("{low}-{high}"), move |c| (low..=high).contains(c))
    }

    /// One of the characters of `chars`.
    pub fn one_of(&mut self, chars: &str) -> ParserId {
        let set: Vec<char> = chars.chars().collect();
        self.class(&format!("[{chars}]"), move |c| set.contains(c))
    }
}

impl<T, V> Default for GrammarBuilder<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, V> fmt::Debug for GrammarBuilder<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarBuilder")
            .field("nodes", &self.nodes)
            .field("slots", &self.slots.len())
            .field("memo_tables", &self.memo_tables)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_chain_collapses() {
        let mut g = GrammarBuilder::<char, ()>::new();
        let outer = g.declare("outer");
        let inner = g.declare("inner");
        let a = g.item('a');
        g.define(outer, inner).unwrap();
        g.define(inner, a).unwrap();
        let grammar = g.build(outer).unwrap();
        assert!(matches!(grammar.node(outer), Some(Node::Ref(Some(id))) if *id == a));
        assert_eq!(grammar.name(a), Some("outer"));
    }

    #[test]
    fn test_undefined_reference() {
        let mut g = GrammarBuilder::<char, ()>::new();
        let missing = g.declare("missing");
        let root = g.seq([missing]);
        let error = g.build(root).unwrap_err();
        assert_eq!(
            error,
            GrammarError::UndefinedReference {
                name: "missing".to_string(),
                node: missing
            }
        );
    }

    #[test]
    fn test_reference_cycle() {
        let mut g = GrammarBuilder::<char, ()>::new();
        let a = g.declare("a");
        let b = g.declare("b");
        g.define(a, b).unwrap();
        g.define(b, a).unwrap();
        assert!(matches!(
            g.build(a),
            Err(GrammarError::ReferenceCycle { .. })
        ));
    }

    #[test]
    fn test_define_errors() {
        let mut g = GrammarBuilder::<char, ()>::new();
        let rule = g.declare("rule");
        let a = g.item('a');
        g.define(rule, a).unwrap();
        assert!(matches!(
            g.define(rule, a),
            Err(GrammarError::Redefined { .. })
        ));
        assert_eq!(
            g.define(a, rule),
            Err(GrammarError::NotAReference { node: a })
        );
        assert_eq!(
            g.define(rule, ParserId::new(99)),
            Err(GrammarError::UnknownParser {
                node: ParserId::new(99)
            })
        );
    }

    #[test]
    fn test_same_slot_key_same_handle() {
        let mut g = GrammarBuilder::<char, ()>::new();
        let first: StateSlot<usize> = g.slot("depth");
        let second: StateSlot<usize> = g.slot_with_default("depth", || 0);
        let other: StateSlot<usize> = g.slot("width");
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_unknown_root() {
        let g = GrammarBuilder::<char, ()>::new();
        assert_eq!(
            g.build(ParserId::new(0)).unwrap_err(),
            GrammarError::UnknownParser {
                node: ParserId::new(0)
            }
        );
    }
}
