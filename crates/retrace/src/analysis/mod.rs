//! # Well-Formedness Analysis
//!
//! Checks run once, when a grammar is built, to reject graphs that would
//! loop forever at parse time:
//!
//! - **Left recursion**: a node that can reach itself before any input is
//!   consumed.
//! - **Nullable repetition**: an unbounded repetition whose body can match
//!   without consuming input.
//!
//! Both rest on two fixpoints over the (possibly cyclic) graph: which nodes
//! are *nullable*, and which nodes each node may invoke at its own start
//! position (its *first set*).
//!
//! Each analysis looks up its rule for a node in a dispatch table keyed by
//! [`NodeKind`]. Built-in kinds are registered by [`Analyzer::new`]; custom
//! node kinds add theirs with [`Analyzer::register`], usually through
//! [`GrammarBuilder::register_rules`](crate::GrammarBuilder::register_rules).

mod rules;

use crate::error::{AnalysisKind, GrammarError, Violation};
use crate::graph::{Grammar, Node, NodeKind, ParserId};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// Whether a node can match without consuming input.
pub type NullableRule<T, V> = fn(&Node<T, V>, &Facts<'_>) -> bool;

/// Children a node may invoke before it has consumed any input.
pub type FirstRule<T, V> = fn(&Node<T, V>, &Facts<'_>) -> SmallVec<[ParserId; 4]>;

/// Whether a node repeats a body that may match without consuming input.
pub type RepetitionRule<T, V> = fn(&Node<T, V>, &Facts<'_>) -> bool;

/// What the analyses already know while a rule runs.
#[derive(Debug, Clone, Copy)]
pub struct Facts<'f> {
    nullable: &'f [bool],
}

impl Facts<'_> {
    /// Current nullability of `id`. Nodes not yet proven nullable are not.
    #[must_use]
    pub fn is_nullable(&self, id: ParserId) -> bool {
        self.nullable.get(id.index()).copied().unwrap_or(false)
    }
}

/// The three rules of one node kind.
pub struct NodeRules<T, V> {
    pub nullable: NullableRule<T, V>,
    pub first: FirstRule<T, V>,
    pub repetition: RepetitionRule<T, V>,
}

impl<T, V> NodeRules<T, V> {
    /// Rules assumed for a custom kind nobody registered: never nullable,
    /// every child may come first, not a repetition.
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            nullable: |_, _| false,
            first: |node, _| node.children(),
            repetition: |_, _| false,
        }
    }
}

impl<T, V> Clone for NodeRules<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for NodeRules<T, V> {}

impl<T, V> fmt::Debug for NodeRules<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRules").finish_non_exhaustive()
    }
}

type Table<R> = HashMap<NodeKind, R, ahash::RandomState>;

/// Per-analysis dispatch tables.
pub struct Analyzer<T, V> {
    nullable: Table<NullableRule<T, V>>,
    first: Table<FirstRule<T, V>>,
    repetition: Table<RepetitionRule<T, V>>,
}

impl<T, V> Analyzer<T, V> {
    /// An analyzer that knows every built-in node kind.
    #[must_use]
    pub fn new() -> Self {
        let mut analyzer = Self {
            nullable: HashMap::with_hasher(ahash::RandomState::new()),
            first: HashMap::with_hasher(ahash::RandomState::new()),
            repetition: HashMap::with_hasher(ahash::RandomState::new()),
        };
        for kind in NodeKind::BUILTIN {
            analyzer.register(kind, rules::builtin(kind));
        }
        analyzer
    }

    /// Set the rules used for `kind`, replacing earlier ones.
    pub fn register(&mut self, kind: NodeKind, rules: NodeRules<T, V>) {
        self.nullable.insert(kind, rules.nullable);
        self.first.insert(kind, rules.first);
        self.repetition.insert(kind, rules.repetition);
    }

    #[must_use]
    pub fn rules(&self, kind: NodeKind) -> NodeRules<T, V> {
        let opaque = NodeRules::opaque();
        NodeRules {
            nullable: self.nullable.get(&kind).copied().unwrap_or(opaque.nullable),
            first: self.first.get(&kind).copied().unwrap_or(opaque.first),
            repetition: self.repetition.get(&kind).copied().unwrap_or(opaque.repetition),
        }
    }

    /// Run every analysis over `grammar`.
    #[must_use]
    pub fn analyze(&self, grammar: &Grammar<T, V>) -> Analysis {
        let nodes = grammar.nodes();
        let nullable = self.nullable_fixpoint(nodes);
        let facts = Facts {
            nullable: &nullable,
        };
        let edges: Vec<SmallVec<[ParserId; 4]>> = nodes
            .iter()
            .map(|node| (self.rules(node.kind()).first)(node, &facts))
            .collect();
        let first = first_fixpoint(&edges);
        let reachable = reachable(nodes, grammar.root());

        let mut analysis = Analysis {
            nullable,
            first,
            reachable,
            violations: Vec::new(),
        };
        analysis.violations = self.violations(grammar, &analysis);
        analysis
    }

    /// Analyze `grammar` and fail if any reachable node is malformed.
    pub fn check(&self, grammar: &Grammar<T, V>) -> Result<Analysis, GrammarError> {
        let analysis = self.analyze(grammar);
        if analysis.violations.is_empty() {
            debug!(nodes = grammar.len(), "grammar is well-formed");
            Ok(analysis)
        } else {
            debug!(
                violations = analysis.violations.len(),
                "grammar rejected"
            );
            Err(GrammarError::Malformed {
                violations: analysis.violations,
            })
        }
    }

    fn nullable_fixpoint(&self, nodes: &[Node<T, V>]) -> Vec<bool> {
        let rules: Vec<_> = nodes
            .iter()
            .map(|node| self.rules(node.kind()).nullable)
            .collect();
        let mut nullable = vec![false; nodes.len()];
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for (index, node) in nodes.iter().enumerate() {
                if nullable[index] {
                    continue;
                }
                if rules[index](node, &Facts { nullable: &nullable }) {
                    nullable[index] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        debug!(passes, "nullability converged");
        nullable
    }

    fn violations(&self, grammar: &Grammar<T, V>, analysis: &Analysis) -> Vec<Violation> {
        let facts = Facts {
            nullable: &analysis.nullable,
        };
        let violation = |kind: AnalysisKind, node: ParserId| Violation {
            analysis: kind,
            node,
            name: grammar.name(node).map(str::to_owned),
        };
        let mut violations = Vec::new();

        // One report per cycle, naming a rule when the cycle has one.
        let mut reported = vec![false; grammar.len()];
        for index in 0..grammar.len() {
            let id = ParserId::new(index);
            if reported[index] || !analysis.reachable[index] || !analysis.is_left_recursive(id) {
                continue;
            }
            let cycle: Vec<ParserId> = analysis
                .first_set(id)
                .iter()
                .copied()
                .filter(|&other| other == id || analysis.first_set(other).contains(&id))
                .collect();
            for member in &cycle {
                reported[member.index()] = true;
            }
            let representative = cycle
                .iter()
                .copied()
                .find(|&member| grammar.name(member).is_some())
                .unwrap_or(id);
            violations.push(violation(AnalysisKind::LeftRecursion, representative));
        }

        for (index, node) in grammar.nodes().iter().enumerate() {
            if analysis.reachable[index] && (self.rules(node.kind()).repetition)(node, &facts) {
                violations.push(violation(
                    AnalysisKind::NullableRepetition,
                    ParserId::new(index),
                ));
            }
        }
        violations
    }
}

impl<T, V> Default for Analyzer<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> Clone for Analyzer<T, V> {
    fn clone(&self) -> Self {
        Self {
            nullable: self.nullable.clone(),
            first: self.first.clone(),
            repetition: self.repetition.clone(),
        }
    }
}

impl<T, V> fmt::Debug for Analyzer<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("kinds", &self.nullable.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Transitive closure of the first edges, grown until a pass adds nothing.
fn first_fixpoint(edges: &[SmallVec<[ParserId; 4]>]) -> Vec<SmallVec<[ParserId; 8]>> {
    let mut sets: Vec<HashSet<ParserId, ahash::RandomState>> = edges
        .iter()
        .map(|direct| {
            let mut set = HashSet::with_hasher(ahash::RandomState::new());
            set.extend(direct.iter().copied());
            set
        })
        .collect();
    loop {
        let mut changed = false;
        for index in 0..sets.len() {
            let mut additions = Vec::new();
            for &child in &sets[index] {
                if let Some(reachable) = sets.get(child.index()) {
                    additions.extend(reachable.iter().copied());
                }
            }
            for id in additions {
                changed |= sets[index].insert(id);
            }
        }
        if !changed {
            break;
        }
    }
    sets.into_iter()
        .map(|set| {
            let mut sorted: SmallVec<[ParserId; 8]> = set.into_iter().collect();
            sorted.sort_unstable();
            sorted
        })
        .collect()
}

fn reachable<T, V>(nodes: &[Node<T, V>], root: ParserId) -> Vec<bool> {
    let mut seen = vec![false; nodes.len()];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(id.index()) else {
            continue;
        };
        if std::mem::replace(&mut seen[id.index()], true) {
            continue;
        }
        stack.extend(node.children());
    }
    seen
}

/// Results of the fixpoint analyses.
#[derive(Debug, Clone)]
pub struct Analysis {
    nullable: Vec<bool>,
    first: Vec<SmallVec<[ParserId; 8]>>,
    reachable: Vec<bool>,
    violations: Vec<Violation>,
}

impl Analysis {
    #[must_use]
    pub fn is_nullable(&self, id: ParserId) -> bool {
        self.nullable.get(id.index()).copied().unwrap_or(false)
    }

    /// Nodes `id` may invoke before consuming input, sorted.
    #[must_use]
    pub fn first_set(&self, id: ParserId) -> &[ParserId] {
        self.first.get(id.index()).map_or(&[], |set| set.as_slice())
    }

    #[must_use]
    pub fn is_left_recursive(&self, id: ParserId) -> bool {
        self.first_set(id).binary_search(&id).is_ok()
    }

    #[must_use]
    pub fn is_reachable(&self, id: ParserId) -> bool {
        self.reachable.get(id.index()).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}
