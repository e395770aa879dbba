//! # Memoization
//!
//! A [`Node::Memo`](crate::Node::Memo) wrapper caches the outcome of its
//! child at a start position: the end position (or a failure marker) and
//! the side effects the child logged. On a hit the outcome is replayed
//! without running the child again.
//!
//! Two interchangeable [`Memoizer`]s are provided:
//!
//! - [`BoundedCache`]: a fixed ring of recent entries. Memory is constant;
//!   old positions are forgotten.
//! - [`RobinHoodTable`]: an open-addressed table that grows with the input
//!   and never forgets.
//!
//! Memoization never changes what a grammar accepts, where a match ends or
//! what it leaves on the value stack. Turning it off with
//! [`ParseConfig::memoization`](crate::ParseConfig::memoization) only
//! changes how long the parse takes.

mod bounded;
mod table;

pub use bounded::BoundedCache;
pub use table::RobinHoodTable;

use crate::graph::ParserId;
use crate::session::{SideEffect, StackValue};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Storage for memoized parse outcomes.
///
/// A memoizer is owned by one session at a time. It is `Send` so an embedder
/// can move it between sessions (see
/// [`ParseSession::take_memoizer`](crate::ParseSession::take_memoizer)), but
/// sharing one between concurrent sessions needs external locking.
pub trait Memoizer<V>: Send {
    /// Store `entry`, replacing any entry with the same key.
    fn memoize(&mut self, entry: MemoEntry<V>);

    /// Entry stored for the key, if it is still held.
    fn get(
        &self,
        node: ParserId,
        start: usize,
        context: Option<&MemoContext>,
    ) -> Option<MemoEntry<V>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// A memoized outcome.
#[derive(Debug, Clone)]
pub struct MemoEntry<V> {
    pub node: ParserId,
    pub start: usize,
    /// End of the match; `None` records a failed match.
    pub end: Option<usize>,
    /// Side effects logged by the match, oldest first. Always empty for a
    /// failed match.
    pub delta: Arc<[SideEffect<V>]>,
    pub context: Option<MemoContext>,
    /// Furthest failure the match recorded outside any negative lookahead
    /// of its own; 0 if none. Replayed on every hit.
    pub furthest: usize,
}

impl<V> MemoEntry<V> {
    #[must_use]
    pub fn success(
        node: ParserId,
        start: usize,
        end: usize,
        delta: Arc<[SideEffect<V>]>,
        context: Option<MemoContext>,
    ) -> Self {
        Self {
            node,
            start,
            end: Some(end),
            delta,
            context,
            furthest: 0,
        }
    }

    #[must_use]
    pub fn failure(node: ParserId, start: usize, context: Option<MemoContext>) -> Self {
        Self {
            node,
            start,
            end: None,
            delta: Arc::from(Vec::new()),
            context,
            furthest: 0,
        }
    }

    #[must_use]
    pub fn reaching(mut self, furthest: usize) -> Self {
        self.furthest = furthest;
        self
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.end.is_some()
    }

    /// Whether this entry answers a lookup for the given key.
    #[must_use]
    pub fn same_key(
        &self,
        node: ParserId,
        start: usize,
        context: Option<&MemoContext>,
        distinguish_nodes: bool,
    ) -> bool {
        self.start == start
            && (!distinguish_nodes || self.node == node)
            && self.context.as_ref() == context
    }
}

/// Value a context-sensitive memo node adds to its cache key.
///
/// Implemented for every `Eq + Hash + Debug + Send + Sync` type. Two values
/// are equal only if they have the same concrete type.
pub trait ContextValue: Any + fmt::Debug + Send + Sync {
    fn eq_dyn(&self, other: &dyn ContextValue) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
}

impl<X> ContextValue for X
where
    X: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn eq_dyn(&self, other: &dyn ContextValue) -> bool {
        other.as_any().downcast_ref::<X>() == Some(self)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<X>().hash(&mut state);
        self.hash(&mut state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared, type-erased memo context.
#[derive(Clone)]
pub struct MemoContext(Arc<dyn ContextValue>);

impl MemoContext {
    pub fn new<X: ContextValue>(value: X) -> Self {
        Self(Arc::new(value))
    }

    #[must_use]
    pub fn downcast_ref<X: 'static>(&self) -> Option<&X> {
        self.0.as_ref().as_any().downcast_ref::<X>()
    }

    fn hash64(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.0.as_ref().hash_dyn(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for MemoContext {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().eq_dyn(other.0.as_ref())
    }
}

impl Eq for MemoContext {}

impl fmt::Debug for MemoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MemoContext").field(&self.0).finish()
    }
}

/// Handle of a memo table registered on the grammar builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoTableId(u32);

impl MemoTableId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which memoizer a table uses, and how it is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum MemoStrategy {
    /// A [`BoundedCache`] holding the `slots` most recent entries.
    Bounded {
        slots: usize,
        distinguish_nodes: bool,
    },
    /// A [`RobinHoodTable`] starting at `capacity` slots.
    Table {
        capacity: usize,
        distinguish_nodes: bool,
    },
}

impl MemoStrategy {
    pub const DEFAULT_BOUNDED_SLOTS: usize = 32;
    pub const DEFAULT_TABLE_CAPACITY: usize = 64;

    #[must_use]
    pub const fn bounded(slots: usize) -> Self {
        Self::Bounded {
            slots,
            distinguish_nodes: true,
        }
    }

    #[must_use]
    pub const fn table(capacity: usize) -> Self {
        Self::Table {
            capacity,
            distinguish_nodes: true,
        }
    }

    /// Key entries on position and context only.
    ///
    /// Only sound for a table used by a single memo node.
    #[must_use]
    pub const fn ignoring_nodes(self) -> Self {
        match self {
            Self::Bounded { slots, .. } => Self::Bounded {
                slots,
                distinguish_nodes: false,
            },
            Self::Table { capacity, .. } => Self::Table {
                capacity,
                distinguish_nodes: false,
            },
        }
    }

    #[must_use]
    pub fn build<V: StackValue>(self) -> Box<dyn Memoizer<V>> {
        match self {
            Self::Bounded {
                slots,
                distinguish_nodes,
            } => Box::new(BoundedCache::new(slots, distinguish_nodes)),
            Self::Table {
                capacity,
                distinguish_nodes,
            } => Box::new(RobinHoodTable::new(capacity, distinguish_nodes)),
        }
    }
}

impl Default for MemoStrategy {
    fn default() -> Self {
        Self::table(Self::DEFAULT_TABLE_CAPACITY)
    }
}

/// Hash of a memo key; never zero.
pub(crate) fn key_hash(
    node: Option<ParserId>,
    start: usize,
    context: Option<&MemoContext>,
) -> u64 {
    let mut hasher = ahash::AHasher::default();
    (start as u64).wrapping_add(1).hash(&mut hasher);
    if let Some(node) = node {
        node.raw().hash(&mut hasher);
    }
    if let Some(context) = context {
        context.hash64().hash(&mut hasher);
    }
    match hasher.finish() {
        0 => 1,
        hash => hash,
    }
}
