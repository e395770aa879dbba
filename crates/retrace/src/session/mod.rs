//! # Parse Sessions
//!
//! A [`ParseSession`] is the mutable half of a parse: the position cursor,
//! the value stack, the reversible side-effect log, the furthest-failure
//! mark, per-session state slot values and memo tables. The grammar it runs
//! is shared and immutable; the session is owned by exactly one thread.
//!
//! Everything that mutates the stack or a slot goes through the log, so
//! [`ParseSession::restore`] can rewind to any earlier [`Snapshot`].

mod action;
mod log;
mod state;

pub use action::ActionContext;
pub use log::SideEffect;
pub use state::{SlotId, SlotValue, StateSlot};
pub(crate) use state::{SlotFactory, SlotInfo};

use crate::engine::ParseConfig;
use crate::error::FatalError;
use crate::graph::Grammar;
use crate::input::InputItem;
use crate::memo::{MemoTableId, Memoizer};
use std::fmt;
use std::sync::Arc;

/// Bound satisfied by every value type the value stack can hold.
pub trait StackValue: Clone + fmt::Debug + Send + Sync + 'static {}

impl<V> StackValue for V where V: Clone + fmt::Debug + Send + Sync + 'static {}

/// Saved position and log length, enough to rewind a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pos: usize,
    log_len: usize,
}

impl Snapshot {
    #[must_use]
    pub const fn pos(self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn log_len(self) -> usize {
        self.log_len
    }
}

/// Per-invocation parse state over a shared [`Grammar`].
pub struct ParseSession<'a, T, V> {
    pub(crate) grammar: &'a Grammar<T, V>,
    pub(crate) input: &'a [T],
    pub(crate) config: ParseConfig,
    pub(crate) pos: usize,
    pub(crate) stack: Vec<V>,
    pub(crate) log: Vec<SideEffect<V>>,
    pub(crate) furthest: usize,
    /// Nesting depth of negative lookaheads; failures under one are expected.
    pub(crate) silenced: usize,
    /// Furthest failure recorded by the innermost running memo child at
    /// `reach_depth`, the nesting depth of `Not` it started under.
    pub(crate) reach: usize,
    pub(crate) reach_depth: usize,
    slots: Vec<Option<SlotValue>>,
    memos: Vec<Option<Box<dyn Memoizer<V>>>>,
}

impl<'a, T, V> ParseSession<'a, T, V>
where
    T: InputItem,
    V: StackValue,
{
    /// Create a session at position 0 with an empty stack, unset slots and
    /// no memoizers yet.
    #[must_use]
    pub fn new(grammar: &'a Grammar<T, V>, input: &'a [T], config: ParseConfig) -> Self {
        Self {
            grammar,
            input,
            config,
            pos: 0,
            stack: Vec::new(),
            log: Vec::new(),
            furthest: 0,
            silenced: 0,
            reach: 0,
            reach_depth: 0,
            slots: vec![None; grammar.slot_count()],
            memos: (0..grammar.memo_table_count()).map(|_| None).collect(),
        }
    }

    /// Grammar this session runs.
    #[must_use]
    pub const fn grammar(&self) -> &'a Grammar<T, V> {
        self.grammar
    }

    /// Whole input, independent of the current position.
    #[must_use]
    pub const fn input(&self) -> &'a [T] {
        self.input
    }

    #[must_use]
    pub const fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Current position, in items.
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Positions past the end of input are clamped.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    /// Move the cursor forward by `count` items, stopping at the end.
    pub fn advance(&mut self, count: usize) {
        self.set_pos(self.pos.saturating_add(count));
    }

    /// Item at the current position.
    #[must_use]
    pub fn peek(&self) -> Option<&'a T> {
        self.input.get(self.pos)
    }

    /// Input from the current position on.
    #[must_use]
    pub fn remaining(&self) -> &'a [T] {
        self.input.get(self.pos..).unwrap_or(&[])
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Value stack, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[V] {
        &self.stack
    }

    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Push a value, logging it.
    pub fn push(&mut self, value: V) {
        self.stack.push(value.clone());
        self.log.push(SideEffect::Push(value));
    }

    /// Remove every value above `index`, logging the removal.
    pub fn drain_from(&mut self, index: usize) -> Vec<V> {
        let index = index.min(self.stack.len());
        let items = self.stack.split_off(index);
        if !items.is_empty() {
            self.log.push(SideEffect::Drain(items.clone()));
        }
        items
    }

    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Side effects logged since the start of the run, oldest first.
    #[must_use]
    pub fn log(&self) -> &[SideEffect<V>] {
        &self.log
    }

    /// Capture the position and log length for a later [`restore`](Self::restore).
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            log_len: self.log.len(),
        }
    }

    /// Undo every logged effect since `snapshot` and reset the position.
    pub fn restore(&mut self, snapshot: Snapshot) {
        if self.log.len() > snapshot.log_len {
            for effect in self.log.drain(snapshot.log_len..).rev() {
                effect.undo(&mut self.stack, &mut self.slots);
            }
        }
        self.pos = snapshot.pos;
    }

    /// Forget everything a previous run left behind except the memoizers.
    pub(crate) fn reset(&mut self) {
        self.pos = 0;
        self.stack.clear();
        self.log.clear();
        self.furthest = 0;
        self.silenced = 0;
        self.reach = 0;
        self.reach_depth = 0;
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Re-apply a recorded delta on top of the log.
    pub(crate) fn replay(&mut self, delta: &[SideEffect<V>]) {
        for effect in delta {
            let replayed = effect.replay(&mut self.stack, &mut self.slots);
            self.log.push(replayed);
        }
    }

    /// Furthest position at which a match failed outside a negative
    /// lookahead.
    #[must_use]
    pub const fn furthest_failure(&self) -> usize {
        self.furthest
    }

    /// Note that a match was attempted and failed at `pos`.
    pub fn record_failure(&mut self, pos: usize) {
        if self.silenced == 0 && pos > self.furthest {
            self.furthest = pos;
        }
        if self.silenced == self.reach_depth && pos > self.reach {
            self.reach = pos;
        }
    }

    /// Current value of `slot`, creating it from the slot's default on first
    /// access in this session.
    pub fn read<S>(&mut self, slot: &StateSlot<S>) -> Result<Arc<S>, FatalError>
    where
        S: Send + Sync + 'static,
    {
        let index = slot.id().index();
        let Some(cell) = self.slots.get(index) else {
            return Err(FatalError::UnknownSlot { slot: index });
        };
        let value = match cell {
            Some(value) => Arc::clone(value),
            None => {
                let Some(factory) = self.grammar.slot_factory(slot.id()) else {
                    return Err(FatalError::UnsetSlot {
                        key: self.grammar.slot_key(slot.id()).to_owned(),
                    });
                };
                let value = factory();
                self.slots[index] = Some(Arc::clone(&value));
                value
            }
        };
        value.downcast::<S>().map_err(|_| FatalError::SlotType {
            key: self.grammar.slot_key(slot.id()).to_owned(),
        })
    }

    /// Overwrite `slot`, logging the previous value.
    pub fn write<S>(&mut self, slot: &StateSlot<S>, value: S) -> Result<(), FatalError>
    where
        S: Send + Sync + 'static,
    {
        let index = slot.id().index();
        let Some(cell) = self.slots.get_mut(index) else {
            return Err(FatalError::UnknownSlot { slot: index });
        };
        let next: SlotValue = Arc::new(value);
        let previous = cell.replace(Arc::clone(&next));
        self.log.push(SideEffect::SlotWrite {
            slot: slot.id(),
            previous,
            next,
        });
        Ok(())
    }

    /// Replace the value of `slot` with `f` applied to it, logging the write.
    pub fn update<S, F>(&mut self, slot: &StateSlot<S>, f: F) -> Result<(), FatalError>
    where
        S: Send + Sync + 'static,
        F: FnOnce(&S) -> S,
    {
        let current = self.read(slot)?;
        self.write(slot, f(&current))
    }

    /// Use `memoizer` for `table` instead of a fresh session-scoped one.
    ///
    /// Together with [`take_memoizer`](Self::take_memoizer) this lets an
    /// embedder carry memo tables across parse calls.
    pub fn install_memoizer(&mut self, table: MemoTableId, memoizer: Box<dyn Memoizer<V>>) {
        if let Some(cell) = self.memos.get_mut(table.index()) {
            *cell = Some(memoizer);
        }
    }

    /// Remove the memoizer of `table`, leaving the session to build a fresh
    /// one if the table is used again.
    pub fn take_memoizer(&mut self, table: MemoTableId) -> Option<Box<dyn Memoizer<V>>> {
        self.memos.get_mut(table.index()).and_then(Option::take)
    }

    pub(crate) fn memoizer(&mut self, table: MemoTableId) -> Option<&mut Box<dyn Memoizer<V>>> {
        let strategy = self.grammar.memo_strategy(table)?;
        let cell = self.memos.get_mut(table.index())?;
        Some(cell.get_or_insert_with(|| strategy.build()))
    }
}

impl<T, V: fmt::Debug> fmt::Debug for ParseSession<'_, T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseSession")
            .field("pos", &self.pos)
            .field("input_len", &self.input.len())
            .field("stack", &self.stack)
            .field("log_len", &self.log.len())
            .field("furthest", &self.furthest)
            .finish_non_exhaustive()
    }
}
