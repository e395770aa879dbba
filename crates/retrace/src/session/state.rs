use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased value held by a state slot.
pub type SlotValue = Arc<dyn Any + Send + Sync>;

pub(crate) type SlotFactory = Arc<dyn Fn() -> SlotValue + Send + Sync>;

/// Stable handle of a state slot, assigned by the grammar builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Typed handle to per-session context-sensitive state.
///
/// Slots are registered on the [`GrammarBuilder`](crate::GrammarBuilder)
/// under a string key; every session gets its own value. Values are only
/// changed through [`ParseSession::write`](crate::ParseSession::write), which
/// logs the change so backtracking restores the previous value.
pub struct StateSlot<S> {
    id: SlotId,
    _type: PhantomData<fn() -> S>,
}

impl<S> StateSlot<S> {
    pub(crate) const fn new(id: SlotId) -> Self {
        Self {
            id,
            _type: PhantomData,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SlotId {
        self.id
    }
}

impl<S> Clone for StateSlot<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for StateSlot<S> {}

impl<S> fmt::Debug for StateSlot<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateSlot").field(&self.id.0).finish()
    }
}

impl<S> PartialEq for StateSlot<S> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<S> Eq for StateSlot<S> {}

/// Registration record of a slot inside a grammar.
pub(crate) struct SlotInfo {
    pub(crate) key: lasso::Spur,
    pub(crate) factory: Option<SlotFactory>,
}
