use crate::error::FatalError;
use crate::input::{InputItem, Span};
use crate::session::{ParseSession, StackValue, StateSlot};
use std::sync::Arc;

/// What a stack action sees when its child has matched.
///
/// `items` are the values the child pushed. For a reduce action they have
/// already been taken off the stack; for predicate and consume actions they
/// are copies and the stack is left untouched.
pub struct ActionContext<'s, 'a, T, V> {
    session: &'s mut ParseSession<'a, T, V>,
    items: Vec<V>,
    span: Span,
}

impl<'s, 'a, T, V> ActionContext<'s, 'a, T, V>
where
    T: InputItem,
    V: StackValue,
{
    pub(crate) fn new(session: &'s mut ParseSession<'a, T, V>, items: Vec<V>, span: Span) -> Self {
        Self {
            session,
            items,
            span,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[V] {
        &self.items
    }

    /// Take ownership of the items, leaving the context empty.
    pub fn take_items(&mut self) -> Vec<V> {
        std::mem::take(&mut self.items)
    }

    /// Input range matched by the child.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Input items matched by the child.
    #[must_use]
    pub fn matched(&self) -> &'a [T] {
        self.span.slice(self.session.input())
    }

    pub fn read<S>(&mut self, slot: &StateSlot<S>) -> Result<Arc<S>, FatalError>
    where
        S: Send + Sync + 'static,
    {
        self.session.read(slot)
    }

    pub fn write<S>(&mut self, slot: &StateSlot<S>, value: S) -> Result<(), FatalError>
    where
        S: Send + Sync + 'static,
    {
        self.session.write(slot, value)
    }

    pub fn session(&mut self) -> &mut ParseSession<'a, T, V> {
        self.session
    }
}

impl<T: InputItem, V: StackValue> ActionContext<'_, '_, T, V> {
    /// Matched characters as a string.
    #[must_use]
    pub fn text(&self) -> String
    where
        T: Copy + Into<char>,
    {
        self.matched().iter().map(|&c| c.into()).collect()
    }
}
