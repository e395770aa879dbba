use crate::session::state::{SlotId, SlotValue};

/// One reversible mutation of session state.
///
/// Every change to the value stack or to a state slot is recorded in the
/// session log as a `SideEffect`. Undoing records in reverse order back to an
/// earlier log length restores the stack and slots exactly; the position is
/// restored separately from the saved [`Snapshot`](crate::Snapshot).
#[derive(Debug, Clone)]
pub enum SideEffect<V> {
    /// A value pushed on top of the stack.
    Push(V),
    /// Values removed from the top of the stack, bottom first.
    Drain(Vec<V>),
    /// A state slot overwritten.
    SlotWrite {
        slot: SlotId,
        previous: Option<SlotValue>,
        next: SlotValue,
    },
}

impl<V: Clone> SideEffect<V> {
    /// Perform the mutation again on the current state and return the record
    /// that undoes it there.
    ///
    /// Used to replay a memoized delta: the replayed record remembers what it
    /// actually removed or overwrote, not what the original did.
    pub(crate) fn replay(&self, stack: &mut Vec<V>, slots: &mut [Option<SlotValue>]) -> Self {
        match self {
            Self::Push(value) => {
                stack.push(value.clone());
                Self::Push(value.clone())
            }
            Self::Drain(items) => {
                let at = stack.len().saturating_sub(items.len());
                Self::Drain(stack.split_off(at))
            }
            Self::SlotWrite { slot, next, .. } => {
                let previous = slots
                    .get_mut(slot.index())
                    .and_then(|cell| cell.replace(next.clone()));
                Self::SlotWrite {
                    slot: *slot,
                    previous,
                    next: next.clone(),
                }
            }
        }
    }

    pub(crate) fn undo(self, stack: &mut Vec<V>, slots: &mut [Option<SlotValue>]) {
        match self {
            Self::Push(_) => {
                stack.pop();
            }
            Self::Drain(items) => stack.extend(items),
            Self::SlotWrite { slot, previous, .. } => {
                if let Some(cell) = slots.get_mut(slot.index()) {
                    *cell = previous;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn slot_value(n: i32) -> SlotValue {
        Arc::new(n)
    }

    fn read(slots: &[Option<SlotValue>]) -> Option<i32> {
        slots[0]
            .as_ref()
            .and_then(|v| v.downcast_ref::<i32>().copied())
    }

    #[test]
    fn test_undo_in_reverse_restores_state() {
        let mut stack = vec![1, 2];
        let mut slots = vec![None];
        let recorded = vec![
            SideEffect::Push(3),
            SideEffect::Drain(vec![2, 3]),
            SideEffect::SlotWrite {
                slot: SlotId::new(0),
                previous: None,
                next: slot_value(9),
            },
            SideEffect::Push(7),
        ];
        let replayed: Vec<_> = recorded
            .iter()
            .map(|effect| effect.replay(&mut stack, &mut slots))
            .collect();
        assert_eq!(stack, vec![1, 7]);
        assert_eq!(read(&slots), Some(9));

        for effect in replayed.into_iter().rev() {
            effect.undo(&mut stack, &mut slots);
        }
        assert_eq!(stack, vec![1, 2]);
        assert_eq!(read(&slots), None);
    }

    #[test]
    fn test_replay_captures_current_slot_value() {
        let mut stack: Vec<i32> = Vec::new();
        let mut slots = vec![Some(slot_value(4))];
        let recorded: SideEffect<i32> = SideEffect::SlotWrite {
            slot: SlotId::new(0),
            previous: None,
            next: slot_value(5),
        };
        let replayed = recorded.replay(&mut stack, &mut slots);
        assert_eq!(read(&slots), Some(5));
        replayed.undo(&mut stack, &mut slots);
        assert_eq!(read(&slots), Some(4));
    }
}
