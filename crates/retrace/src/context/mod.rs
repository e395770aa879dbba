//! # Context-Sensitive Nodes
//!
//! Ready-made custom nodes that carry information from one part of the
//! input to a later one through [state slots](crate::StateSlot). Slot
//! writes are logged, so backtracking past one of these nodes forgets what
//! it stored.
//!
//! - [`learn`] / [`recall`]: match a construct, then require the same items
//!   again later (closing tags, heredoc terminators).
//! - [`count`] / [`repeat_counted`]: count repetitions of one construct, then
//!   require exactly as many repetitions of another.
//!
//! Nodes that share a key share a slot. Reading a slot nothing has written
//! yet is a [`FatalError::UnsetSlot`].

use crate::analysis::NodeRules;
use crate::error::FatalError;
use crate::graph::{CustomParser, GrammarBuilder, ParserId};
use crate::input::InputItem;
use crate::session::{ParseSession, StackValue, StateSlot};
use smallvec::{SmallVec, smallvec};

pub const LEARN: &str = "learn";
pub const RECALL: &str = "recall";
pub const COUNT: &str = "count";
pub const REPEAT_COUNTED: &str = "repeat_counted";

/// Stores the items matched by `child` in its slot.
#[derive(Debug)]
pub struct Learn<T> {
    child: ParserId,
    slot: StateSlot<Vec<T>>,
}

/// Matches exactly the items last stored by a [`Learn`] with the same slot.
#[derive(Debug)]
pub struct Recall<T> {
    slot: StateSlot<Vec<T>>,
}

/// Matches `child` as often as possible and stores the number of matches.
#[derive(Debug)]
pub struct Count {
    child: ParserId,
    slot: StateSlot<usize>,
}

/// Matches `child` exactly as many times as the slot says.
#[derive(Debug)]
pub struct RepeatCounted {
    child: ParserId,
    slot: StateSlot<usize>,
}

impl<T, V> CustomParser<T, V> for Learn<T>
where
    T: InputItem,
    V: StackValue,
{
    fn kind(&self) -> &'static str {
        LEARN
    }

    fn children(&self) -> SmallVec<[ParserId; 4]> {
        smallvec![self.child]
    }

    fn parse(&self, session: &mut ParseSession<'_, T, V>) -> Result<bool, FatalError> {
        let start = session.pos();
        if !session.attempt(self.child)? {
            return Ok(false);
        }
        let learned = session
            .input()
            .get(start..session.pos())
            .unwrap_or_default()
            .to_vec();
        session.write(&self.slot, learned)?;
        Ok(true)
    }
}

impl<T, V> CustomParser<T, V> for Recall<T>
where
    T: InputItem,
    V: StackValue,
{
    fn kind(&self) -> &'static str {
        RECALL
    }

    fn parse(&self, session: &mut ParseSession<'_, T, V>) -> Result<bool, FatalError> {
        let learned = session.read(&self.slot)?;
        let rest = session.remaining();
        for (offset, expected) in learned.iter().enumerate() {
            if rest.get(offset) != Some(expected) {
                session.record_failure(session.pos() + offset);
                return Ok(false);
            }
        }
        session.advance(learned.len());
        Ok(true)
    }
}

impl<T, V> CustomParser<T, V> for Count
where
    T: InputItem,
    V: StackValue,
{
    fn kind(&self) -> &'static str {
        COUNT
    }

    fn children(&self) -> SmallVec<[ParserId; 4]> {
        smallvec![self.child]
    }

    fn parse(&self, session: &mut ParseSession<'_, T, V>) -> Result<bool, FatalError> {
        let mut matches = 0_usize;
        loop {
            let before = session.pos();
            if !session.attempt(self.child)? || session.pos() == before {
                break;
            }
            matches += 1;
        }
        session.write(&self.slot, matches)?;
        Ok(true)
    }
}

impl<T, V> CustomParser<T, V> for RepeatCounted
where
    T: InputItem,
    V: StackValue,
{
    fn kind(&self) -> &'static str {
        REPEAT_COUNTED
    }

    fn children(&self) -> SmallVec<[ParserId; 4]> {
        smallvec![self.child]
    }

    fn parse(&self, session: &mut ParseSession<'_, T, V>) -> Result<bool, FatalError> {
        let times = *session.read(&self.slot)?;
        for _ in 0..times {
            if !session.attempt(self.child)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Register the analysis rules of the nodes in this module on `builder`.
///
/// The helper functions below call this themselves.
pub fn register_rules<T: InputItem, V: StackValue>(builder: &mut GrammarBuilder<T, V>) {
    let opaque = NodeRules::<T, V>::opaque();
    builder.register_rules(
        LEARN,
        NodeRules {
            nullable: |node, facts| node.children().iter().all(|&c| facts.is_nullable(c)),
            ..opaque
        },
    );
    // The learned items may be empty.
    builder.register_rules(
        RECALL,
        NodeRules {
            nullable: |_, _| true,
            ..opaque
        },
    );
    builder.register_rules(
        COUNT,
        NodeRules {
            nullable: |_, _| true,
            repetition: |node, facts| node.children().iter().any(|&c| facts.is_nullable(c)),
            ..opaque
        },
    );
    // Bounded by the stored count, so a nullable body cannot spin.
    builder.register_rules(
        REPEAT_COUNTED,
        NodeRules {
            nullable: |_, _| true,
            ..opaque
        },
    );
}

/// Match `child` and remember what it matched under `key`.
pub fn learn<T: InputItem, V: StackValue>(
    builder: &mut GrammarBuilder<T, V>,
    child: ParserId,
    key: &str,
) -> ParserId {
    register_rules(builder);
    let slot = builder.slot(key);
    builder.custom(Learn { child, slot })
}

/// Match the items last learned under `key`.
pub fn recall<T: InputItem, V: StackValue>(
    builder: &mut GrammarBuilder<T, V>,
    key: &str,
) -> ParserId {
    register_rules(builder);
    let slot = builder.slot(key);
    builder.custom(Recall { slot })
}

/// Match `child` zero or more times and remember how often under `key`.
pub fn count<T: InputItem, V: StackValue>(
    builder: &mut GrammarBuilder<T, V>,
    child: ParserId,
    key: &str,
) -> ParserId {
    register_rules(builder);
    let slot = builder.slot(key);
    builder.custom(Count { child, slot })
}

/// Match `child` exactly as often as last counted under `key`.
pub fn repeat_counted<T: InputItem, V: StackValue>(
    builder: &mut GrammarBuilder<T, V>,
    child: ParserId,
    key: &str,
) -> ParserId {
    register_rules(builder);
    let slot = builder.slot(key);
    builder.custom(RepeatCounted { child, slot })
}
