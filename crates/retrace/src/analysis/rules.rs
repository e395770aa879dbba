//! Analysis rules of the built-in node kinds.

use crate::analysis::{Facts, FirstRule, NodeRules, NullableRule, RepetitionRule};
use crate::graph::{Node, NodeKind, ParserId, TrailingSeparator};
use smallvec::{SmallVec, smallvec};

pub(super) fn builtin<T, V>(kind: NodeKind) -> NodeRules<T, V> {
    match kind {
        NodeKind::Any | NodeKind::Item | NodeKind::Class => rules(never, nothing_first, never),
        NodeKind::Literal => rules(empty_literal, nothing_first, never),
        NodeKind::Empty | NodeKind::End => rules(always, nothing_first, never),
        NodeKind::Seq => rules(seq_nullable, seq_first, never),
        NodeKind::Choice | NodeKind::Longest => rules(any_child_nullable, every_child, never),
        NodeKind::Repeat => rules(repeat_nullable, every_child, repeat_unguarded),
        NodeKind::Opt | NodeKind::Lookahead | NodeKind::Not => rules(always, every_child, never),
        NodeKind::Around => rules(around_nullable, around_first, around_unguarded),
        NodeKind::LeftAssoc | NodeKind::RightAssoc => {
            rules(assoc_nullable, assoc_first, assoc_unguarded)
        }
        NodeKind::Memo | NodeKind::Action | NodeKind::Ref => {
            rules(child_nullable, every_child, never)
        }
        NodeKind::Custom(_) => NodeRules::opaque(),
    }
}

fn rules<T, V>(
    nullable: NullableRule<T, V>,
    first: FirstRule<T, V>,
    repetition: RepetitionRule<T, V>,
) -> NodeRules<T, V> {
    NodeRules {
        nullable,
        first,
        repetition,
    }
}

fn never<T, V>(_: &Node<T, V>, _: &Facts<'_>) -> bool {
    false
}

fn always<T, V>(_: &Node<T, V>, _: &Facts<'_>) -> bool {
    true
}

fn nothing_first<T, V>(_: &Node<T, V>, _: &Facts<'_>) -> SmallVec<[ParserId; 4]> {
    SmallVec::new()
}

fn every_child<T, V>(node: &Node<T, V>, _: &Facts<'_>) -> SmallVec<[ParserId; 4]> {
    node.children()
}

fn empty_literal<T, V>(node: &Node<T, V>, _: &Facts<'_>) -> bool {
    matches!(node, Node::Literal(items) if items.is_empty())
}

fn child_nullable<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    node.children()
        .first()
        .is_some_and(|&child| facts.is_nullable(child))
}

fn seq_nullable<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    let Node::Seq(children) = node else {
        return false;
    };
    children.iter().all(|&child| facts.is_nullable(child))
}

/// Children up to and including the first one that must consume input.
fn seq_first<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> SmallVec<[ParserId; 4]> {
    let Node::Seq(children) = node else {
        return SmallVec::new();
    };
    let mut first = SmallVec::new();
    for &child in children {
        first.push(child);
        if !facts.is_nullable(child) {
            break;
        }
    }
    first
}

fn any_child_nullable<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    node.children().iter().any(|&child| facts.is_nullable(child))
}

fn repeat_nullable<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    let Node::Repeat { child, min, .. } = node else {
        return false;
    };
    *min == 0 || facts.is_nullable(*child)
}

/// Only an unbounded repetition can spin on an empty match.
fn repeat_unguarded<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    let Node::Repeat { child, max, .. } = node else {
        return false;
    };
    max.is_none() && facts.is_nullable(*child)
}

fn around_nullable<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    let Node::Around {
        item,
        separator,
        min,
        trailing,
    } = node
    else {
        return false;
    };
    if *min == 0 {
        return true;
    }
    if !facts.is_nullable(*item) {
        return false;
    }
    // `min` items need `min - 1` separators, plus one more when a trailing
    // separator is required.
    let separators_needed = match trailing {
        TrailingSeparator::Require => *min,
        TrailingSeparator::Forbid | TrailingSeparator::Allow => min - 1,
    };
    separators_needed == 0 || facts.is_nullable(*separator)
}

fn around_first<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> SmallVec<[ParserId; 4]> {
    let Node::Around {
        item, separator, ..
    } = node
    else {
        return SmallVec::new();
    };
    if facts.is_nullable(*item) {
        smallvec![*item, *separator]
    } else {
        smallvec![*item]
    }
}

fn around_unguarded<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    let Node::Around {
        item, separator, ..
    } = node
    else {
        return false;
    };
    facts.is_nullable(*item) && facts.is_nullable(*separator)
}

fn assoc_parts<T, V>(node: &Node<T, V>) -> Option<(ParserId, SmallVec<[ParserId; 4]>)> {
    match node {
        Node::LeftAssoc { operand, operators } | Node::RightAssoc { operand, operators } => {
            Some((*operand, operators.iter().map(|row| row.operator).collect()))
        }
        _ => None,
    }
}

fn assoc_nullable<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    assoc_parts(node).is_some_and(|(operand, _)| facts.is_nullable(operand))
}

fn assoc_first<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> SmallVec<[ParserId; 4]> {
    let Some((operand, operators)) = assoc_parts(node) else {
        return SmallVec::new();
    };
    let mut first = smallvec![operand];
    if facts.is_nullable(operand) {
        first.extend(operators);
    }
    first
}

/// An operator row loops forever if both the operator and the operand can
/// match empty.
fn assoc_unguarded<T, V>(node: &Node<T, V>, facts: &Facts<'_>) -> bool {
    assoc_parts(node).is_some_and(|(operand, operators)| {
        facts.is_nullable(operand) && operators.iter().any(|&op| facts.is_nullable(op))
    })
}
