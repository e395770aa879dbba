//! # Backtracking Engine
//!
//! Runs a [`Grammar`](crate::Grammar) over an input inside a
//! [`ParseSession`].
//!
//! Every node is entered through [`ParseSession::attempt`]. It takes a
//! snapshot first and restores it if the node does not match, so a failed
//! node never leaves values on the stack, moved input or changed state
//! slots behind. Composite nodes therefore only have to decide whether they
//! matched; custom nodes get the same guarantee for free.
//!
//! Fatal errors are not failures: they travel up through every combinator
//! with `?` and end the parse without any further backtracking.

mod assoc;
mod config;
mod result;

pub use config::ParseConfig;
pub use result::ParseResult;

use crate::error::FatalError;
use crate::graph::{Node, ParserId, StackAction, TrailingSeparator};
use crate::input::{InputItem, Span};
use crate::memo::{MemoContext, MemoEntry, MemoTableId};
use crate::session::{ActionContext, ParseSession, StackValue};
use std::sync::Arc;
use tracing::{debug, trace};

impl<'a, T, V> ParseSession<'a, T, V>
where
    T: InputItem,
    V: StackValue,
{
    /// Run node `id` at the current position.
    ///
    /// `Ok(true)` leaves the position after the match and the node's effects
    /// in place. `Ok(false)` leaves the session exactly as it was before the
    /// call.
    pub fn attempt(&mut self, id: ParserId) -> Result<bool, FatalError> {
        let snapshot = self.snapshot();
        let matched = self.dispatch(id)?;
        if !matched {
            self.restore(snapshot);
        }
        Ok(matched)
    }

    /// Parse from position 0 with `root` and report the outcome.
    ///
    /// Each run starts from an empty stack, log and failure mark, with every
    /// state slot unset. Installed memoizers are kept, so a second run over
    /// the same input can reuse the first run's entries.
    pub fn run(&mut self, root: ParserId) -> Result<ParseResult<V>, FatalError> {
        debug!(root = %self.grammar.describe(root), input_len = self.input.len(), "parse started");
        self.reset();
        let matched = self.attempt(root)?;
        let end = self.pos;
        if matched && end < self.input.len() {
            self.record_failure(end);
        }
        let full_match =
            matched && (!self.config.require_full_match || end == self.input.len());
        debug!(
            matched,
            full_match,
            end,
            furthest = self.furthest,
            "parse finished"
        );
        Ok(ParseResult {
            full_match,
            matched,
            end_position: if matched { end } else { 0 },
            furthest_failure: self.furthest,
            stack: self.stack.clone(),
        })
    }

    fn dispatch(&mut self, id: ParserId) -> Result<bool, FatalError> {
        let grammar = self.grammar;
        let Some(node) = grammar.node(id) else {
            return Err(FatalError::UnknownParser { node: id });
        };
        match node {
            Node::Empty => Ok(true),
            Node::Any => Ok(self.match_item(|_| true)),
            Node::End => {
                if self.at_end() {
                    Ok(true)
                } else {
                    self.record_failure(self.pos);
                    Ok(false)
                }
            }
            Node::Item(expected) => Ok(self.match_item(|item| item == expected)),
            Node::Class { test, .. } => Ok(self.match_item(|item| test(item))),
            Node::Literal(items) => Ok(self.match_literal(items)),
            Node::Seq(children) => {
                for &child in children {
                    if !self.attempt(child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Choice(children) => {
                for &child in children {
                    if self.attempt(child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Longest(children) => self.longest(children),
            Node::Repeat { child, min, max } => self.repeat(*child, *min, *max),
            Node::Opt(child) => {
                self.attempt(*child)?;
                Ok(true)
            }
            Node::Around {
                item,
                separator,
                min,
                trailing,
            } => self.around(*item, *separator, *min, *trailing),
            Node::Lookahead(child) => {
                let snapshot = self.snapshot();
                let matched = self.attempt(*child)?;
                self.restore(snapshot);
                Ok(matched)
            }
            Node::Not(child) => {
                let snapshot = self.snapshot();
                self.silenced += 1;
                let matched = self.attempt(*child);
                self.silenced -= 1;
                let matched = matched?;
                self.restore(snapshot);
                if matched {
                    self.record_failure(self.pos);
                }
                Ok(!matched)
            }
            Node::LeftAssoc { operand, operators } => self.left_assoc(*operand, operators),
            Node::RightAssoc { operand, operators } => self.right_assoc(*operand, operators),
            Node::Memo {
                child,
                table,
                context,
            } => {
                if !self.config.memoization {
                    return self.attempt(*child);
                }
                let context = match context {
                    Some(context) => context(self)?,
                    None => None,
                };
                self.memoized(id, *child, *table, context)
            }
            Node::Action { child, action } => self.action(*child, action),
            Node::Ref(Some(target)) => self.dispatch(*target),
            Node::Ref(None) => Err(FatalError::UnknownParser { node: id }),
            Node::Custom(custom) => custom.parse(self),
        }
    }

    fn match_item(&mut self, accept: impl FnOnce(&T) -> bool) -> bool {
        match self.peek() {
            Some(item) if accept(item) => {
                self.pos += 1;
                true
            }
            _ => {
                self.record_failure(self.pos);
                false
            }
        }
    }

    fn match_literal(&mut self, items: &[T]) -> bool {
        let rest = self.remaining();
        for (offset, expected) in items.iter().enumerate() {
            if rest.get(offset) != Some(expected) {
                self.record_failure(self.pos + offset);
                return false;
            }
        }
        self.pos += items.len();
        true
    }

    fn longest(&mut self, children: &[ParserId]) -> Result<bool, FatalError> {
        let mut best: Option<(usize, Vec<_>)> = None;
        for &child in children {
            let snapshot = self.snapshot();
            if !self.attempt(child)? {
                continue;
            }
            if best.as_ref().is_none_or(|(end, _)| self.pos > *end) {
                best = Some((self.pos, self.log[snapshot.log_len()..].to_vec()));
            }
            self.restore(snapshot);
        }
        let Some((end, delta)) = best else {
            return Ok(false);
        };
        self.replay(&delta);
        self.pos = end;
        Ok(true)
    }

    fn repeat(
        &mut self,
        child: ParserId,
        min: usize,
        max: Option<usize>,
    ) -> Result<bool, FatalError> {
        let mut count = 0;
        while max.is_none_or(|max| count < max) {
            let before = self.pos;
            if !self.attempt(child)? {
                break;
            }
            count += 1;
            if self.pos == before {
                // The remaining mandatory rounds would match empty too.
                count = count.max(min);
                break;
            }
        }
        Ok(count >= min)
    }

    fn around(
        &mut self,
        item: ParserId,
        separator: ParserId,
        min: usize,
        trailing: TrailingSeparator,
    ) -> Result<bool, FatalError> {
        if !self.attempt(item)? {
            return Ok(min == 0);
        }
        let mut count = 1;
        let mut dangling = false;
        loop {
            let before = self.snapshot();
            if !self.attempt(separator)? {
                break;
            }
            if self.attempt(item)? {
                count += 1;
                if self.pos == before.pos() {
                    break;
                }
                continue;
            }
            match trailing {
                TrailingSeparator::Forbid => self.restore(before),
                TrailingSeparator::Allow | TrailingSeparator::Require => dangling = true,
            }
            break;
        }
        if trailing == TrailingSeparator::Require && !dangling {
            self.record_failure(self.pos);
            return Ok(false);
        }
        Ok(count >= min)
    }

    fn memoized(
        &mut self,
        id: ParserId,
        child: ParserId,
        table: MemoTableId,
        context: Option<MemoContext>,
    ) -> Result<bool, FatalError> {
        let start = self.pos;
        let Some(memoizer) = self.memoizer(table) else {
            return self.attempt(child);
        };
        if let Some(entry) = memoizer.get(id, start, context.as_ref()) {
            trace!(node = %id, start, end = ?entry.end, "memo hit");
            self.record_failure(entry.furthest);
            let Some(end) = entry.end else {
                return Ok(false);
            };
            self.replay(&entry.delta);
            self.pos = end;
            return Ok(true);
        }
        trace!(node = %id, start, "memo miss");

        let snapshot = self.snapshot();
        let outer = (self.reach, self.reach_depth);
        self.reach = 0;
        self.reach_depth = self.silenced;
        let matched = self.attempt(child);
        let reached = self.reach;
        (self.reach, self.reach_depth) = outer;
        self.record_failure(reached);
        let entry = if matched? {
            let delta: Arc<[_]> = Arc::from(&self.log[snapshot.log_len()..]);
            MemoEntry::success(id, start, self.pos, delta, context)
        } else {
            MemoEntry::failure(id, start, context)
        };
        let entry = entry.reaching(reached);
        let matched = entry.is_success();
        if let Some(memoizer) = self.memoizer(table) {
            memoizer.memoize(entry);
        }
        Ok(matched)
    }

    fn action(&mut self, child: ParserId, action: &StackAction<T, V>) -> Result<bool, FatalError> {
        let start = self.pos;
        let base = self.stack.len();
        if !self.attempt(child)? {
            return Ok(false);
        }
        let span = Span::new(start, self.pos);
        match action {
            StackAction::Reduce(reduce) => {
                let items = self.drain_from(base);
                let value = reduce(&mut ActionContext::new(self, items, span))?;
                self.push(value);
                Ok(true)
            }
            StackAction::Predicate(predicate) => {
                let items = self.stack.get(base..).unwrap_or_default().to_vec();
                predicate(&mut ActionContext::new(self, items, span))
            }
            StackAction::Consume(consume) => {
                let items = self.stack.get(base..).unwrap_or_default().to_vec();
                consume(&mut ActionContext::new(self, items, span))?;
                Ok(true)
            }
        }
    }
}
