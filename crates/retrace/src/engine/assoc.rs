//! Operator-table expressions.
//!
//! Both folds loop over the input instead of recursing through the grammar,
//! so a long chain of operators costs one operand attempt per link.

use crate::error::FatalError;
use crate::graph::{AssocOperator, FoldArgs, ParserId};
use crate::input::{InputItem, Span};
use crate::session::{ParseSession, StackValue};

/// Stack layout of one `operator operand` link.
#[derive(Clone, Copy)]
struct Link {
    row: usize,
    /// Stack height before the operator ran.
    operator_base: usize,
    /// Stack height before the operand ran.
    operand_base: usize,
    /// Input position where the operand starts.
    operand_start: usize,
}

impl<T, V> ParseSession<'_, T, V>
where
    T: InputItem,
    V: StackValue,
{
    /// Try each operator row in order, followed by an operand.
    ///
    /// Returns `None` if no row matched or the operator that matched has no
    /// operand after it; either way the session is left unchanged.
    fn next_link(
        &mut self,
        operand: ParserId,
        operators: &[AssocOperator<V>],
    ) -> Result<Option<Link>, FatalError> {
        for (row, op) in operators.iter().enumerate() {
            let snapshot = self.snapshot();
            let operator_base = self.stack.len();
            if !self.attempt(op.operator)? {
                continue;
            }
            let operand_base = self.stack.len();
            let operand_start = self.pos;
            if !self.attempt(operand)? {
                self.restore(snapshot);
                return Ok(None);
            }
            return Ok(Some(Link {
                row,
                operator_base,
                operand_base,
                operand_start,
            }));
        }
        Ok(None)
    }

    pub(super) fn left_assoc(
        &mut self,
        operand: ParserId,
        operators: &[AssocOperator<V>],
    ) -> Result<bool, FatalError> {
        let start = self.pos;
        let base = self.stack.len();
        if !self.attempt(operand)? {
            return Ok(false);
        }
        while let Some(link) = self.next_link(operand, operators)? {
            let rhs = self.drain_from(link.operand_base);
            let operator = self.drain_from(link.operator_base);
            let lhs = self.drain_from(base);
            let value = (operators[link.row].fold)(FoldArgs {
                lhs,
                operator,
                rhs,
                span: Span::new(start, self.pos),
            })?;
            self.push(value);
        }
        Ok(true)
    }

    pub(super) fn right_assoc(
        &mut self,
        operand: ParserId,
        operators: &[AssocOperator<V>],
    ) -> Result<bool, FatalError> {
        let start = self.pos;
        let base = self.stack.len();
        if !self.attempt(operand)? {
            return Ok(false);
        }
        let mut links = Vec::new();
        while let Some(link) = self.next_link(operand, operators)? {
            links.push(link);
        }

        let end = self.pos;
        let mut folded: Option<V> = None;
        for (index, link) in links.iter().enumerate().rev() {
            let (lhs_base, lhs_start) = match index.checked_sub(1) {
                Some(previous) => (links[previous].operand_base, links[previous].operand_start),
                None => (base, start),
            };
            let rhs = match folded.take() {
                Some(value) => vec![value],
                None => self.drain_from(link.operand_base),
            };
            let operator = self.drain_from(link.operator_base);
            let lhs = self.drain_from(lhs_base);
            folded = Some((operators[link.row].fold)(FoldArgs {
                lhs,
                operator,
                rhs,
                span: Span::new(lhs_start, end),
            })?);
        }
        if let Some(value) = folded {
            self.push(value);
        }
        Ok(true)
    }
}
