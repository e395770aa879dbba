//! # Parallel Batch Parsing
//!
//! A [`Grammar`] is immutable and `Sync`, so many inputs can be parsed at
//! once over the same instance. Each input gets its own session (and with
//! it its own stack, log, state slots and memo tables) on the rayon pool.

use crate::engine::{ParseConfig, ParseResult};
use crate::error::FatalError;
use crate::graph::Grammar;
use crate::input::InputItem;
use crate::session::StackValue;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of one input of a batch.
#[derive(Debug, Clone)]
pub struct BatchResult<V> {
    /// Position of the input in the batch.
    pub index: usize,
    pub result: Result<ParseResult<V>, FatalError>,
    pub duration: Duration,
}

impl<V> BatchResult<V> {
    /// The input parsed without a fatal error and matched in full.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.as_ref().is_ok_and(|r| r.full_match)
    }
}

/// Parses batches of inputs over one shared grammar.
#[derive(Debug)]
pub struct ParallelParser<T, V> {
    grammar: Arc<Grammar<T, V>>,
    config: ParseConfig,
}

impl<T, V> ParallelParser<T, V>
where
    T: InputItem,
    V: StackValue,
{
    #[must_use]
    pub fn new(grammar: Arc<Grammar<T, V>>) -> Self {
        Self::with_config(grammar, ParseConfig::default())
    }

    #[must_use]
    pub const fn with_config(grammar: Arc<Grammar<T, V>>, config: ParseConfig) -> Self {
        Self { grammar, config }
    }

    #[must_use]
    pub const fn grammar(&self) -> &Arc<Grammar<T, V>> {
        &self.grammar
    }

    /// Parse every input; results come back in input order.
    pub fn parse_batch<I>(&self, inputs: &[I]) -> Vec<BatchResult<V>>
    where
        I: AsRef<[T]> + Sync,
    {
        parse_batch(&self.grammar, inputs, self.config)
    }
}

/// Parse every input over `grammar`; results come back in input order.
pub fn parse_batch<T, V, I>(
    grammar: &Grammar<T, V>,
    inputs: &[I],
    config: ParseConfig,
) -> Vec<BatchResult<V>>
where
    T: InputItem,
    V: StackValue,
    I: AsRef<[T]> + Sync,
{
    debug!(inputs = inputs.len(), "parsing batch");
    inputs
        .par_iter()
        .enumerate()
        .map(|(index, input)| {
            let start = Instant::now();
            let result = grammar.parse_with(input.as_ref(), config);
            BatchResult {
                index,
                result,
                duration: start.elapsed(),
            }
        })
        .collect()
}
