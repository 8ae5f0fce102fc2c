//! Acceptance matcher.
//!
//! Walks a symbol sequence through a transition table and answers whether
//! the run ends in a final state. Unlike the tokenizer and the extractor,
//! the matcher scans every transition of the current state and lets the
//! *last* matching one decide; overlapping patterns therefore resolve
//! differently here than in the other two engines.

use crate::definition::{FinalStates, Machine, State, TransitionTable};
use crate::engine::last_match;
use crate::pattern::Symbol;

/// Returns true if `input` drives `start` into a final state.
///
/// A symbol with no matching transition rejects the input immediately;
/// the remaining symbols are not consumed.
pub fn accepts<I>(input: I, start: &State, table: &TransitionTable, finals: &FinalStates) -> bool
where
    I: IntoIterator,
    I::Item: Symbol,
{
    let mut state = start;

    for (position, symbol) in input.into_iter().enumerate() {
        match last_match(table, state, &symbol) {
            Some(next) => state = next,
            None => {
                tracing::trace!(
                    "Rejected at position {}: no transition from '{}' on {:?}",
                    position,
                    state,
                    symbol.describe()
                );
                return false;
            }
        }
    }

    finals.contains(state)
}

impl Machine {
    /// Returns true if the machine accepts the characters of `input`.
    pub fn accepts(&self, input: &str) -> bool {
        accepts(input.chars(), &self.start, &self.table, &self.finals)
    }

    /// Returns true if the machine accepts a sequence of arbitrary symbols,
    /// e.g. token labels.
    pub fn accepts_symbols<I>(&self, input: I) -> bool
    where
        I: IntoIterator,
        I::Item: Symbol,
    {
        accepts(input, &self.start, &self.table, &self.finals)
    }
}
