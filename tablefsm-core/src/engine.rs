//! Shared run machinery for the tokenizer and the extractor.
//!
//! Both engines are loops that either consume a symbol or restart from the
//! start state. A restart that happens at the start state with nothing
//! buffered can never make progress, so it is reported as
//! [`FsmError::Stalled`] instead of spinning. Callers that want an
//! additional hard cap configure [`RunLimits::max_steps`].

use crate::definition::{State, TransitionTable};
use crate::error::FsmError;
use crate::pattern::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which engine a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Matcher,
    Tokenizer,
    Extractor,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Matcher => f.write_str("matcher"),
            EngineKind::Tokenizer => f.write_str("tokenizer"),
            EngineKind::Extractor => f.write_str("extractor"),
        }
    }
}

/// Limits applied to a single tokenizer or extractor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Maximum loop iterations (consumes plus restarts). `None` = unlimited.
    pub max_steps: Option<u64>,
}

impl RunLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }
}

/// Counts loop iterations against a [`RunLimits`] budget.
#[derive(Debug)]
pub(crate) struct StepCounter {
    engine: EngineKind,
    limit: Option<u64>,
    steps: u64,
}

impl StepCounter {
    pub(crate) fn new(engine: EngineKind, limits: RunLimits) -> Self {
        Self {
            engine,
            limit: limits.max_steps,
            steps: 0,
        }
    }

    /// Records one iteration, failing once the budget is spent.
    pub(crate) fn tick(&mut self) -> Result<(), FsmError> {
        self.steps += 1;
        match self.limit {
            Some(limit) if self.steps > limit => Err(FsmError::StepLimitExceeded {
                engine: self.engine,
                limit,
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }
}

/// Returns the target of the first transition from `state` that matches
/// `symbol`, or `None` at a dead end.
pub(crate) fn first_match<'t, S: Symbol + ?Sized>(
    table: &'t TransitionTable,
    state: &State,
    symbol: &S,
) -> Option<&'t State> {
    table
        .transitions_from(state)
        .iter()
        .find(|t| t.on.matches(symbol))
        .map(|t| &t.to)
}

/// Returns the target of the last transition from `state` that matches
/// `symbol`, or `None` at a dead end.
pub(crate) fn last_match<'t, S: Symbol + ?Sized>(
    table: &'t TransitionTable,
    state: &State,
    symbol: &S,
) -> Option<&'t State> {
    table
        .transitions_from(state)
        .iter()
        .fold(None, |found, t| {
            if t.on.matches(symbol) {
                Some(&t.to)
            } else {
                found
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn overlapping() -> TransitionTable {
        TransitionTable::builder()
            .on("A", 'a', "X")
            .on("A", Pattern::class("[a-z]").unwrap(), "Y")
            .on("A", '0', "Z")
            .build()
    }

    #[test]
    fn test_first_and_last_match_differ_on_overlap() {
        let table = overlapping();
        let a = State::from("A");

        assert_eq!(first_match(&table, &a, &'a').unwrap().as_str(), "X");
        assert_eq!(last_match(&table, &a, &'a').unwrap().as_str(), "Y");
    }

    #[test]
    fn test_single_match_agrees() {
        let table = overlapping();
        let a = State::from("A");

        assert_eq!(first_match(&table, &a, &'b').unwrap().as_str(), "Y");
        assert_eq!(last_match(&table, &a, &'b').unwrap().as_str(), "Y");
        assert!(first_match(&table, &a, &'!').is_none());
        assert!(last_match(&table, &State::from("missing"), &'a').is_none());
    }

    #[test]
    fn test_step_counter_budget() {
        let mut counter = StepCounter::new(EngineKind::Tokenizer, RunLimits::with_max_steps(2));
        assert!(counter.tick().is_ok());
        assert!(counter.tick().is_ok());
        let err = counter.tick().unwrap_err();
        assert!(matches!(
            err,
            FsmError::StepLimitExceeded {
                engine: EngineKind::Tokenizer,
                limit: 2
            }
        ));
        assert_eq!(counter.steps(), 3);
    }

    #[test]
    fn test_unlimited_counter() {
        let mut counter = StepCounter::new(EngineKind::Extractor, RunLimits::unlimited());
        for _ in 0..10_000 {
            counter.tick().unwrap();
        }
    }
}
