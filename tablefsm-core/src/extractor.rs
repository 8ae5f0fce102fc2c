//! Token-level statement extractor.
//!
//! Runs a grammar table over token labels. The values of the consumed tokens
//! are concatenated into the current statement, and every time a final state
//! is reached the statement so far is recorded as accepted. When a token has
//! no transition, the last accepted statement (if any) is emitted and the
//! same token is retried from the start state.

use crate::definition::{FinalStates, Machine, State, TransitionTable};
use crate::engine::{first_match, EngineKind, RunLimits, StepCounter};
use crate::error::FsmError;
use crate::lexer::Token;

/// A statement assembled from the values of accepted tokens.
pub type Statement = String;

/// Extracts statements from `tokens`.
pub fn extract(
    tokens: &[Token],
    start: &State,
    table: &TransitionTable,
    finals: &FinalStates,
) -> Result<Vec<Statement>, FsmError> {
    extract_with(tokens, start, table, finals, RunLimits::default())
}

/// [`extract`] with explicit run limits.
pub fn extract_with(
    tokens: &[Token],
    start: &State,
    table: &TransitionTable,
    finals: &FinalStates,
    limits: RunLimits,
) -> Result<Vec<Statement>, FsmError> {
    let mut counter = StepCounter::new(EngineKind::Extractor, limits);
    let mut run = StatementRun::new(start);

    loop {
        counter.tick()?;

        if finals.contains(run.state) {
            run.accepted = Some(run.buffer.clone());
        }

        let Some(token) = tokens.get(run.cursor) else {
            run.flush();
            break;
        };

        match first_match(table, run.state, token.kind.as_str()) {
            Some(next) => run.consume(token, next),
            None if run.consumed == 0 => {
                return Err(FsmError::Stalled {
                    engine: EngineKind::Extractor,
                    state: run.state.to_string(),
                    position: run.cursor,
                    symbol: token.kind.clone(),
                });
            }
            None => {
                run.flush();
                run.restart(start);
            }
        }
    }

    tracing::debug!(
        "Extracted {} statements from {} tokens in {} steps",
        run.statements.len(),
        tokens.len(),
        counter.steps()
    );
    Ok(run.statements)
}

/// Accumulator for one extraction run.
struct StatementRun<'t> {
    state: &'t State,
    cursor: usize,
    /// Tokens consumed since the last restart.
    consumed: usize,
    buffer: String,
    accepted: Option<Statement>,
    statements: Vec<Statement>,
}

impl<'t> StatementRun<'t> {
    fn new(start: &'t State) -> Self {
        Self {
            state: start,
            cursor: 0,
            consumed: 0,
            buffer: String::new(),
            accepted: None,
            statements: Vec::new(),
        }
    }

    fn consume(&mut self, token: &Token, next: &'t State) {
        self.buffer.push_str(&token.value);
        self.cursor += 1;
        self.consumed += 1;
        self.state = next;
    }

    /// Emits the accepted statement, if there is a non-empty one.
    fn flush(&mut self) {
        match self.accepted.take() {
            Some(statement) if !statement.is_empty() => {
                tracing::trace!("Statement {:?} accepted before token {}", statement, self.cursor);
                self.statements.push(statement);
            }
            _ => {}
        }
    }

    fn restart(&mut self, start: &'t State) {
        self.buffer.clear();
        self.consumed = 0;
        self.state = start;
    }
}

impl Machine {
    /// Extracts statements with this machine as the grammar table.
    pub fn extract(&self, tokens: &[Token]) -> Result<Vec<Statement>, FsmError> {
        extract(tokens, &self.start, &self.table, &self.finals)
    }

    /// [`Machine::extract`] with explicit run limits.
    pub fn extract_with(&self, tokens: &[Token], limits: RunLimits) -> Result<Vec<Statement>, FsmError> {
        extract_with(tokens, &self.start, &self.table, &self.finals, limits)
    }
}
