//! Table-driven tokenizer.
//!
//! The lexical table is not a strict DFA. A missing transition does not
//! reject the input: it closes the current token, and scanning resumes from
//! the start state with the same character. The current token is always
//! extended as far as the table allows (maximal munch). A run that ends in a
//! non-final state is still emitted, labeled with the error label
//! (`"ERROR"` unless configured otherwise).
//!
//! After scanning, [`Events`] rewrite or drop tokens by label.

use crate::definition::{FinalStates, Machine, State, TransitionTable};
use crate::engine::{first_match, EngineKind, RunLimits, StepCounter};
use crate::error::FsmError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Default label for runs that end in a non-final state.
pub const ERROR_LABEL: &str = "ERROR";

/// A classified run of characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Final state reached by the run, or the error label.
    pub kind: String,
    /// The consumed characters.
    pub value: String,
}

impl Token {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Rewrites a token, or drops it by returning `None`.
pub type TokenTransform = Arc<dyn Fn(Token) -> Option<Token> + Send + Sync>;

/// Transform that drops every token it is registered for.
pub fn ignore(_token: Token) -> Option<Token> {
    None
}

/// Per-label post-processing applied after scanning.
#[derive(Clone, Default)]
pub struct Events {
    transforms: HashMap<String, TokenTransform>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transform for `label`, replacing any previous one.
    pub fn insert<F>(&mut self, label: impl Into<String>, transform: F)
    where
        F: Fn(Token) -> Option<Token> + Send + Sync + 'static,
    {
        self.transforms.insert(label.into(), Arc::new(transform));
    }

    /// Builder form of [`Events::insert`].
    pub fn on<F>(mut self, label: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Token) -> Option<Token> + Send + Sync + 'static,
    {
        self.insert(label, transform);
        self
    }

    /// Drops every token labeled `label`.
    pub fn drop(self, label: impl Into<String>) -> Self {
        self.on(label, ignore)
    }

    /// Registers a declarative action for `label`.
    pub fn action(mut self, label: impl Into<String>, action: &TokenAction) -> Result<Self, FsmError> {
        let label = label.into();
        let transform = action.to_transform(&label)?;
        self.transforms.insert(label, transform);
        Ok(self)
    }

    /// Builds events from a label → action map, as found in pipeline files.
    pub fn from_actions(actions: &BTreeMap<String, TokenAction>) -> Result<Self, FsmError> {
        actions
            .iter()
            .try_fold(Self::new(), |events, (label, action)| events.action(label.as_str(), action))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.transforms.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Moves the transform registered for `from` to `to`, unless `to`
    /// already has its own.
    pub fn rekey(&mut self, from: &str, to: &str) {
        if from == to || self.transforms.contains_key(to) {
            return;
        }
        if let Some(transform) = self.transforms.remove(from) {
            self.transforms.insert(to.to_string(), transform);
        }
    }

    /// Returns the registered labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Applies the registered transforms, keeping token order.
    pub fn apply(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter_map(|token| match self.transforms.get(&token.kind) {
                Some(transform) => transform(token),
                None => Some(token),
            })
            .collect()
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("labels", &self.labels())
            .finish()
    }
}

/// Declarative token action, as written in pipeline files.
///
/// Either the keyword `drop`, or a rewrite:
///
/// ```yaml
/// events:
///   SPACE: drop
///   ERROR: { rename: NOT_TOKEN }
///   TO: { prefix: ' ', suffix: ' ' }
///   AT: { replace: '' }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenAction {
    Keyword(String),
    Rewrite(TokenRewrite),
}

/// Rewrite steps, applied as rename, replace, then prefix/suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenRewrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl TokenRewrite {
    fn is_empty(&self) -> bool {
        self.rename.is_none() && self.replace.is_none() && self.prefix.is_none() && self.suffix.is_none()
    }

    pub fn apply(&self, token: Token) -> Token {
        let kind = self.rename.clone().unwrap_or(token.kind);
        let value = self.replace.clone().unwrap_or(token.value);
        let prefix = self.prefix.as_deref().unwrap_or("");
        let suffix = self.suffix.as_deref().unwrap_or("");
        Token {
            kind,
            value: format!("{}{}{}", prefix, value, suffix),
        }
    }
}

impl TokenAction {
    pub fn drop() -> Self {
        TokenAction::Keyword("drop".to_string())
    }

    pub fn rename(kind: impl Into<String>) -> Self {
        TokenAction::Rewrite(TokenRewrite {
            rename: Some(kind.into()),
            ..TokenRewrite::default()
        })
    }

    fn to_transform(&self, label: &str) -> Result<TokenTransform, FsmError> {
        match self {
            TokenAction::Keyword(word) if word == "drop" => Ok(Arc::new(ignore)),
            TokenAction::Keyword(word) => Err(FsmError::InvalidEvent {
                label: label.to_string(),
                reason: format!("unknown action '{}'", word),
            }),
            TokenAction::Rewrite(rewrite) if rewrite.is_empty() => Err(FsmError::InvalidEvent {
                label: label.to_string(),
                reason: "rewrite must set rename, replace, prefix or suffix".to_string(),
            }),
            TokenAction::Rewrite(rewrite) => {
                let rewrite = rewrite.clone();
                Ok(Arc::new(move |token| Some(rewrite.apply(token))))
            }
        }
    }
}

/// Tokenizer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerOptions {
    /// Label for runs that end in a non-final state.
    pub error_label: String,
    /// Run limits.
    pub limits: RunLimits,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            error_label: ERROR_LABEL.to_string(),
            limits: RunLimits::default(),
        }
    }
}

/// Breaks `input` into tokens, then applies `events`.
pub fn tokenize(
    input: &str,
    start: &State,
    table: &TransitionTable,
    finals: &FinalStates,
    events: &Events,
) -> Result<Vec<Token>, FsmError> {
    tokenize_with(input, start, table, finals, events, &LexerOptions::default())
}

/// [`tokenize`] with explicit options.
pub fn tokenize_with(
    input: &str,
    start: &State,
    table: &TransitionTable,
    finals: &FinalStates,
    events: &Events,
    options: &LexerOptions,
) -> Result<Vec<Token>, FsmError> {
    let raw = scan(input, start, table, finals, options)?;
    Ok(events.apply(raw))
}

/// Breaks `input` into raw tokens without applying any events.
pub fn scan(
    input: &str,
    start: &State,
    table: &TransitionTable,
    finals: &FinalStates,
    options: &LexerOptions,
) -> Result<Vec<Token>, FsmError> {
    let mut counter = StepCounter::new(EngineKind::Tokenizer, options.limits);
    let mut chars = input.chars().peekable();
    let mut position = 0;

    let mut state = start;
    let mut buffer = String::new();
    let mut tokens = Vec::new();

    loop {
        counter.tick()?;

        let Some(&c) = chars.peek() else {
            if !buffer.is_empty() {
                tokens.push(close_token(state, finals, buffer, &options.error_label));
            }
            break;
        };

        match first_match(table, state, &c) {
            Some(next) => {
                buffer.push(c);
                chars.next();
                position += 1;
                state = next;
            }
            None if buffer.is_empty() => {
                // Only reachable at the start state; retrying would loop forever.
                return Err(FsmError::Stalled {
                    engine: EngineKind::Tokenizer,
                    state: state.to_string(),
                    position,
                    symbol: c.to_string(),
                });
            }
            None => {
                let token = close_token(state, finals, std::mem::take(&mut buffer), &options.error_label);
                tracing::trace!("Token {}={:?} closed at position {}", token.kind, token.value, position);
                tokens.push(token);
                state = start;
            }
        }
    }

    tracing::debug!(
        "Scanned {} chars into {} tokens in {} steps",
        position,
        tokens.len(),
        counter.steps()
    );
    Ok(tokens)
}

fn close_token(state: &State, finals: &FinalStates, value: String, error_label: &str) -> Token {
    let kind = if finals.contains(state) {
        state.as_str()
    } else {
        error_label
    };
    Token::new(kind, value)
}

impl Machine {
    /// Tokenizes `input` with this machine as the lexical table.
    pub fn tokenize(&self, input: &str, events: &Events) -> Result<Vec<Token>, FsmError> {
        tokenize(input, &self.start, &self.table, &self.finals, events)
    }

    /// [`Machine::tokenize`] with explicit options.
    pub fn tokenize_with(
        &self,
        input: &str,
        events: &Events,
        options: &LexerOptions,
    ) -> Result<Vec<Token>, FsmError> {
        tokenize_with(input, &self.start, &self.table, &self.finals, events, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn finals(names: &[&str]) -> FinalStates {
        names.iter().copied().collect()
    }

    fn pairs(tokens: &[Token]) -> Vec<(&str, &str)> {
        tokens
            .iter()
            .map(|t| (t.kind.as_str(), t.value.as_str()))
            .collect()
    }

    /// Accepts runs of at least three '1's; anything else up to a space is
    /// an error run.
    fn ones_table() -> TransitionTable {
        TransitionTable::builder()
            .on("A", ' ', "B")
            .on("A", '1', "C1")
            .rule("A", "[^ 1]", "X")
            .unwrap()
            .on("B", ' ', "B")
            .on("C1", '1', "C2")
            .rule("C1", "[^ 1]", "X")
            .unwrap()
            .on("C2", '1', "E")
            .rule("C2", "[^ 1]", "X")
            .unwrap()
            .on("E", '1', "E")
            .rule("E", "[^ 1]", "X")
            .unwrap()
            .rule("X", "[^ ]", "X")
            .unwrap()
            .build()
    }

    #[test]
    fn test_error_runs_and_dropped_spaces() {
        let events = Events::new().drop("B");
        let tokens = tokenize(
            "test 11a 110 test 111",
            &State::from("A"),
            &ones_table(),
            &finals(&["B", "E"]),
            &events,
        )
        .unwrap();

        assert_eq!(
            pairs(&tokens),
            vec![
                ("ERROR", "test"),
                ("ERROR", "11a"),
                ("ERROR", "110"),
                ("ERROR", "test"),
                ("E", "111"),
            ]
        );
    }

    #[test]
    fn test_without_events_spaces_are_tokens() {
        let tokens = tokenize(
            "1  11",
            &State::from("A"),
            &ones_table(),
            &finals(&["B", "E"]),
            &Events::new(),
        )
        .unwrap();

        assert_eq!(pairs(&tokens), vec![("ERROR", "1"), ("B", "  "), ("ERROR", "11")]);
    }

    #[test]
    fn test_maximal_munch() {
        let table = TransitionTable::builder()
            .on("A", 'a', "F1")
            .on("F1", 'b', "F2")
            .build();
        let finals = finals(&["F1", "F2"]);
        let start = State::from("A");

        let tokens = tokenize("ab", &start, &table, &finals, &Events::new()).unwrap();
        assert_eq!(pairs(&tokens), vec![("F2", "ab")]);

        let tokens = tokenize("aab", &start, &table, &finals, &Events::new()).unwrap();
        assert_eq!(pairs(&tokens), vec![("F1", "a"), ("F2", "ab")]);
    }

    #[test]
    fn test_restart_does_not_skip_symbol() {
        let table = TransitionTable::builder()
            .rule("A", "[a-z]", "W")
            .unwrap()
            .rule("A", "[0-9]", "N")
            .unwrap()
            .rule("W", "[a-z]", "W")
            .unwrap()
            .rule("N", "[0-9]", "N")
            .unwrap()
            .build();

        let tokens = tokenize(
            "ab12cd",
            &State::from("A"),
            &table,
            &finals(&["W", "N"]),
            &Events::new(),
        )
        .unwrap();

        assert_eq!(pairs(&tokens), vec![("W", "ab"), ("N", "12"), ("W", "cd")]);
    }

    #[test]
    fn test_first_matching_transition_wins() {
        let table = TransitionTable::builder()
            .on("A", 'a', "X")
            .on("A", Pattern::class("[a-z]").unwrap(), "Y")
            .build();

        let tokens = tokenize(
            "a",
            &State::from("A"),
            &table,
            &finals(&["X", "Y"]),
            &Events::new(),
        )
        .unwrap();

        assert_eq!(pairs(&tokens), vec![("X", "a")]);
    }

    #[test]
    fn test_trailing_non_final_run_is_error() {
        let table = TransitionTable::builder()
            .on("A", 'a', "B")
            .on("B", 'b', "C")
            .build();

        let tokens = tokenize(
            "aba",
            &State::from("A"),
            &table,
            &finals(&["C"]),
            &Events::new(),
        )
        .unwrap();

        assert_eq!(pairs(&tokens), vec![("C", "ab"), ("ERROR", "a")]);
    }

    #[test]
    fn test_empty_input() {
        let tokens = tokenize(
            "",
            &State::from("A"),
            &ones_table(),
            &finals(&["A"]),
            &Events::new(),
        )
        .unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_custom_error_label() {
        let options = LexerOptions {
            error_label: "UNKNOWN".to_string(),
            ..LexerOptions::default()
        };
        let tokens = tokenize_with(
            "x",
            &State::from("A"),
            &ones_table(),
            &finals(&["E"]),
            &Events::new(),
            &options,
        )
        .unwrap();

        assert_eq!(pairs(&tokens), vec![("UNKNOWN", "x")]);
    }

    #[test]
    fn test_events_rewrite_in_place() {
        let events = Events::new()
            .on("ERROR", |t: Token| Some(Token::new("WORD", t.value)))
            .on("E", |t: Token| Some(Token::new(t.kind, format!("<{}>", t.value))))
            .drop("B");

        let tokens = tokenize(
            "ab 111 cd",
            &State::from("A"),
            &ones_table(),
            &finals(&["B", "E"]),
            &events,
        )
        .unwrap();

        assert_eq!(
            pairs(&tokens),
            vec![("WORD", "ab"), ("E", "<111>"), ("WORD", "cd")]
        );
    }

    #[test]
    fn test_stall_at_start_is_reported() {
        let table = TransitionTable::builder().on("A", 'a', "W").build();

        let err = tokenize(
            "ab",
            &State::from("A"),
            &table,
            &finals(&["W"]),
            &Events::new(),
        )
        .unwrap_err();

        match err {
            FsmError::Stalled {
                engine,
                state,
                position,
                symbol,
            } => {
                assert_eq!(engine, EngineKind::Tokenizer);
                assert_eq!(state, "A");
                assert_eq!(position, 1);
                assert_eq!(symbol, "b");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_step_limit() {
        let options = LexerOptions {
            limits: RunLimits::with_max_steps(5),
            ..LexerOptions::default()
        };
        let result = tokenize_with(
            "111 111 111",
            &State::from("A"),
            &ones_table(),
            &finals(&["E"]),
            &Events::new(),
            &options,
        );

        assert!(matches!(
            result,
            Err(FsmError::StepLimitExceeded { limit: 5, .. })
        ));
    }

    #[test]
    fn test_token_actions_from_yaml() {
        let yaml = r#"
SPACE: drop
ERROR: { rename: NOT_TOKEN }
TO: { prefix: ' ', suffix: ' ' }
AT: { replace: '' }
"#;
        let actions: BTreeMap<String, TokenAction> = serde_yaml::from_str(yaml).unwrap();
        let events = Events::from_actions(&actions).unwrap();
        assert_eq!(events.labels(), vec!["AT", "ERROR", "SPACE", "TO"]);

        let out = events.apply(vec![
            Token::new("SPACE", " "),
            Token::new("ERROR", "x"),
            Token::new("TO", "to"),
            Token::new("AT", "at"),
            Token::new("DASH", "-"),
        ]);

        assert_eq!(
            pairs(&out),
            vec![("NOT_TOKEN", "x"), ("TO", " to "), ("AT", ""), ("DASH", "-")]
        );
    }

    #[test]
    fn test_rekey_events() {
        let mut events = Events::new()
            .drop("SPACE")
            .action("ERROR", &TokenAction::rename("NOT_TOKEN"))
            .unwrap();

        events.rekey("ERROR", "JUNK");
        assert_eq!(events.labels(), vec!["JUNK", "SPACE"]);
        assert_eq!(
            pairs(&events.apply(vec![Token::new("JUNK", "x")])),
            vec![("NOT_TOKEN", "x")]
        );

        // An existing transform for the target label is kept.
        events.rekey("JUNK", "SPACE");
        assert_eq!(events.labels(), vec!["JUNK", "SPACE"]);
        assert!(events.apply(vec![Token::new("SPACE", " ")]).is_empty());
    }

    #[test]
    fn test_invalid_token_actions() {
        let keep = Events::new().action("SPACE", &TokenAction::Keyword("keep".to_string()));
        assert!(matches!(keep, Err(FsmError::InvalidEvent { .. })));

        let empty = Events::new().action("SPACE", &TokenAction::Rewrite(TokenRewrite::default()));
        assert!(matches!(empty, Err(FsmError::InvalidEvent { .. })));

        let unknown_field: Result<TokenAction, _> = serde_yaml::from_str("{ renam: X }");
        assert!(unknown_field.is_err());
    }

    #[test]
    fn test_machine_tokenize() {
        let m = Machine::new("ones", "A", ones_table(), finals(&["E", "B"]));
        let events = Events::new().action("ERROR", &TokenAction::rename("JUNK")).unwrap();

        let tokens = m.tokenize("111 x", &events).unwrap();
        assert_eq!(pairs(&tokens), vec![("E", "111"), ("B", " "), ("JUNK", "x")]);
    }
}
