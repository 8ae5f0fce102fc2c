//! Transition tables and machine definitions.
//!
//! Machines can be written as YAML or JSON:
//!
//! ```yaml
//! start: A
//! finals: [W]
//! transitions:
//!   A:
//!     - ['[^ a]', X]
//!     - [a, W]
//!     - { on: ' ', to: A }
//!   W: []
//! ```
//!
//! Each state lists its transitions in order; the order decides which
//! transition wins when several patterns match the same symbol. A state that
//! has no entry is a dead end.

use crate::error::FsmError;
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// A state in the machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(pub String);

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for State {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A guarded edge to a target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub on: Pattern,
    pub to: State,
}

impl Transition {
    pub fn new(on: Pattern, to: impl Into<State>) -> Self {
        Self { on, to: to.into() }
    }
}

/// Ordered transitions per source state.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    transitions: HashMap<State, Vec<Transition>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    /// Appends a transition after the ones already listed for `from`.
    pub fn push(&mut self, from: impl Into<State>, transition: Transition) {
        self.transitions
            .entry(from.into())
            .or_default()
            .push(transition);
    }

    /// Declares a state with no outgoing transitions.
    pub fn add_dead_end(&mut self, state: impl Into<State>) {
        self.transitions.entry(state.into()).or_default();
    }

    /// Returns the transitions leaving `state`, in table order.
    ///
    /// Unknown states have no transitions.
    pub fn transitions_from(&self, state: &State) -> &[Transition] {
        self.transitions
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if `state` has an entry in the table, even an empty one.
    pub fn has_entry(&self, state: &State) -> bool {
        self.transitions.contains_key(state)
    }

    /// Returns the number of transitions in the table.
    pub fn len(&self) -> usize {
        self.transitions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every state mentioned as a source or a target.
    pub fn states(&self) -> BTreeSet<&State> {
        let mut states = BTreeSet::new();
        for (from, transitions) in &self.transitions {
            states.insert(from);
            states.extend(transitions.iter().map(|t| &t.to));
        }
        states
    }
}

/// Fluent construction of a [`TransitionTable`].
#[derive(Debug, Default)]
pub struct TableBuilder {
    table: TransitionTable,
}

impl TableBuilder {
    /// Adds a transition guarded by an already-built pattern.
    pub fn on(mut self, from: impl Into<State>, on: impl Into<Pattern>, to: impl Into<State>) -> Self {
        self.table.push(from, Transition::new(on.into(), to));
        self
    }

    /// Adds a transition guarded by a pattern in text form.
    pub fn rule(self, from: impl Into<State>, pattern: &str, to: impl Into<State>) -> Result<Self, FsmError> {
        let on = Pattern::parse(pattern)?;
        Ok(self.on(from, on, to))
    }

    /// Declares a state with no outgoing transitions.
    pub fn dead_end(mut self, state: impl Into<State>) -> Self {
        self.table.add_dead_end(state);
        self
    }

    pub fn build(self) -> TransitionTable {
        self.table
    }
}

/// The set of accepting states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalStates(HashSet<State>);

impl FinalStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, state: &State) -> bool {
        self.0.contains(state)
    }

    pub fn insert(&mut self, state: impl Into<State>) -> bool {
        self.0.insert(state.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.0.iter()
    }
}

impl<S: Into<State>> FromIterator<S> for FinalStates {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A transition as written in a table file: `[pattern, target]` or
/// `{on: pattern, to: target}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionRaw {
    Pair(String, String),
    Rule { on: String, to: String },
}

impl TransitionRaw {
    fn parts(&self) -> (&str, &str) {
        match self {
            TransitionRaw::Pair(on, to) => (on, to),
            TransitionRaw::Rule { on, to } => (on, to),
        }
    }
}

/// Raw machine definition as stored in table files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDefinitionRaw {
    /// Start state.
    pub start: String,

    /// Accepting states.
    #[serde(default)]
    pub finals: Vec<String>,

    /// Transitions per source state.
    #[serde(default)]
    pub transitions: BTreeMap<String, Vec<TransitionRaw>>,
}

/// Validated machine: start state, transition table and final states.
#[derive(Debug, Clone)]
pub struct Machine {
    /// Machine name.
    pub name: String,

    /// Start state.
    pub start: State,

    /// Transition table.
    pub table: TransitionTable,

    /// Accepting states.
    pub finals: FinalStates,

    /// Original raw definition.
    pub raw: MachineDefinitionRaw,

    /// Checksum of the raw definition.
    pub checksum: String,
}

impl Machine {
    /// Parses and validates a machine definition from JSON.
    pub fn from_json(name: impl Into<String>, json: &serde_json::Value) -> Result<Self, FsmError> {
        let raw: MachineDefinitionRaw = serde_json::from_value(json.clone())?;
        Self::from_raw(name, raw)
    }

    /// Parses and validates a machine definition from YAML text.
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> Result<Self, FsmError> {
        let raw: MachineDefinitionRaw = serde_yaml::from_str(yaml)?;
        Self::from_raw(name, raw)
    }

    /// Loads a machine from a `.json`, `.yaml` or `.yml` file, named after the
    /// file stem.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FsmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let raw: MachineDefinitionRaw = if is_json(path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        tracing::debug!("Loaded machine definition {} from {}", name, path.display());
        Self::from_raw(name, raw)
    }

    /// Creates a machine from raw parts.
    pub fn from_raw(name: impl Into<String>, raw: MachineDefinitionRaw) -> Result<Self, FsmError> {
        let name = name.into();

        if raw.start.is_empty() {
            return Err(FsmError::InvalidDefinition {
                reason: "start state must not be empty".to_string(),
            });
        }
        let start = State(raw.start.clone());

        let mut finals = FinalStates::new();
        for f in &raw.finals {
            if f.is_empty() {
                return Err(FsmError::InvalidDefinition {
                    reason: "final state names must not be empty".to_string(),
                });
            }
            finals.insert(f.as_str());
        }

        let mut table = TransitionTable::new();
        for (from, transitions) in &raw.transitions {
            if from.is_empty() {
                return Err(FsmError::InvalidDefinition {
                    reason: "state names must not be empty".to_string(),
                });
            }
            table.add_dead_end(from.as_str());

            for t in transitions {
                let (on, to) = t.parts();
                if to.is_empty() {
                    return Err(FsmError::InvalidDefinition {
                        reason: format!("transition from '{}' on '{}' has no target", from, on),
                    });
                }
                table.push(from.as_str(), Transition::new(Pattern::parse(on)?, to));
            }
        }

        if !table.has_entry(&start) {
            tracing::warn!(
                "Machine {}: start state '{}' has no transitions",
                name,
                start
            );
        }

        // Compute checksum
        let json_bytes = serde_json::to_vec(&raw)?;
        let checksum = format!("{:08x}", crc32c::crc32c(&json_bytes));

        Ok(Self {
            name,
            start,
            table,
            finals,
            raw,
            checksum,
        })
    }

    /// Assembles a machine from parts built in code.
    pub fn new(
        name: impl Into<String>,
        start: impl Into<State>,
        table: TransitionTable,
        finals: FinalStates,
    ) -> Self {
        let start = start.into();
        let mut transitions = BTreeMap::new();
        for state in table.states() {
            let rows = table
                .transitions_from(state)
                .iter()
                .map(|t| TransitionRaw::Pair(t.on.to_string(), t.to.0.clone()))
                .collect::<Vec<_>>();
            if table.has_entry(state) {
                transitions.insert(state.0.clone(), rows);
            }
        }
        let mut final_names: Vec<String> = finals.iter().map(|s| s.0.clone()).collect();
        final_names.sort();

        let raw = MachineDefinitionRaw {
            start: start.0.clone(),
            finals: final_names,
            transitions,
        };
        let checksum = serde_json::to_vec(&raw)
            .map(|bytes| format!("{:08x}", crc32c::crc32c(&bytes)))
            .unwrap_or_default();

        Self {
            name: name.into(),
            start,
            table,
            finals,
            raw,
            checksum,
        }
    }

    /// Returns true if `state` is accepting.
    pub fn is_final(&self, state: &State) -> bool {
        self.finals.contains(state)
    }

    /// Returns every state mentioned by the machine.
    pub fn states(&self) -> BTreeSet<&State> {
        let mut states = self.table.states();
        states.insert(&self.start);
        states.extend(self.finals.iter());
        states
    }

    /// Returns the raw definition as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, FsmError> {
        Ok(serde_json::to_value(&self.raw)?)
    }
}

pub(crate) fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
