//! Two-stage pipelines: text → tokens → statements.
//!
//! A pipeline file bundles a lexical machine, the token events applied after
//! scanning, and a grammar machine:
//!
//! ```yaml
//! lexer:
//!   start: A
//!   finals: [WORD, SPACE]
//!   transitions: { ... }
//! events:
//!   SPACE: drop
//! grammar:
//!   start: A
//!   finals: [C]
//!   transitions: { ... }
//! ```

use crate::definition::{is_json, Machine, MachineDefinitionRaw};
use crate::engine::RunLimits;
use crate::error::FsmError;
use crate::extractor::Statement;
use crate::lexer::{Events, LexerOptions, Token, TokenAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Raw pipeline definition as stored in files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinitionRaw {
    /// Lexical machine.
    pub lexer: MachineDefinitionRaw,

    /// Token events keyed by label.
    #[serde(default)]
    pub events: BTreeMap<String, TokenAction>,

    /// Grammar machine.
    pub grammar: MachineDefinitionRaw,
}

/// A validated pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub lexer: Machine,
    pub events: Events,
    pub grammar: Machine,
    options: LexerOptions,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, lexer: Machine, events: Events, grammar: Machine) -> Self {
        Self {
            name: name.into(),
            lexer,
            events,
            grammar,
            options: LexerOptions::default(),
        }
    }

    /// Creates a pipeline from raw parts.
    pub fn from_raw(name: impl Into<String>, raw: PipelineDefinitionRaw) -> Result<Self, FsmError> {
        let name = name.into();
        let lexer = Machine::from_raw(format!("{}.lexer", name), raw.lexer)?;
        let grammar = Machine::from_raw(format!("{}.grammar", name), raw.grammar)?;
        let events = Events::from_actions(&raw.events)?;
        Ok(Self::new(name, lexer, events, grammar))
    }

    /// Parses a pipeline from YAML text.
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> Result<Self, FsmError> {
        let raw: PipelineDefinitionRaw = serde_yaml::from_str(yaml)?;
        Self::from_raw(name, raw)
    }

    /// Parses a pipeline from JSON.
    pub fn from_json(name: impl Into<String>, json: &serde_json::Value) -> Result<Self, FsmError> {
        let raw: PipelineDefinitionRaw = serde_json::from_value(json.clone())?;
        Self::from_raw(name, raw)
    }

    /// Loads a pipeline from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FsmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let raw: PipelineDefinitionRaw = if is_json(path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        tracing::debug!("Loaded pipeline {} from {}", name, path.display());
        Self::from_raw(name, raw)
    }

    /// Sets the error label used by the lexical stage. An event registered
    /// for the previous label follows it to the new one.
    pub fn with_error_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.events.rekey(&self.options.error_label, &label);
        self.options.error_label = label;
        self
    }

    /// Sets the run limits applied to both stages.
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.options.limits = limits;
        self
    }

    pub fn options(&self) -> &LexerOptions {
        &self.options
    }

    /// Runs the lexical stage, events included.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, FsmError> {
        self.lexer.tokenize_with(text, &self.events, &self.options)
    }

    /// Runs both stages.
    pub fn extract(&self, text: &str) -> Result<Vec<Statement>, FsmError> {
        let tokens = self.tokenize(text)?;
        self.grammar.extract_with(&tokens, self.options.limits)
    }
}
