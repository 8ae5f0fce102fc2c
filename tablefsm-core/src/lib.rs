//! # tablefsm-core
//!
//! Table-driven finite-state engines.
//!
//! This crate provides:
//! - Transition tables, final-state sets and machine definitions
//! - Symbol patterns (literals, literal sets, character classes, catch-all)
//! - An acceptance matcher
//! - A maximal-munch tokenizer with token events
//! - A statement extractor with restart-from-start backtracking
//! - Pipelines chaining the tokenizer and the extractor

pub mod definition;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod lexer;
pub mod matcher;
pub mod pattern;
pub mod pipeline;

pub use definition::{FinalStates, Machine, MachineDefinitionRaw, State, TransitionTable, Transition};
pub use engine::{EngineKind, RunLimits};
pub use error::FsmError;
pub use extractor::{extract, extract_with, Statement};
pub use lexer::{tokenize, tokenize_with, Events, LexerOptions, Token, TokenAction, ERROR_LABEL};
pub use matcher::accepts;
pub use pattern::{Pattern, Symbol};
pub use pipeline::{Pipeline, PipelineDefinitionRaw};
