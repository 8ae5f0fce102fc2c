//! Command execution.

use crate::config::{Config, OutputFormat};
use crate::Commands;
use colored::Colorize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, VecDeque};
use std::error::Error;
use std::path::Path;
use tablefsm_core::{FsmError, Machine, Pipeline, State, Statement, Token};

/// Built-in pipeline that extracts time expressions from free text.
pub const TIMES_PIPELINE: &str = include_str!("../machines/times.yaml");

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands, config: &Config) -> Result<String, Box<dyn Error>> {
    let format = config.output.format;

    match cmd {
        Commands::Repl { .. } => Err("the REPL is not a one-shot command".into()),

        Commands::Check { file } => {
            if is_pipeline_file(&file)? {
                let pipeline = Pipeline::from_file(&file)?;
                Ok(format_pipeline_check(&pipeline, format))
            } else {
                let machine = Machine::from_file(&file)?;
                Ok(format_machine_check(&machine, format))
            }
        }

        Commands::Match { machine, input } => {
            let machine = Machine::from_file(&machine)?;
            let input = read_text_arg(&input)?;
            let accepted = machine.accepts(&input);

            Ok(format_verdict(accepted, &machine.name, format))
        }

        Commands::Lex { pipeline, text } => {
            let pipeline = load_pipeline(pipeline.as_deref(), config)?;
            let text = read_text_arg(&text)?;
            run_lexer(&pipeline, &text, config)
        }

        Commands::Extract {
            pipeline,
            tokens,
            text,
        } => {
            let pipeline = load_pipeline(pipeline.as_deref(), config)?;
            let text = read_text_arg(&text)?;
            run_pipeline(&pipeline, &text, tokens, config)
        }

        Commands::Times { text } => {
            let pipeline = load_pipeline(None, config)?;
            let text = read_text_arg(&text)?;
            run_pipeline(&pipeline, &text, false, config)
        }

        Commands::Config { output } => match output {
            Some(path) => {
                config.save(&path)?;
                Ok(format!(
                    "{} configuration to {}",
                    "Wrote".green(),
                    path.display()
                ))
            }
            None => Ok(config.to_yaml()?),
        },
    }
}

/// Loads the pipeline at `path`, or the built-in time pipeline, with the
/// configured engine options applied.
pub fn load_pipeline(path: Option<&Path>, config: &Config) -> Result<Pipeline, FsmError> {
    let pipeline = match path {
        Some(path) => Pipeline::from_file(path)?,
        None => Pipeline::from_yaml("times", TIMES_PIPELINE)?,
    };
    Ok(pipeline
        .with_error_label(config.engine.error_label.as_str())
        .with_limits(config.engine.limits()))
}

/// Runs the lexical stage and formats the tokens.
pub fn run_lexer(pipeline: &Pipeline, text: &str, config: &Config) -> Result<String, Box<dyn Error>> {
    let tokens = pipeline.tokenize(text)?;

    match config.output.format {
        OutputFormat::Json => Ok(format_json(&json!({ "tokens": tokens }))),
        OutputFormat::Text => Ok(format_tokens(&tokens, &config.engine.error_label)),
    }
}

/// Runs both pipeline stages and formats the statements.
pub fn run_pipeline(
    pipeline: &Pipeline,
    text: &str,
    show_tokens: bool,
    config: &Config,
) -> Result<String, Box<dyn Error>> {
    let tokens = pipeline.tokenize(text)?;
    let statements = pipeline
        .grammar
        .extract_with(&tokens, pipeline.options().limits)?;

    match config.output.format {
        OutputFormat::Json if show_tokens => Ok(format_json(&json!({
            "tokens": tokens,
            "statements": statements,
        }))),
        OutputFormat::Json => Ok(format_json(&json!({ "statements": statements }))),
        OutputFormat::Text => {
            let mut output = String::new();
            if show_tokens {
                output.push_str(&format_tokens(&tokens, &config.engine.error_label));
                output.push('\n');
            }
            output.push_str(&format_statements(&statements));
            Ok(output)
        }
    }
}

/// Formats an acceptance result.
pub fn format_verdict(accepted: bool, machine: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(&json!({ "machine": machine, "accepted": accepted })),
        OutputFormat::Text if accepted => format!("{} by {}", "Accepted".green(), machine.cyan()),
        OutputFormat::Text => format!("{} by {}", "Rejected".red(), machine.cyan()),
    }
}

/// Formats an error for display, as JSON when JSON output is configured.
pub fn format_error(error: &(dyn Error + 'static), format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let code = error
                .downcast_ref::<FsmError>()
                .map(FsmError::error_code)
                .unwrap_or("ERROR");
            format_json(&json!({
                "error": { "code": code, "message": error.to_string() }
            }))
        }
        OutputFormat::Text => format!("{}: {}", "Error".red(), error),
    }
}

/// Returns true if the definition file holds a pipeline rather than a
/// single machine.
fn is_pipeline_file(path: &Path) -> Result<bool, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)?;
    // YAML is a superset of the JSON used for definitions
    let value: serde_yaml::Value = serde_yaml::from_str(&content)?;
    Ok(value.get("lexer").is_some() && value.get("grammar").is_some())
}

/// Reads text from an argument, or from a file if the argument is `@path`.
pub fn read_text_arg(arg: &str) -> Result<String, Box<dyn Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(content)
    } else {
        Ok(arg.to_string())
    }
}

/// Returns definition problems that do not prevent loading.
pub fn lint(machine: &Machine) -> Vec<String> {
    let mut warnings = Vec::new();

    if !machine.table.has_entry(&machine.start) {
        warnings.push(format!(
            "start state '{}' has no transitions",
            machine.start
        ));
    }

    if machine.finals.is_empty() {
        warnings.push("no final states; nothing can be accepted".to_string());
    }

    let reachable = reachable_states(machine);
    let mut unreachable: Vec<&State> = machine
        .finals
        .iter()
        .filter(|f| !reachable.contains(f))
        .collect();
    unreachable.sort();
    for state in unreachable {
        warnings.push(format!(
            "final state '{}' is unreachable from '{}'",
            state, machine.start
        ));
    }

    warnings
}

fn reachable_states(machine: &Machine) -> BTreeSet<&State> {
    let mut seen = BTreeSet::from([&machine.start]);
    let mut queue = VecDeque::from([&machine.start]);

    while let Some(state) = queue.pop_front() {
        for transition in machine.table.transitions_from(state) {
            if seen.insert(&transition.to) {
                queue.push_back(&transition.to);
            }
        }
    }
    seen
}

fn machine_summary(machine: &Machine) -> Value {
    let mut finals: Vec<&str> = machine.finals.iter().map(State::as_str).collect();
    finals.sort_unstable();
    let transitions: usize = machine
        .table
        .states()
        .into_iter()
        .map(|s| machine.table.transitions_from(s).len())
        .sum();

    json!({
        "name": machine.name,
        "checksum": machine.checksum,
        "start": machine.start.as_str(),
        "states": machine.states().len(),
        "transitions": transitions,
        "finals": finals,
        "warnings": lint(machine),
    })
}

fn format_machine_check(machine: &Machine, format: OutputFormat) -> String {
    let summary = machine_summary(machine);
    match format {
        OutputFormat::Json => format_json(&json!({ "machine": summary })),
        OutputFormat::Text => format!(
            "{} machine {} (checksum: {})\n{}",
            "Valid".green(),
            machine.name.cyan(),
            machine.checksum,
            format_summary_body(&summary)
        ),
    }
}

pub fn format_pipeline_check(pipeline: &Pipeline, format: OutputFormat) -> String {
    let lexer = machine_summary(&pipeline.lexer);
    let grammar = machine_summary(&pipeline.grammar);
    let events = pipeline.events.labels();

    match format {
        OutputFormat::Json => format_json(&json!({
            "pipeline": {
                "name": pipeline.name,
                "lexer": lexer,
                "events": events,
                "grammar": grammar,
            }
        })),
        OutputFormat::Text => {
            let mut output = format!("{} pipeline {}\n", "Valid".green(), pipeline.name.cyan());
            output.push_str(&format!(
                "Lexer (checksum: {})\n{}",
                pipeline.lexer.checksum,
                format_summary_body(&lexer)
            ));
            if events.is_empty() {
                output.push_str("Events: none\n");
            } else {
                output.push_str(&format!("Events: {}\n", events.join(", ")));
            }
            output.push_str(&format!(
                "Grammar (checksum: {})\n{}",
                pipeline.grammar.checksum,
                format_summary_body(&grammar)
            ));
            output
        }
    }
}

fn format_summary_body(summary: &Value) -> String {
    let finals: Vec<&str> = summary["finals"]
        .as_array()
        .map(|v| v.iter().filter_map(|x| x.as_str()).collect())
        .unwrap_or_default();

    let mut output = format!(
        "  Start: {}\n  States: {}\n  Transitions: {}\n  Finals: {}\n",
        summary["start"].as_str().unwrap_or("?"),
        summary["states"],
        summary["transitions"],
        finals.join(", ")
    );
    if let Some(warnings) = summary["warnings"].as_array() {
        for warning in warnings.iter().filter_map(|w| w.as_str()) {
            output.push_str(&format!("  {}: {}\n", "Warning".yellow(), warning));
        }
    }
    output
}

fn format_tokens(tokens: &[Token], error_label: &str) -> String {
    if tokens.is_empty() {
        return "No tokens".yellow().to_string();
    }

    let mut output = String::new();
    for (i, token) in tokens.iter().enumerate() {
        let kind = format!("{:<16}", token.kind);
        let kind = if token.kind == error_label {
            kind.red()
        } else {
            kind.cyan()
        };
        output.push_str(&format!("{:>4}  {} {:?}\n", i, kind, token.value));
    }
    output
}

fn format_statements(statements: &[Statement]) -> String {
    if statements.is_empty() {
        return "No statements".yellow().to_string();
    }

    let mut output = String::new();
    for (i, statement) in statements.iter().enumerate() {
        output.push_str(&format!("{:>4}. {}\n", i + 1, statement.green()));
    }
    output
}

fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
