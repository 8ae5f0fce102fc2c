//! Interactive REPL.

use crate::commands::{format_pipeline_check, format_verdict, load_pipeline, run_lexer, run_pipeline};
use crate::config::Config;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config as EditorConfig, Editor};
use std::error::Error;
use std::path::{Path, PathBuf};
use tablefsm_core::Pipeline;

const HELP_TEXT: &str = r#"
Available commands:
  help                          Show this help
  info                          Show the loaded pipeline

  <text>                        Extract statements from text
  extract <text>                Extract statements from text
  lex <text>                    Break text into tokens
  match <text>                  Test whether the lexer accepts the whole text
  grammar <LABEL> [LABEL...]    Test whether the grammar accepts a label sequence

  tokens on|off                 Show tokens alongside statements
  load <file>                   Load a pipeline definition
  load times                    Load the built-in time pipeline

  quit, exit                    Exit the REPL
"#;

/// REPL state.
struct Session {
    pipeline: Pipeline,
    config: Config,
    show_tokens: bool,
}

impl Session {
    fn new(pipeline: Pipeline, config: Config) -> Self {
        Self {
            pipeline,
            config,
            show_tokens: false,
        }
    }
}

pub fn run(pipeline_path: Option<&Path>, config: &Config) -> Result<(), Box<dyn Error>> {
    let pipeline = load_pipeline(pipeline_path, config)?;
    let mut session = Session::new(pipeline, config.clone());

    println!("{}", "tablefsm REPL".bold().cyan());
    println!("Loaded pipeline {}", session.pipeline.name.cyan());

    // Create readline editor
    let editor_config = EditorConfig::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(editor_config)?;

    let history_path = history_path();
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", format!("{}>", session.pipeline.name).cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut session, line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        tracing::debug!("Failed to save history to {}: {}", history_path.display(), e);
    }

    Ok(())
}

fn history_path() -> PathBuf {
    home::home_dir()
        .map(|h| h.join(".tablefsm_history"))
        .unwrap_or_else(|| ".tablefsm_history".into())
}

/// Executes one REPL line. Returns `Ok(None)` when the session should end.
fn execute_repl_command(session: &mut Session, line: &str) -> Result<Option<String>, Box<dyn Error>> {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim_start()),
        None => (line, ""),
    };
    let format = session.config.output.format;

    match cmd.to_lowercase().as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "info" => Ok(Some(format_pipeline_check(&session.pipeline, format))),

        "extract" | "x" => run_pipeline(&session.pipeline, rest, session.show_tokens, &session.config)
            .map(Some),

        "lex" | "l" => run_lexer(&session.pipeline, rest, &session.config).map(Some),

        "match" | "m" => {
            let accepted = session.pipeline.lexer.accepts(rest);
            Ok(Some(format_verdict(accepted, &session.pipeline.lexer.name, format)))
        }

        "grammar" | "g" => {
            if rest.is_empty() {
                return Ok(Some("Usage: grammar <LABEL> [LABEL...]".to_string()));
            }
            let accepted = session.pipeline.grammar.accepts_symbols(rest.split_whitespace());
            Ok(Some(format_verdict(accepted, &session.pipeline.grammar.name, format)))
        }

        "tokens" => match rest {
            "on" => {
                session.show_tokens = true;
                Ok(Some("Tokens shown".green().to_string()))
            }
            "off" => {
                session.show_tokens = false;
                Ok(Some("Tokens hidden".green().to_string()))
            }
            _ => Ok(Some("Usage: tokens on|off".to_string())),
        },

        "load" => {
            if rest.is_empty() {
                return Ok(Some("Usage: load <file>|times".to_string()));
            }
            let path = (rest != "times").then(|| Path::new(rest));
            session.pipeline = load_pipeline(path, &session.config)?;
            Ok(Some(format!(
                "{} pipeline {}",
                "Loaded".green(),
                session.pipeline.name.cyan()
            )))
        }

        // Anything else is input text
        _ => run_pipeline(&session.pipeline, line, session.show_tokens, &session.config).map(Some),
    }
}
