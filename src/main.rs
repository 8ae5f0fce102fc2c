//! tablefsm - Table-driven finite state machines
//!
//! Checks machine and pipeline definitions, runs the matcher, tokenizer and
//! statement extractor from the command line, and provides a REPL.

mod commands;
mod config;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{CliOverrides, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tablefsm")]
#[command(about = "Run table-driven matchers, tokenizers and statement extractors")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "TABLEFSM_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Step budget per tokenizer/extractor run
    #[arg(long)]
    max_steps: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a machine or pipeline definition
    Check {
        /// Definition file (.yaml, .yml or .json)
        file: PathBuf,
    },

    /// Test whether a machine accepts an input string
    Match {
        /// Machine definition file
        #[arg(short, long)]
        machine: PathBuf,

        /// Input text (or @file to read from file)
        input: String,
    },

    /// Break text into tokens
    Lex {
        /// Pipeline definition file (defaults to the built-in time pipeline)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// Input text (or @file to read from file)
        text: String,
    },

    /// Extract statements from text
    Extract {
        /// Pipeline definition file (defaults to the built-in time pipeline)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// Show the intermediate tokens as well
        #[arg(short, long)]
        tokens: bool,

        /// Input text (or @file to read from file)
        text: String,
    },

    /// Extract time expressions with the built-in time pipeline
    Times {
        /// Input text (or @file to read from file)
        text: String,
    },

    /// Start interactive REPL
    Repl {
        /// Pipeline definition file (defaults to the built-in time pipeline)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,
    },

    /// Show the effective configuration, or write it to a file
    Config {
        /// Write the configuration to this path instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    // Command-line flags override file and environment
    let overrides = CliOverrides {
        json: cli.json,
        no_color: cli.no_color,
        max_steps: cli.max_steps,
    };
    if let Err(e) = config.apply_cli_overrides(&overrides) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .init();

    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    colored::control::set_override(config.output.color);

    let result = match cli.command {
        Commands::Repl { pipeline } => repl::run(pipeline.as_deref(), &config).map(|_| None),
        cmd => commands::execute(cmd, &config).map(Some),
    };

    match result {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            eprintln!("{}", commands::format_error(e.as_ref(), config.output.format));
            std::process::exit(1);
        }
    }
}
