//! CLI module for the phpt test runner
//!
//! This module provides the command-line interface.
//!
//! ## Usage
//!
//! `phpt-runner [OPTIONS] [PATH]` runs every `.phpt` file under `PATH`
//! (default: the current directory) against the configured interpreter.
//!
//! ## Modules
//!
//! - `test_interfaces` - Discovery and execution boundaries
//! - `test_runner` - Run loop and result aggregation
//! - `test_reporter` - Progress, summary and log output
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod test_interfaces;
pub mod test_reporter;
pub mod test_runner;

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::version::RUNNER_VERSION;
use test_interfaces::{DEFAULT_INTERPRETER, Interpreter};
use test_reporter::ConsoleReporter;
use test_runner::{RunConfig, TestRunner};

/// Environment variable set by `-l/--lib-path`.
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

// ============================================================================
// CLI Error handling
// ============================================================================

/// Process exit status. Clap usage errors exit on their own with 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Fatal CLI failure; `run()` prints the message to stderr and exits with the code.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Runs .phpt tests against an interpreter
#[derive(Parser, Debug)]
#[command(name = "phpt-runner")]
#[command(version = RUNNER_VERSION)]
#[command(about = "Runs .phpt tests against an interpreter", long_about = None)]
pub struct Cli {
    /// Test file or directory (default: current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Interpreter binary
    #[arg(short = 'p', long = "interpreter", value_name = "BIN", default_value = DEFAULT_INTERPRETER)]
    pub interpreter: PathBuf,

    /// Pass `-c <FILE>` to the interpreter (repeatable)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Vec<String>,

    /// Pass `-d <KEY=VALUE>` to the interpreter (repeatable)
    #[arg(short = 'd', long = "define", value_name = "KEY=VALUE")]
    pub define: Vec<String>,

    /// Library path exported to the interpreter as LD_LIBRARY_PATH
    #[arg(short = 'l', long = "lib-path", value_name = "DIR")]
    pub lib_path: Option<String>,

    /// Extra interpreter environment variable (repeatable)
    #[arg(short = 'e', long = "env", value_name = "NAME=VALUE", value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,

    /// Copy all output to this file
    #[arg(long = "log", value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Write failed tests with their .actual/.expected files to this file
    #[arg(long = "dlog", visible_alias = "diff-log", value_name = "FILE")]
    pub diff_log: Option<PathBuf>,

    /// Show details of skipped tests
    #[arg(short = 's', long = "show-skipped")]
    pub show_skipped: bool,

    /// `-c`/`-d` pairs in command-line order
    #[arg(skip)]
    pub interpreter_args: Vec<String>,
}

impl Cli {
    /// Parse arguments, keeping `-c` and `-d` in the order they were given.
    pub fn try_parse_ordered<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        cli.interpreter_args = ordered_interpreter_args(&matches);
        Ok(cli)
    }

    /// Resolve the arguments into the configuration of one run.
    pub fn to_config(&self) -> CliResult<RunConfig> {
        let root = match &self.path {
            Some(path) => {
                fs::canonicalize(path).map_err(|_| CliError::failure(format!("Invalid path '{}'.", path.display())))?
            }
            None => env::current_dir()
                .map_err(|e| CliError::failure(format!("Cannot determine current directory: {}", e)))?,
        };

        let mut env = BTreeMap::new();
        if let Some(lib_path) = &self.lib_path {
            env.insert(LIBRARY_PATH_VAR.to_string(), lib_path.clone());
        }
        env.extend(self.env.iter().cloned());

        Ok(RunConfig {
            root,
            interpreter: Interpreter {
                binary: self.interpreter.clone(),
                args: self.interpreter_args.clone(),
                env,
            },
            display_skipped: self.show_skipped,
        })
    }
}

fn ordered_interpreter_args(matches: &ArgMatches) -> Vec<String> {
    let mut flagged: Vec<(usize, &str, &String)> = Vec::new();
    for (id, flag) in [("config", "-c"), ("define", "-d")] {
        if let (Some(indices), Some(values)) = (matches.indices_of(id), matches.get_many::<String>(id)) {
            flagged.extend(indices.zip(values).map(|(index, value)| (index, flag, value)));
        }
    }
    flagged.sort_by_key(|(index, _, _)| *index);

    flagged
        .into_iter()
        .flat_map(|(_, flag, value)| [flag.to_string(), value.clone()])
        .collect()
}

fn parse_env_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::try_parse_ordered(env::args_os()).unwrap_or_else(|e| e.exit());

    match execute(&cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the run described by the CLI arguments.
pub fn execute(cli: &Cli) -> CliResult<ExitCode> {
    let config = cli.to_config()?;

    let mut reporter = ConsoleReporter::new(io::stdout(), config.display_skipped);
    if let Some(path) = &cli.log {
        reporter = reporter.with_live_log(open_log(path)?);
    }
    if let Some(path) = &cli.diff_log {
        reporter = reporter.with_diff_log(open_log(path)?);
    }

    let mut runner = TestRunner::new(&config);
    let result = runner
        .run(&mut reporter)
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Tests failed - return error with empty message (summary already printed)
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

fn open_log(path: &Path) -> CliResult<Box<dyn Write>> {
    let file = File::create(path)
        .map_err(|e| CliError::failure(format!("Cannot open log file '{}': {}", path.display(), e)))?;
    Ok(Box::new(BufWriter::new(file)))
}

// ============================================================================
// Tests
// ============================================================================
