#![forbid(unsafe_code)]
//! phpt test runner
//!
//! Discovers `.phpt` test files under a path, runs each one through an external
//! interpreter process, and reports the outcomes: a progress character per test,
//! detail blocks for failures (and optionally skips), a summary line, plus an
//! optional live log and a machine-readable diff log of failed tests.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod version;

pub use cli::test_interfaces::{
    DefaultTestDiscovery, Interpreter, InterpreterExecutor, TestDiscovery, TestError, TestExecutor, is_test_file,
    output_basename, walk,
};
pub use cli::test_reporter::{ConsoleReporter, TestReporter};
pub use cli::test_runner::{RunConfig, RunResult, RunState, TestOutcome, TestRunner, TestSummary};
