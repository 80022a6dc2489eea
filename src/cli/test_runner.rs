//! Test runner implementation
//!
//! ## Run Loop
//!
//! A run walks the root path, keeps only `.phpt` files, executes each one in
//! discovery order and records its [`TestOutcome`] in a [`RunResult`]. Tests
//! run strictly one after another; the executor call blocks until the
//! interpreter exits.
//!
//! ## TestReporter Trait
//!
//! Reporting is separated from execution through the `TestReporter` trait (see
//! `test_reporter.rs`). The runner notifies the reporter as soon as each outcome
//! is known so progress is visible during long runs, then once more when the
//! walk is finished.

use std::path::{Path, PathBuf};

use super::test_interfaces::{
    DefaultTestDiscovery, Interpreter, InterpreterExecutor, TestDiscovery, TestError, TestExecutor, is_test_file,
};
use super::test_reporter::TestReporter;

// ============================================================================
// Outcomes
// ============================================================================

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed { name: String, path: PathBuf },
    Skipped { name: String, path: PathBuf, message: String },
    Failed { name: String, path: PathBuf, message: String },
}

impl TestOutcome {
    pub fn passed(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::Passed {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn skipped(name: impl Into<String>, path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Skipped {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn failed(name: impl Into<String>, path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Passed { name, .. } | Self::Skipped { name, .. } | Self::Failed { name, .. } => name,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Passed { path, .. } | Self::Skipped { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    /// Diagnostic message; passed tests have none.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Passed { .. } => None,
            Self::Skipped { message, .. } | Self::Failed { message, .. } => Some(message),
        }
    }

    /// Character printed while the run is in progress.
    pub fn progress_char(&self) -> char {
        match self {
            Self::Passed { .. } => '.',
            Self::Skipped { .. } => 's',
            Self::Failed { .. } => 'F',
        }
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Summary of test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Outcomes of one run, grouped by kind in encounter order.
///
/// Append-only: `total` always equals the sum of the three groups.
#[derive(Debug, Default)]
pub struct RunResult {
    total: usize,
    passed: Vec<TestOutcome>,
    skipped: Vec<TestOutcome>,
    failed: Vec<TestOutcome>,
}

impl RunResult {
    pub fn record(&mut self, outcome: TestOutcome) {
        self.total += 1;
        match outcome {
            TestOutcome::Passed { .. } => self.passed.push(outcome),
            TestOutcome::Skipped { .. } => self.skipped.push(outcome),
            TestOutcome::Failed { .. } => self.failed.push(outcome),
        }
    }

    pub fn summary(&self) -> TestSummary {
        TestSummary {
            total: self.total,
            passed: self.passed.len(),
            failed: self.failed.len(),
            skipped: self.skipped.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn passed(&self) -> &[TestOutcome] {
        &self.passed
    }

    pub fn skipped(&self) -> &[TestOutcome] {
        &self.skipped
    }

    pub fn failed(&self) -> &[TestOutcome] {
        &self.failed
    }

    /// A run succeeds when nothing failed, including when nothing ran.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// Run Controller
// ============================================================================

/// Everything a run needs to know, fixed before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Test file or directory to walk
    pub root: PathBuf,
    pub interpreter: Interpreter,
    /// Print a detail block for skipped tests
    pub display_skipped: bool,
}

impl RunConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            interpreter: Interpreter::default(),
            display_skipped: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Walking,
    Completed,
}

/// Drives discovery, execution and reporting for one configuration.
pub struct TestRunner<'a> {
    config: &'a RunConfig,
    discovery: &'a dyn TestDiscovery,
    executor: &'a dyn TestExecutor,
    state: RunState,
}

impl<'a> TestRunner<'a> {
    /// Runner using the filesystem walk and the interpreter process executor.
    pub fn new(config: &'a RunConfig) -> Self {
        Self::with_interfaces(config, &DefaultTestDiscovery, &InterpreterExecutor)
    }

    pub fn with_interfaces(
        config: &'a RunConfig,
        discovery: &'a dyn TestDiscovery,
        executor: &'a dyn TestExecutor,
    ) -> Self {
        Self {
            config,
            discovery,
            executor,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every test under the configured root.
    ///
    /// Per-test failures end up in the returned [`RunResult`]; an `Err` means the
    /// run was aborted (unwalkable root, unusable interpreter, broken output).
    #[tracing::instrument(skip_all, fields(root = %self.config.root.display()))]
    pub fn run(&mut self, reporter: &mut dyn TestReporter) -> Result<RunResult, TestError> {
        self.state = RunState::Walking;
        tracing::info!("starting test run");

        let mut result = RunResult::default();
        for candidate in self.discovery.walk(&self.config.root)? {
            let path = candidate?;
            if !is_test_file(&path) {
                tracing::trace!(path = %path.display(), "not a test file");
                continue;
            }

            tracing::debug!(path = %path.display(), "executing test");
            let outcome = self.executor.execute(&path, &self.config.interpreter)?;
            reporter.on_test_complete(&outcome)?;
            result.record(outcome);
        }

        self.state = RunState::Completed;
        let summary = result.summary();
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "test run complete"
        );

        reporter.on_run_complete(&result)?;
        Ok(result)
    }
}

// ============================================================================
// Tests
// ============================================================================
