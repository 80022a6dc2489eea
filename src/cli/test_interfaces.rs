//! Test runner I/O boundary interfaces
//!
//! This module defines the pieces of the runner that touch the outside world:
//! - Test discovery (filesystem walk + extension filter)
//! - Test execution (interpreter process invocation + outcome classification)
//!
//! Both are trait-based so the run loop in `test_runner.rs` can be driven by
//! scripted implementations in tests, or by alternative execution strategies.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use walkdir::WalkDir;

use super::test_runner::TestOutcome;

/// Extension that marks a file as a test definition.
pub const TEST_EXTENSION: &str = "phpt";

/// Interpreter used when none is given on the command line.
pub const DEFAULT_INTERPRETER: &str = "php-cgi";

/// Directory (sibling to a test) that receives `.actual` / `.expected` artifacts.
pub const OUTPUT_DIR: &str = "output";

/// Extension of the optional expected-output file next to a test.
pub const EXPECT_EXTENSION: &str = "expect";

const SKIP_MARKER: &str = "Skipped:";

/// Errors that abort a whole run.
///
/// Per-test failures and skips are never reported through this type; they are
/// [`TestOutcome`] variants.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("Invalid path '{}'.", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to walk test directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("interpreter '{}' not found", .0.display())]
    InterpreterNotFound(PathBuf),

    #[error("failed to start interpreter '{}': {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Test Discovery Interface
// ============================================================================

/// Lazy sequence of candidate files produced by a walk.
pub type Candidates = Box<dyn Iterator<Item = Result<PathBuf, TestError>>>;

/// Produce candidate files under a root path.
pub trait TestDiscovery {
    /// A file root yields itself; a directory root yields every file below it.
    fn walk(&self, root: &Path) -> Result<Candidates, TestError>;
}

/// Filesystem walk backed by `walkdir`.
pub struct DefaultTestDiscovery;

impl TestDiscovery for DefaultTestDiscovery {
    fn walk(&self, root: &Path) -> Result<Candidates, TestError> {
        walk(root)
    }
}

/// Walk `root` lazily.
///
/// Directory entries are visited in file-name order so repeated runs over the
/// same tree execute tests in the same order. Symlinks to files are yielded,
/// symlinked directories are not descended into.
pub fn walk(root: &Path) -> Result<Candidates, TestError> {
    if root.is_file() {
        return Ok(Box::new(std::iter::once(Ok(root.to_path_buf()))));
    }
    if !root.is_dir() {
        return Err(TestError::InvalidPath(root.to_path_buf()));
    }

    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
                is_file.then(|| Ok(entry.into_path()))
            }
            Err(e) => Some(Err(TestError::Walk(e))),
        });

    Ok(Box::new(entries))
}

/// True if the text after the last `.` of the final path segment is the test
/// extension. A bare `.phpt` counts, unlike with `Path::extension`.
pub fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| ext == TEST_EXTENSION)
}

/// Base path (without suffix) of the `.actual` / `.expected` pair for a test.
///
/// The final extension is stripped and the file is relocated into a sibling
/// `output` directory: `a/b/c.phpt` becomes `a/b/output/c`, `c.phpt` becomes
/// `output/c`.
pub fn output_basename(test_path: &Path) -> PathBuf {
    let stem = test_path.file_stem().unwrap_or(test_path.as_os_str());
    let output_dir = match test_path.parent() {
        Some(parent) => parent.join(OUTPUT_DIR),
        None => PathBuf::from(OUTPUT_DIR),
    };
    output_dir.join(stem)
}

/// Append a literal suffix such as `.actual` to a path.
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

// ============================================================================
// Test Executor Interface
// ============================================================================

/// How to invoke the interpreter for each test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub binary: PathBuf,
    /// Arguments placed before the test path
    pub args: Vec<String>,
    /// Variables layered over the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_INTERPRETER),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

/// Execute one test file and classify the result.
///
/// Implementations must report ordinary failures and skips as a [`TestOutcome`].
/// An `Err` means the harness itself cannot continue and aborts the run.
pub trait TestExecutor {
    fn execute(&self, test_path: &Path, interpreter: &Interpreter) -> Result<TestOutcome, TestError>;
}

/// Runs `<binary> <args...> <test>` and classifies the process result.
///
/// - stdout starting with `Skipped:` marks the test skipped
/// - a non-zero exit status fails the test
/// - if `<stem>.expect` sits next to the test, stdout must match it
pub struct InterpreterExecutor;

impl TestExecutor for InterpreterExecutor {
    #[tracing::instrument(skip_all, fields(test = %test_path.display()))]
    fn execute(&self, test_path: &Path, interpreter: &Interpreter) -> Result<TestOutcome, TestError> {
        let name = test_name(test_path);

        let output = Command::new(&interpreter.binary)
            .args(&interpreter.args)
            .arg(test_path)
            .envs(&interpreter.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => TestError::InterpreterNotFound(interpreter.binary.clone()),
                _ => TestError::Spawn {
                    binary: interpreter.binary.clone(),
                    source: e,
                },
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(status = %output.status, stdout_len = stdout.len(), "interpreter exited");

        if let Some(message) = skip_message(&stdout) {
            return Ok(TestOutcome::skipped(name, test_path, message));
        }

        if !output.status.success() {
            return Ok(TestOutcome::failed(name, test_path, exit_failure_message(output.status, &stderr)));
        }

        let expect_path = test_path.with_extension(EXPECT_EXTENSION);
        let expected = match fs::read_to_string(&expect_path) {
            Ok(expected) => expected,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TestOutcome::passed(name, test_path)),
            Err(e) => {
                return Ok(TestOutcome::failed(
                    name,
                    test_path,
                    format!("Cannot read expected output '{}': {}", expect_path.display(), e),
                ));
            }
        };

        if normalize_output(&stdout) == normalize_output(&expected) {
            return Ok(TestOutcome::passed(name, test_path));
        }

        write_artifacts(test_path, &stdout, &expected)?;
        Ok(TestOutcome::failed(name, test_path, "Output does not match expected output"))
    }
}

/// Display name of a test: its file stem.
fn test_name(test_path: &Path) -> String {
    test_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| test_path.display().to_string())
}

fn skip_message(stdout: &str) -> Option<String> {
    stdout
        .trim_start()
        .strip_prefix(SKIP_MARKER)
        .map(|rest| rest.trim().to_string())
}

fn exit_failure_message(status: ExitStatus, stderr: &str) -> String {
    let mut message = match status.code() {
        Some(code) => format!("Exited with error code {} (expected 0)", code),
        None => "Terminated by signal".to_string(),
    };
    if let Some(line) = stderr.lines().map(str::trim).rev().find(|line| !line.is_empty()) {
        message.push_str(": ");
        message.push_str(line);
    }
    message
}

/// Trailing whitespace is not significant, per line or at the end.
fn normalize_output(text: &str) -> String {
    text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n").trim_end().to_string()
}

fn write_artifacts(test_path: &Path, actual: &str, expected: &str) -> io::Result<()> {
    let base = output_basename(test_path);
    if let Some(dir) = base.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(with_suffix(&base, ".actual"), actual)?;
    fs::write(with_suffix(&base, ".expected"), expected)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
