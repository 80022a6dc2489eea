//! Console reporting for test runs
//!
//! `ConsoleReporter` prints one progress character per test while the run is in
//! progress, then detail blocks and a summary line. Every byte written to the
//! primary output is mirrored to the live log when one is attached, so the log
//! file is an exact copy of what the terminal showed.
//!
//! Failed tests are additionally listed in the diff log, one line per failure:
//!
//! ```text
//! <index> <test path> <base>.actual <base>.expected
//! ```

use std::io::{self, Write};
use std::path::Path;

use super::test_interfaces::{output_basename, with_suffix};
use super::test_runner::{RunResult, TestOutcome};

/// Trait for reporting test execution results.
///
/// Implement this trait to customize the output format.
pub trait TestReporter {
    /// Called as soon as a test has produced its outcome
    fn on_test_complete(&mut self, outcome: &TestOutcome) -> io::Result<()>;

    /// Called once after the last test
    fn on_run_complete(&mut self, result: &RunResult) -> io::Result<()>;
}

/// Default console reporter
pub struct ConsoleReporter<W: Write> {
    out: W,
    live_log: Option<Box<dyn Write>>,
    diff_log: Option<Box<dyn Write>>,
    display_skipped: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, display_skipped: bool) -> Self {
        Self {
            out,
            live_log: None,
            diff_log: None,
            display_skipped,
        }
    }

    /// Mirror all output to `log`.
    pub fn with_live_log(mut self, log: Box<dyn Write>) -> Self {
        self.live_log = Some(log);
        self
    }

    /// Record failed tests in `log`.
    pub fn with_diff_log(mut self, log: Box<dyn Write>) -> Self {
        self.diff_log = Some(log);
        self
    }

    /// Give back the primary output.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        if let Some(log) = self.live_log.as_mut() {
            log.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        if let Some(log) = self.live_log.as_mut() {
            log.flush()?;
        }
        if let Some(log) = self.diff_log.as_mut() {
            log.flush()?;
        }
        Ok(())
    }

    fn emit_detail(&mut self, index: usize, outcome: &TestOutcome) -> io::Result<()> {
        self.emit(&detail_entry(index, outcome))
    }

    fn log_diff(&mut self, index: usize, test_path: &Path) -> io::Result<()> {
        if let Some(log) = self.diff_log.as_mut() {
            log.write_all(diff_log_entry(index, test_path).as_bytes())?;
        }
        Ok(())
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_test_complete(&mut self, outcome: &TestOutcome) -> io::Result<()> {
        let mut buf = [0; 4];
        self.emit(outcome.progress_char().encode_utf8(&mut buf))?;
        self.flush()
    }

    fn on_run_complete(&mut self, result: &RunResult) -> io::Result<()> {
        let summary = result.summary();

        if self.display_skipped && summary.skipped > 0 {
            self.emit("\n\nSkipped:\n")?;
            for (i, outcome) in result.skipped().iter().enumerate() {
                self.emit_detail(i + 1, outcome)?;
            }
        }

        if summary.total == 0 {
            self.emit("No tests found\n")?;
        } else if summary.failed > 0 {
            self.emit("\n\nFailures:\n")?;
            for (i, outcome) in result.failed().iter().enumerate() {
                self.emit_detail(i + 1, outcome)?;
                self.log_diff(i + 1, outcome.path())?;
            }
            self.emit(&format!(
                "\nFAILURES! ({} tests, {} failures, {} skipped)\n",
                summary.total, summary.failed, summary.skipped
            ))?;
        } else {
            self.emit(&format!("\n\nOK ({} tests, {} skipped)\n", summary.total, summary.skipped))?;
        }

        self.flush()
    }
}

/// One numbered entry of a skipped/failed detail block.
pub fn detail_entry(index: usize, outcome: &TestOutcome) -> String {
    format!(
        "\n{}) {}\n   {}\n   {}\n",
        index,
        outcome.name(),
        outcome.message().unwrap_or_default(),
        outcome.path().display()
    )
}

/// One diff-log line, newline included.
pub fn diff_log_entry(index: usize, test_path: &Path) -> String {
    let base = output_basename(test_path);
    format!(
        "{} {} {} {}\n",
        index,
        test_path.display(),
        with_suffix(&base, ".actual").display(),
        with_suffix(&base, ".expected").display()
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Cloneable in-memory sink so a test can read what the reporter wrote.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn report(outcomes: Vec<TestOutcome>, display_skipped: bool) -> (String, String, String) {
        let live = SharedBuffer::default();
        let diff = SharedBuffer::default();
        let mut reporter = ConsoleReporter::new(Vec::new(), display_skipped)
            .with_live_log(Box::new(live.clone()))
            .with_diff_log(Box::new(diff.clone()));

        let mut result = RunResult::default();
        for outcome in outcomes {
            reporter.on_test_complete(&outcome).unwrap();
            result.record(outcome);
        }
        reporter.on_run_complete(&result).unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        (out, live.contents(), diff.contents())
    }

    #[test]
    fn test_no_tests_found() {
        let (out, live, diff) = report(Vec::new(), true);
        assert_eq!(out, "No tests found\n");
        assert_eq!(live, out);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_all_passed() {
        let (out, live, diff) = report(
            vec![TestOutcome::passed("one", "t/one.phpt"), TestOutcome::passed("two", "t/two.phpt")],
            false,
        );
        assert_eq!(out, "..\n\nOK (2 tests, 0 skipped)\n");
        assert_eq!(live, out);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_skips_hidden_by_default() {
        let (out, _, _) = report(
            vec![
                TestOutcome::passed("one", "one.phpt"),
                TestOutcome::skipped("two", "two.phpt", "requires extension X"),
            ],
            false,
        );
        assert_eq!(out, ".s\n\nOK (2 tests, 1 skipped)\n");
    }

    #[test]
    fn test_skipped_block_precedes_summary() {
        let (out, live, _) = report(
            vec![TestOutcome::skipped("needs x", "t/x.phpt", "requires extension X")],
            true,
        );
        assert_eq!(
            out,
            "s\n\nSkipped:\n\n1) needs x\n   requires extension X\n   t/x.phpt\n\n\nOK (1 tests, 1 skipped)\n"
        );
        assert_eq!(live, out);
    }

    #[test]
    fn test_failures_block_and_diff_log() {
        let (out, live, diff) = report(
            vec![
                TestOutcome::failed("first", "a/b/c.phpt", "assertion mismatch"),
                TestOutcome::passed("ok", "ok.phpt"),
                TestOutcome::skipped("later", "later.phpt", "not today"),
                TestOutcome::failed("second", "bad.phpt", "Exited with error code 255 (expected 0)"),
            ],
            false,
        );

        assert_eq!(
            out,
            "F.sF\n\nFailures:\n\
             \n1) first\n   assertion mismatch\n   a/b/c.phpt\n\
             \n2) second\n   Exited with error code 255 (expected 0)\n   bad.phpt\n\
             \nFAILURES! (4 tests, 2 failures, 1 skipped)\n"
        );
        assert_eq!(live, out);
        assert_eq!(
            diff,
            "1 a/b/c.phpt a/b/output/c.actual a/b/output/c.expected\n\
             2 bad.phpt output/bad.actual output/bad.expected\n"
        );
    }

    #[test]
    fn test_skipped_and_failed_blocks_together() {
        let (out, _, _) = report(
            vec![
                TestOutcome::skipped("s", "s.phpt", "why"),
                TestOutcome::failed("f", "f.phpt", "what"),
            ],
            true,
        );
        assert_eq!(
            out,
            "sF\n\nSkipped:\n\n1) s\n   why\n   s.phpt\n\n\nFailures:\n\n1) f\n   what\n   f.phpt\n\
             \nFAILURES! (2 tests, 1 failures, 1 skipped)\n"
        );
    }

    #[test]
    fn test_diff_log_entry() {
        assert_eq!(
            diff_log_entry(1, Path::new("bad.phpt")),
            "1 bad.phpt output/bad.actual output/bad.expected\n"
        );
        assert_eq!(
            diff_log_entry(3, Path::new("a.test.phpt")),
            "3 a.test.phpt output/a.test.actual output/a.test.expected\n"
        );
    }

    #[test]
    fn test_without_logs() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        let outcome = TestOutcome::failed("f", "f.phpt", "m");
        reporter.on_test_complete(&outcome).unwrap();
        let mut result = RunResult::default();
        result.record(outcome);
        reporter.on_run_complete(&result).unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.ends_with("\nFAILURES! (1 tests, 1 failures, 0 skipped)\n"));
    }
}
