//! executor/mod.rs
//!
//! Execution sandbox. Each candidate is glued to the whole suite and run
//! in its own scratch directory, one after another.

pub mod parse;
pub mod run;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::executor::parse::parse_test_markers;
use crate::executor::run::{run_unit, UnitExit};
use crate::logger::{log, RunLog};
use crate::state::LogLevel;
use crate::testgen::candidate::{Candidate, CandidateId};
use crate::testgen::format::rename_tests;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Interpreter; the unit file path is appended after `args`.
    pub program: String,
    pub args: Vec<String>,
    pub file_suffix: String,
    pub timeout: Duration,
    /// Parent for scratch directories. System temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            args: vec!["-m".into(), "pytest".into(), "-q".into(), "--tb=short".into()],
            file_suffix: "_test.py".into(),
            timeout: DEFAULT_TIMEOUT,
            scratch_root: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    TimedOut,
    Crashed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Every test in the suite passed.
    pub passed: bool,
    pub verdict: Verdict,
    pub raw_output: String,
    /// Positional, suite order. Empty when the output had no marker line.
    pub per_test_results: Vec<bool>,
    pub code: String,
    pub duration_ms: u64,
}

pub type Reports = BTreeMap<CandidateId, ExecutionReport>;

#[derive(Debug, Clone, Default)]
pub struct SandboxRun {
    pub reports: Reports,
    /// Passing candidates, input order.
    pub survivors: Vec<Candidate>,
}

impl SandboxRun {
    pub fn failed_codes(&self) -> Vec<String> {
        self.reports.values().map(|r| r.code.clone()).collect()
    }
}

pub struct Sandbox {
    cfg: SandboxConfig,
}

impl Sandbox {
    pub fn new(cfg: SandboxConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.cfg
    }

    /// Run every candidate against the full `tests` suite.
    pub fn run(&self, candidates: &[Candidate], tests: &[String], run: &mut RunLog) -> SandboxRun {
        let renamed = rename_tests(tests);
        let suite = renamed.join("\n\n");

        let mut out = SandboxRun::default();

        for candidate in candidates {
            let report = self.run_one(candidate, &suite);

            let (level, label) = match report.verdict {
                Verdict::Passed => (LogLevel::Success, "PASSED"),
                Verdict::Failed => (LogLevel::Warn, "FAILED"),
                Verdict::TimedOut => (LogLevel::Warn, "TIMED OUT"),
                Verdict::Crashed => (LogLevel::Error, "CRASHED"),
            };
            log(
                run,
                level,
                format!("Testing {}... {label} ({} ms)", candidate.id, report.duration_ms),
            );

            if report.passed {
                out.survivors.push(candidate.clone());
            }
            out.reports.insert(candidate.id, report);
        }

        log(
            run,
            LogLevel::Info,
            format!(
                "{} out of {} candidates passed all {} tests.",
                out.survivors.len(),
                candidates.len(),
                tests.len()
            ),
        );

        out
    }

    fn run_one(&self, candidate: &Candidate, suite: &str) -> ExecutionReport {
        let source = format!("{}\n\n{}\n", candidate.code, suite);
        let unit = run_unit(&self.cfg, &source);

        let verdict = match &unit.exit {
            UnitExit::Exited(status) if status.success() => Verdict::Passed,
            UnitExit::Exited(_) => Verdict::Failed,
            UnitExit::TimedOut => Verdict::TimedOut,
            UnitExit::Crashed(_) => Verdict::Crashed,
        };

        ExecutionReport {
            passed: verdict == Verdict::Passed,
            verdict,
            per_test_results: parse_test_markers(&unit.output),
            raw_output: unit.output,
            code: candidate.code.clone(),
            duration_ms: unit.duration_ms,
        }
    }
}

#[cfg(all(test, unix))]
pub(crate) mod testing {
    //! Shell-backed sandbox used by tests across the crate.
    //!
    //! A candidate defines `f`; each test calls it and prints `.` or `F`.
    //! An EXIT trap ends the marker line and sets the exit status, which
    //! is 5 when no test ran, as with pytest.

    use std::path::Path;
    use std::time::Duration;

    use super::SandboxConfig;

    pub fn shell_config(scratch_root: Option<&Path>) -> SandboxConfig {
        SandboxConfig {
            program: "sh".into(),
            args: Vec::new(),
            file_suffix: ".sh".into(),
            timeout: Duration::from_secs(5),
            scratch_root: scratch_root.map(Path::to_path_buf),
        }
    }

    /// Candidate whose `f` succeeds unless its argument is one of `rejects`.
    pub fn shell_candidate(rejects: &[&str]) -> String {
        let body = if rejects.is_empty() {
            "f() { return 0; }".to_string()
        } else {
            let cases = rejects.join("|");
            format!("f() {{ case \"$1\" in {cases}) return 1;; esac; return 0; }}")
        };
        format!("```sh\nfail=0\nran=\ntrap 'echo; [ -n \"$ran\" ] || exit 5; exit $fail' EXIT\n{body}\n```")
    }

    pub fn shell_test(arg: &str) -> String {
        format!("ran=1; if f {arg}; then printf .; else printf F; fail=1; fi")
    }
}
