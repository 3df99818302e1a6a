use std::time::Instant;

use serde::Serialize;

use crate::executor::Reports;
use crate::scoring::ScoreEntry;
use crate::testgen::candidate::{Candidate, FormattedTest, TestCase};

pub const MAX_LOGS: usize = 1000;

/* ---------- logging ---------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
    pub at: Instant,
}

/* ---------- request ---------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    General,
    CodeRequest,
}

/// What the candidates are supposed to implement, as extracted from the user input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaskSpec {
    pub domain_text: String,
    pub assumptions: String,
    /// Ordered; candidates must take their inputs in exactly this order.
    pub input_variables: Vec<String>,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Answered,
    Ranked,
    NoResult,
    ValidationExhausted,
}

/* ---------- selection / regeneration ---------- */

#[derive(Clone, Debug, Default, Serialize)]
pub struct TestSelection {
    pub valid: Option<FormattedTest>,
    pub invalid: Option<FormattedTest>,
}

impl TestSelection {
    /// Selected tests in suite order: valid first, then invalid.
    pub fn suite(&self) -> Vec<String> {
        self.valid
            .iter()
            .chain(self.invalid.iter())
            .map(|t| t.code.clone())
            .collect()
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RegenerationInput {
    pub failed_codes: Vec<String>,
    pub failure_reports: Reports,
}

/* ---------- workflow state ---------- */

/// The single record threaded through every stage of a run.
///
/// Stages never touch it directly: they return a partial record (a
/// [`StateUpdate`]) and the engine merges it. Every `Some` field of an
/// update replaces the stored value wholesale.
#[derive(Clone, Debug, Default)]
pub struct WorkflowState {
    /* input */
    pub user_input: Option<String>,
    pub request_type: Option<RequestType>,
    pub task: Option<TaskSpec>,
    pub general_answer: Option<String>,

    /* generation */
    pub attempts: Option<u32>,
    pub candidates: Option<Vec<Candidate>>,
    pub valid_tests: Option<Vec<TestCase>>,
    pub invalid_tests: Option<Vec<TestCase>>,
    pub formatted_valid: Option<Vec<FormattedTest>>,
    pub formatted_invalid: Option<Vec<FormattedTest>>,
    pub selection: Option<TestSelection>,

    /* filtering */
    pub phase1_report: Option<Reports>,
    pub filtered: Option<Vec<Candidate>>,
    pub phase2_report: Option<Reports>,
    pub validated: Option<Vec<Candidate>>,
    pub regenerate: Option<bool>,
    pub regeneration_input: Option<RegenerationInput>,

    /* ranking */
    pub scoring_results: Option<Vec<ScoreEntry>>,
    pub best_code: Option<String>,
    pub evaluation_summary: Option<String>,
    pub optimized_code: Option<String>,
    pub optimized_diff: Option<String>,

    pub outcome: Option<Outcome>,

    /// Stage names in execution order. Owned by the engine.
    pub visited: Vec<&'static str>,
}

/// A partial record returned by a stage.
pub type StateUpdate = WorkflowState;

impl WorkflowState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: Some(user_input.into()),
            ..Self::default()
        }
    }

    pub fn merge(&mut self, update: StateUpdate) {
        macro_rules! replace {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(v) = update.$field {
                        self.$field = Some(v);
                    }
                )*
            };
        }

        replace!(
            user_input,
            request_type,
            task,
            general_answer,
            attempts,
            candidates,
            valid_tests,
            invalid_tests,
            formatted_valid,
            formatted_invalid,
            selection,
            phase1_report,
            filtered,
            phase2_report,
            validated,
            regenerate,
            regeneration_input,
            scoring_results,
            best_code,
            evaluation_summary,
            optimized_code,
            optimized_diff,
            outcome,
        );
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(0)
    }

    pub fn input(&self) -> &str {
        self.user_input.as_deref().unwrap_or("")
    }

    /// Full phase-2 suite: every formatted valid case, then every invalid one.
    pub fn full_suite(&self) -> Vec<String> {
        self.formatted_valid
            .iter()
            .flatten()
            .chain(self.formatted_invalid.iter().flatten())
            .map(|t| t.code.clone())
            .collect()
    }
}
