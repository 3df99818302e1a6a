//! stages.rs
//!
//! Stage bodies and routing functions. Every stage reads the state and
//! returns only the fields it writes.

use std::collections::HashMap;

use crate::executor::{Reports, Verdict};
use crate::logger::{log, RunLog};
use crate::scoring::{evaluation_summary, ScoringEngine};
use crate::state::{
    LogLevel, Outcome, RegenerationInput, RequestType, StateUpdate, TaskSpec, TestSelection,
    WorkflowState,
};
use crate::testgen::candidate::{Candidate, CandidateId, CaseKind, FormattedTest, TestCase};
use crate::testgen::format::{clean_code_block, format_suite};
use crate::testgen::select::{resolve, ComplexitySelector, TestSelector};
use crate::workflow::pipeline::Pipeline;

pub mod names {
    pub const CLASSIFY: &str = "classify";
    pub const ANSWER: &str = "answer";
    pub const GENERATE_CANDIDATES: &str = "generate_candidates";
    pub const GENERATE_TESTS: &str = "generate_tests";
    pub const FORMAT_TESTS: &str = "format_tests";
    pub const SELECT_TESTS: &str = "select_tests";
    pub const FILTER_PHASE1: &str = "filter_phase1";
    pub const FILTER_PHASE2: &str = "filter_phase2";
    pub const SCORE_AND_RANK: &str = "score_and_rank";
    pub const OPTIMIZE_BEST: &str = "optimize_best";
    pub const EXHAUSTED: &str = "exhausted";
}

/// Lines of sandbox output quoted per failed candidate in regeneration feedback.
const FEEDBACK_TAIL_LINES: usize = 12;

/* ============================================================
   Intake
   ============================================================ */

pub fn classify(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let input = state.input();

    let (request_type, task) = match p.collab.classifier.classify(input) {
        Ok(c) => (c.request_type, c.task),
        Err(e) => {
            log(
                run,
                LogLevel::Warn,
                format!("Classification failed, treating input as a code request: {e}"),
            );
            (
                RequestType::CodeRequest,
                TaskSpec {
                    domain_text: input.to_string(),
                    ..TaskSpec::default()
                },
            )
        }
    };

    log(
        run,
        LogLevel::Info,
        format!("Request classified as {}", request_label(request_type)),
    );

    StateUpdate {
        request_type: Some(request_type),
        task: Some(task),
        ..StateUpdate::default()
    }
}

pub fn answer(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    match p.collab.answerer.answer(state.input()) {
        Ok(text) => {
            log(run, LogLevel::Success, "General answer ready");
            StateUpdate {
                general_answer: Some(text),
                outcome: Some(Outcome::Answered),
                ..StateUpdate::default()
            }
        }
        Err(e) => {
            log(run, LogLevel::Error, format!("Answering failed: {e}"));
            StateUpdate {
                outcome: Some(Outcome::NoResult),
                ..StateUpdate::default()
            }
        }
    }
}

/* ============================================================
   Generation
   ============================================================ */

pub fn generate_candidates(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let attempt = state.attempts() + 1;
    let task = state.task.clone().unwrap_or_default();

    let feedback = match (state.regenerate, &state.regeneration_input) {
        (Some(true), Some(input)) => Some(failure_feedback(input)),
        _ => None,
    };

    if attempt > 1 {
        log(
            run,
            LogLevel::Warn,
            format!("No survivors, regenerating candidates (round {attempt})"),
        );
    }

    let raws = match p
        .collab
        .generator
        .generate_candidates(&task, p.settings.candidate_count, feedback.as_deref())
    {
        Ok(r) => r,
        Err(e) => {
            log(run, LogLevel::Error, format!("Candidate generation failed: {e}"));
            Vec::new()
        }
    };

    let candidates = Candidate::batch(raws);
    log(
        run,
        LogLevel::Info,
        format!("Round {attempt}: {} candidates generated", candidates.len()),
    );

    // Results of an earlier round must not leak into this one.
    StateUpdate {
        attempts: Some(attempt),
        candidates: Some(candidates),
        phase1_report: Some(Reports::new()),
        filtered: Some(Vec::new()),
        phase2_report: Some(Reports::new()),
        validated: Some(Vec::new()),
        regenerate: Some(false),
        ..StateUpdate::default()
    }
}

pub fn generate_tests(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let task = state.task.clone().unwrap_or_default();

    let mut generate = |kind: CaseKind| -> Vec<TestCase> {
        match p.collab.test_generator.generate_cases(&task, kind, p.settings.test_count) {
            Ok(raws) => raws.into_iter().map(|r| TestCase::new(kind, r)).collect(),
            Err(e) => {
                log(
                    run,
                    LogLevel::Error,
                    format!("Generating {} test cases failed: {e}", kind.as_str()),
                );
                Vec::new()
            }
        }
    };

    let valid = generate(CaseKind::Valid);
    let invalid = generate(CaseKind::Invalid);

    log(
        run,
        LogLevel::Info,
        format!("{} valid and {} invalid test cases generated", valid.len(), invalid.len()),
    );

    StateUpdate {
        valid_tests: Some(valid),
        invalid_tests: Some(invalid),
        ..StateUpdate::default()
    }
}

pub fn format_tests(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let valid = state.valid_tests.as_deref().unwrap_or_default();
    let invalid = state.invalid_tests.as_deref().unwrap_or_default();

    let (formatted_valid, formatted_invalid) =
        format_suite(p.collab.formatter.as_ref(), valid, invalid, run);

    StateUpdate {
        formatted_valid: Some(formatted_valid),
        formatted_invalid: Some(formatted_invalid),
        ..StateUpdate::default()
    }
}

pub fn select_tests(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let valid = state.formatted_valid.as_deref().unwrap_or_default();
    let invalid = state.formatted_invalid.as_deref().unwrap_or_default();

    let picks = match p.collab.selector.select(valid, invalid) {
        Ok(picks) => picks,
        Err(e) => {
            log(
                run,
                LogLevel::Warn,
                format!("Test selection failed, picking automatically: {e}"),
            );
            ComplexitySelector.select(valid, invalid).unwrap_or_default()
        }
    };

    let selection = TestSelection {
        valid: resolve(valid, picks.valid).cloned(),
        invalid: resolve(invalid, picks.invalid).cloned(),
    };

    log(
        run,
        LogLevel::Info,
        format!(
            "Selected {} (valid) and {} (invalid) for the first pass",
            test_label(selection.valid.as_ref()),
            test_label(selection.invalid.as_ref())
        ),
    );

    StateUpdate {
        selection: Some(selection),
        ..StateUpdate::default()
    }
}

/* ============================================================
   Filtering
   ============================================================ */

pub fn filter_phase1(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let candidates = state.candidates.as_deref().unwrap_or_default();
    let suite = state.selection.as_ref().map(|s| s.suite()).unwrap_or_default();

    log(
        run,
        LogLevel::Info,
        format!("Phase 1: {} candidates against {} selected tests", candidates.len(), suite.len()),
    );

    let result = p.sandbox.run(candidates, &suite, run);
    let regenerate = result.survivors.is_empty();

    StateUpdate {
        regeneration_input: Some(RegenerationInput {
            failed_codes: result.failed_codes(),
            failure_reports: result.reports.clone(),
        }),
        phase1_report: Some(result.reports),
        filtered: Some(result.survivors),
        regenerate: Some(regenerate),
        ..StateUpdate::default()
    }
}

pub fn filter_phase2(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let filtered = state.filtered.as_deref().unwrap_or_default();
    let suite = state.full_suite();

    log(
        run,
        LogLevel::Info,
        format!("Phase 2: {} survivors against the full suite of {} tests", filtered.len(), suite.len()),
    );

    let result = p.sandbox.run(filtered, &suite, run);
    let regenerate = result.survivors.is_empty();

    StateUpdate {
        regeneration_input: Some(RegenerationInput {
            failed_codes: result.failed_codes(),
            failure_reports: result.reports.clone(),
        }),
        phase2_report: Some(result.reports),
        validated: Some(result.survivors),
        regenerate: Some(regenerate),
        ..StateUpdate::default()
    }
}

pub fn exhausted(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    log(
        run,
        LogLevel::Error,
        format!(
            "Validation exhausted: no candidate survived after {} rounds (max regenerations {})",
            state.attempts(),
            p.settings.max_regenerations
        ),
    );

    StateUpdate {
        scoring_results: Some(Vec::new()),
        evaluation_summary: Some(String::new()),
        outcome: Some(Outcome::ValidationExhausted),
        ..StateUpdate::default()
    }
}

/// Feedback handed to the generator after a round without survivors.
pub fn failure_feedback(input: &RegenerationInput) -> String {
    let mut out = String::new();

    for (id, report) in &input.failure_reports {
        if report.passed {
            continue;
        }

        let verdict = match report.verdict {
            Verdict::Passed => "passed",
            Verdict::Failed => "failed tests",
            Verdict::TimedOut => "timed out",
            Verdict::Crashed => "could not run",
        };
        out.push_str(&format!("{id}: {verdict}\n"));

        let lines: Vec<&str> = report.raw_output.lines().collect();
        let start = lines.len().saturating_sub(FEEDBACK_TAIL_LINES);
        for line in &lines[start..] {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/* ============================================================
   Ranking
   ============================================================ */

pub fn score_and_rank(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let validated = state.validated.as_deref().unwrap_or_default();

    if validated.is_empty() {
        log(run, LogLevel::Warn, "Nothing to score");
        return StateUpdate {
            scoring_results: Some(Vec::new()),
            evaluation_summary: Some(String::new()),
            outcome: Some(Outcome::NoResult),
            ..StateUpdate::default()
        };
    }

    let test_results: HashMap<CandidateId, Vec<bool>> = state
        .phase2_report
        .iter()
        .flatten()
        .map(|(id, r)| (*id, r.per_test_results.clone()))
        .collect();

    let engine = ScoringEngine::standard(
        p.collab.embedder.clone(),
        p.collab.preference.clone(),
        p.collab.judge.clone(),
        test_results,
    );

    let ranked = engine.score(validated, run);
    let summary = evaluation_summary(&ranked);
    let best = ranked.first().map(|e| e.code.clone());

    if let Some(top) = ranked.first() {
        log(
            run,
            LogLevel::Success,
            format!("Best candidate: {} (total {})", top.code_id, top.total_score),
        );
    }

    StateUpdate {
        scoring_results: Some(ranked),
        best_code: best,
        evaluation_summary: Some(summary),
        outcome: Some(Outcome::Ranked),
        ..StateUpdate::default()
    }
}

pub fn optimize_best(p: &Pipeline, state: &WorkflowState, run: &mut RunLog) -> StateUpdate {
    let Some(best) = state.best_code.as_deref() else {
        return StateUpdate::default();
    };
    let summary = state.evaluation_summary.as_deref().unwrap_or("");

    match p.collab.refiner.refine(best, summary) {
        Ok(raw) => {
            let optimized = clean_code_block(&raw);
            let diff = similar::TextDiff::from_lines(best, optimized.as_str())
                .unified_diff()
                .header("best", "optimized")
                .to_string();

            log(run, LogLevel::Success, "Best candidate optimized");
            StateUpdate {
                optimized_code: Some(optimized),
                optimized_diff: Some(diff),
                ..StateUpdate::default()
            }
        }
        Err(e) => {
            log(run, LogLevel::Warn, format!("Optimization failed, keeping best candidate: {e}"));
            StateUpdate::default()
        }
    }
}

/* ============================================================
   Routing
   ============================================================ */

pub fn route_request(state: &WorkflowState) -> &'static str {
    match state.request_type {
        Some(RequestType::General) => "general",
        _ => "code_request",
    }
}

pub fn route_after_filter(p: &Pipeline, state: &WorkflowState) -> &'static str {
    if state.regenerate != Some(true) {
        "survivors"
    } else if state.attempts() > p.settings.max_regenerations {
        "exhausted"
    } else {
        "regenerate"
    }
}

pub fn route_after_scoring(p: &Pipeline, state: &WorkflowState) -> &'static str {
    if p.settings.optimize && state.best_code.is_some() {
        "optimize"
    } else {
        "done"
    }
}

fn test_label(t: Option<&FormattedTest>) -> &str {
    t.map(|t| t.name.as_str()).unwrap_or("none")
}

fn request_label(t: RequestType) -> &'static str {
    match t {
        RequestType::General => "general question",
        RequestType::CodeRequest => "code request",
    }
}
