//! pipeline.rs
//!
//! Wires the stages into the workflow graph and runs it.

use crate::executor::Sandbox;
use crate::llm::Collaborators;
use crate::logger::{log, RunLog};
use crate::state::{LogLevel, WorkflowState};
use crate::workflow::graph::{Graph, Target};
use crate::workflow::stages::{self, names};

/// Stages one generation round can visit, generation through phase 2.
const STAGES_PER_ROUND: usize = 6;
/// classify, score_and_rank or exhausted, optimize_best, plus one spare.
const STAGES_OUTSIDE_ROUNDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub candidate_count: usize,
    /// Per kind: this many valid and this many invalid cases.
    pub test_count: usize,
    pub max_regenerations: u32,
    pub optimize: bool,
}

impl RunSettings {
    /// Upper bound on stage executions for a run that uses every round.
    pub fn step_budget(&self) -> usize {
        (self.max_regenerations as usize + 1) * STAGES_PER_ROUND + STAGES_OUTSIDE_ROUNDS
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            candidate_count: 3,
            test_count: 10,
            max_regenerations: 3,
            optimize: false,
        }
    }
}

pub struct Pipeline {
    pub settings: RunSettings,
    pub collab: Collaborators,
    pub sandbox: Sandbox,
}

impl Pipeline {
    pub fn new(settings: RunSettings, collab: Collaborators, sandbox: Sandbox) -> Self {
        Self {
            settings,
            collab,
            sandbox,
        }
    }

    pub fn graph(&self) -> Graph<'_> {
        use names::*;

        Graph::new()
            .stage(CLASSIFY, |s, l| stages::classify(self, s, l))
            .stage(ANSWER, |s, l| stages::answer(self, s, l))
            .stage(GENERATE_CANDIDATES, |s, l| stages::generate_candidates(self, s, l))
            .stage(GENERATE_TESTS, |s, l| stages::generate_tests(self, s, l))
            .stage(FORMAT_TESTS, |s, l| stages::format_tests(self, s, l))
            .stage(SELECT_TESTS, |s, l| stages::select_tests(self, s, l))
            .stage(FILTER_PHASE1, |s, l| stages::filter_phase1(self, s, l))
            .stage(FILTER_PHASE2, |s, l| stages::filter_phase2(self, s, l))
            .stage(SCORE_AND_RANK, |s, l| stages::score_and_rank(self, s, l))
            .stage(OPTIMIZE_BEST, |s, l| stages::optimize_best(self, s, l))
            .stage(EXHAUSTED, |s, l| stages::exhausted(self, s, l))
            .entry(CLASSIFY)
            .max_steps(self.settings.step_budget())
            .branch(
                CLASSIFY,
                stages::route_request,
                &[
                    ("general", Target::Stage(ANSWER)),
                    ("code_request", Target::Stage(GENERATE_CANDIDATES)),
                ],
            )
            .edge(ANSWER, Target::End)
            .edge(GENERATE_CANDIDATES, Target::Stage(GENERATE_TESTS))
            .edge(GENERATE_TESTS, Target::Stage(FORMAT_TESTS))
            .edge(FORMAT_TESTS, Target::Stage(SELECT_TESTS))
            .edge(SELECT_TESTS, Target::Stage(FILTER_PHASE1))
            .branch(
                FILTER_PHASE1,
                |s| stages::route_after_filter(self, s),
                &[
                    ("survivors", Target::Stage(FILTER_PHASE2)),
                    ("regenerate", Target::Stage(GENERATE_CANDIDATES)),
                    ("exhausted", Target::Stage(EXHAUSTED)),
                ],
            )
            .branch(
                FILTER_PHASE2,
                |s| stages::route_after_filter(self, s),
                &[
                    ("survivors", Target::Stage(SCORE_AND_RANK)),
                    ("regenerate", Target::Stage(GENERATE_CANDIDATES)),
                    ("exhausted", Target::Stage(EXHAUSTED)),
                ],
            )
            .branch(
                SCORE_AND_RANK,
                |s| stages::route_after_scoring(self, s),
                &[
                    ("optimize", Target::Stage(OPTIMIZE_BEST)),
                    ("done", Target::End),
                ],
            )
            .edge(OPTIMIZE_BEST, Target::End)
            .edge(EXHAUSTED, Target::End)
    }

    /// Run one request end to end and hand back the final state.
    pub fn run_workflow(&self, user_input: &str, run: &mut RunLog) -> Result<WorkflowState, String> {
        log(run, LogLevel::Info, "Workflow started");

        let state = self.graph().run(WorkflowState::new(user_input), run)?;

        log(
            run,
            LogLevel::Info,
            format!("Workflow finished after {} stages", state.visited.len()),
        );
        Ok(state)
    }
}
