//! Scripted collaborators for workflow tests.
//!
//! Candidates and tests are shell snippets (see `executor::testing`): a
//! candidate is described by the test arguments it rejects, a test case
//! by the argument it passes to `f`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::executor::testing::{shell_candidate, shell_config, shell_test};
use crate::executor::Sandbox;
use crate::llm::embedding::TokenEmbedder;
use crate::llm::{
    CandidateGenerator, Classification, CodeRefiner, Collaborators, GeneralAnswerer,
    PreferenceModel, QualityJudge, RequestClassifier, TestCaseGenerator, TestFormatter,
};
use crate::state::{RequestType, TaskSpec};
use crate::testgen::candidate::CaseKind;
use crate::testgen::select::ComplexitySelector;
use crate::workflow::pipeline::{Pipeline, RunSettings};

pub struct Script {
    pub request_type: RequestType,
    pub classify_fails: bool,
    /// One entry per generation round; the last one repeats.
    pub rounds: Mutex<VecDeque<Vec<Vec<&'static str>>>>,
    pub feedback_seen: Mutex<Vec<Option<String>>>,
    pub test_calls: Mutex<usize>,
    /// The first this-many test generation calls fail.
    pub test_failures: usize,
    pub valid_args: Vec<String>,
    pub invalid_args: Vec<String>,
}

impl Script {
    pub fn new(rounds: Vec<Vec<Vec<&'static str>>>) -> Self {
        Self {
            request_type: RequestType::CodeRequest,
            classify_fails: false,
            rounds: Mutex::new(rounds.into()),
            feedback_seen: Mutex::new(Vec::new()),
            test_calls: Mutex::new(0),
            test_failures: 0,
            valid_args: (1..=10).map(|i| format!("t{i}")).collect(),
            invalid_args: (1..=10).map(|i| format!("u{i}")).collect(),
        }
    }

    pub fn feedback(&self) -> Vec<Option<String>> {
        self.feedback_seen.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn test_generation_calls(&self) -> usize {
        self.test_calls.lock().map(|c| *c).unwrap_or(0)
    }
}

impl RequestClassifier for Script {
    fn classify(&self, _: &str) -> Result<Classification, String> {
        if self.classify_fails {
            return Err("classifier offline".into());
        }
        Ok(Classification {
            request_type: self.request_type,
            task: TaskSpec {
                domain_text: "accept every argument".into(),
                assumptions: String::new(),
                input_variables: vec!["arg".into()],
            },
        })
    }
}

impl GeneralAnswerer for Script {
    fn answer(&self, user_input: &str) -> Result<String, String> {
        Ok(format!("answer to: {user_input}"))
    }
}

impl CandidateGenerator for Script {
    fn generate_candidates(
        &self,
        _: &TaskSpec,
        _: usize,
        feedback: Option<&str>,
    ) -> Result<Vec<String>, String> {
        if let Ok(mut seen) = self.feedback_seen.lock() {
            seen.push(feedback.map(str::to_string));
        }

        let mut rounds = self.rounds.lock().map_err(|e| e.to_string())?;
        let round = if rounds.len() > 1 {
            rounds.pop_front().unwrap_or_default()
        } else {
            rounds.front().cloned().unwrap_or_default()
        };

        Ok(round.iter().map(|rejects| shell_candidate(rejects)).collect())
    }
}

impl TestCaseGenerator for Script {
    fn generate_cases(&self, _: &TaskSpec, kind: CaseKind, count: usize) -> Result<Vec<String>, String> {
        let call = {
            let mut calls = self.test_calls.lock().map_err(|e| e.to_string())?;
            *calls += 1;
            *calls
        };
        if call <= self.test_failures {
            return Err("test generator offline".into());
        }

        let args = match kind {
            CaseKind::Valid => &self.valid_args,
            CaseKind::Invalid => &self.invalid_args,
        };
        Ok(args
            .iter()
            .take(count)
            .map(|a| format!("{a} <expected>0</expected>"))
            .collect())
    }
}

impl TestFormatter for Script {
    fn format_case(&self, raw: &str) -> Result<String, String> {
        let arg = raw.split_whitespace().next().ok_or("empty test case")?;
        Ok(shell_test(arg))
    }
}

impl PreferenceModel for Script {
    fn prefer(&self, _: &str, _: &str) -> Result<f64, String> {
        Ok(0.5)
    }
}

impl QualityJudge for Script {
    fn judge(&self, _: &str) -> Result<String, String> {
        Ok("7".into())
    }
}

impl CodeRefiner for Script {
    fn refine(&self, code: &str, _: &str) -> Result<String, String> {
        Ok(format!("```sh\n# refined\n{code}\n```"))
    }
}

pub fn collaborators(script: Arc<Script>) -> Collaborators {
    Collaborators {
        classifier: script.clone(),
        answerer: script.clone(),
        generator: script.clone(),
        test_generator: script.clone(),
        formatter: script.clone(),
        selector: Arc::new(ComplexitySelector),
        preference: script.clone(),
        embedder: Arc::new(TokenEmbedder::default()),
        judge: script.clone(),
        refiner: script,
    }
}

pub fn pipeline(script: Arc<Script>, settings: RunSettings) -> Pipeline {
    Pipeline::new(settings, collaborators(script), Sandbox::new(shell_config(None)))
}
