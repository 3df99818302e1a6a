//! agent.rs
//!
//! One LLM backend serving every text role of a run.

use crate::llm::backend::LlmBackend;
use crate::llm::cache::ResponseCache;
use crate::llm::parse::{parse_classification, parse_preference};
use crate::llm::prompt::{self, LlmPrompt};
use crate::llm::{
    CandidateGenerator, Classification, CodeRefiner, GeneralAnswerer, PreferenceModel,
    QualityJudge, RequestClassifier, TestCaseGenerator, TestFormatter,
};
use crate::state::TaskSpec;
use crate::testgen::candidate::CaseKind;

pub struct LlmAgent {
    backend: LlmBackend,
    cache: ResponseCache,
}

impl LlmAgent {
    pub fn new(backend: LlmBackend) -> Self {
        Self {
            backend,
            cache: ResponseCache::new(),
        }
    }

    /// Fresh completion. Used where repeated prompts should yield
    /// different answers.
    fn complete(&self, prompt: &LlmPrompt) -> Result<String, String> {
        self.backend.run(prompt)
    }

    fn complete_cached(&self, prompt: &LlmPrompt) -> Result<String, String> {
        let key = crate::llm::client::hash_prompt(prompt);
        self.cache.get_or_try_insert(&key, || self.complete(prompt))
    }
}

impl RequestClassifier for LlmAgent {
    fn classify(&self, user_input: &str) -> Result<Classification, String> {
        let reply = self.complete(&prompt::classify_prompt(user_input))?;
        parse_classification(&reply)
    }
}

impl GeneralAnswerer for LlmAgent {
    fn answer(&self, user_input: &str) -> Result<String, String> {
        self.complete(&prompt::answer_prompt(user_input))
            .map(|t| t.trim().to_string())
    }
}

impl CandidateGenerator for LlmAgent {
    fn generate_candidates(
        &self,
        task: &TaskSpec,
        count: usize,
        feedback: Option<&str>,
    ) -> Result<Vec<String>, String> {
        let p = prompt::candidate_prompt(task, feedback);
        (0..count).map(|_| self.complete(&p)).collect()
    }
}

impl TestCaseGenerator for LlmAgent {
    fn generate_cases(&self, task: &TaskSpec, kind: CaseKind, count: usize) -> Result<Vec<String>, String> {
        let p = prompt::test_case_prompt(task, kind);
        (0..count).map(|_| self.complete(&p)).collect()
    }
}

impl TestFormatter for LlmAgent {
    fn format_case(&self, raw: &str) -> Result<String, String> {
        self.complete_cached(&prompt::format_prompt(raw))
    }
}

impl PreferenceModel for LlmAgent {
    fn prefer(&self, left: &str, right: &str) -> Result<f64, String> {
        self.complete_cached(&prompt::preference_prompt(left, right))
            .map(|reply| parse_preference(&reply))
    }
}

impl QualityJudge for LlmAgent {
    fn judge(&self, code: &str) -> Result<String, String> {
        self.complete_cached(&prompt::judge_prompt(code))
    }
}

impl CodeRefiner for LlmAgent {
    fn refine(&self, code: &str, evaluation_summary: &str) -> Result<String, String> {
        self.complete(&prompt::refine_prompt(code, evaluation_summary))
    }
}
