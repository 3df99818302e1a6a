//! llm/mod.rs
//!
//! Every external text service the workflow talks to, behind one small
//! trait each. The LLM-backed implementations live in `agent.rs`; tests
//! substitute scripted fakes.

pub mod agent;
pub mod backend;
pub mod cache;
pub mod client;
pub mod embedding;
pub mod ollama;
pub mod parse;
pub mod prompt;

use std::sync::Arc;

use crate::state::{RequestType, TaskSpec};
use crate::testgen::candidate::CaseKind;
use crate::testgen::select::TestSelector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub request_type: RequestType,
    pub task: TaskSpec,
}

pub trait RequestClassifier {
    fn classify(&self, user_input: &str) -> Result<Classification, String>;
}

pub trait GeneralAnswerer {
    fn answer(&self, user_input: &str) -> Result<String, String>;
}

pub trait CandidateGenerator {
    /// `feedback` summarizes why the previous round failed, if there was one.
    fn generate_candidates(
        &self,
        task: &TaskSpec,
        count: usize,
        feedback: Option<&str>,
    ) -> Result<Vec<String>, String>;
}

pub trait TestCaseGenerator {
    fn generate_cases(&self, task: &TaskSpec, kind: CaseKind, count: usize) -> Result<Vec<String>, String>;
}

pub trait TestFormatter {
    fn format_case(&self, raw: &str) -> Result<String, String>;
}

/// Relative preference in [0, 1]; above 0.5 favours `left`.
pub trait PreferenceModel {
    fn prefer(&self, left: &str, right: &str) -> Result<f64, String>;
}

pub trait EmbeddingModel {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, String>;
}

/// Free-text review containing one integer from 0 to 10.
pub trait QualityJudge {
    fn judge(&self, code: &str) -> Result<String, String>;
}

pub trait CodeRefiner {
    fn refine(&self, code: &str, evaluation_summary: &str) -> Result<String, String>;
}

/// The full set of collaborators one run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn RequestClassifier>,
    pub answerer: Arc<dyn GeneralAnswerer>,
    pub generator: Arc<dyn CandidateGenerator>,
    pub test_generator: Arc<dyn TestCaseGenerator>,
    pub formatter: Arc<dyn TestFormatter>,
    pub selector: Arc<dyn TestSelector>,
    pub preference: Arc<dyn PreferenceModel>,
    pub embedder: Arc<dyn EmbeddingModel>,
    pub judge: Arc<dyn QualityJudge>,
    pub refiner: Arc<dyn CodeRefiner>,
}

impl Collaborators {
    /// One agent serving every text role.
    pub fn from_agent(
        agent: Arc<agent::LlmAgent>,
        embedder: Arc<dyn EmbeddingModel>,
        selector: Arc<dyn TestSelector>,
    ) -> Self {
        Self {
            classifier: agent.clone(),
            answerer: agent.clone(),
            generator: agent.clone(),
            test_generator: agent.clone(),
            formatter: agent.clone(),
            selector,
            preference: agent.clone(),
            embedder,
            judge: agent.clone(),
            refiner: agent,
        }
    }
}
