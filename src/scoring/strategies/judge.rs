use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::llm::QualityJudge;
use crate::scoring::{Metric, ScoringStrategy};
use crate::testgen::candidate::Candidate;

/// External 0-10 review, scaled to [0, 1].
pub struct JudgeStrategy {
    judge: Arc<dyn QualityJudge>,
}

impl JudgeStrategy {
    pub fn new(judge: Arc<dyn QualityJudge>) -> Self {
        Self { judge }
    }
}

impl ScoringStrategy for JudgeStrategy {
    fn metric(&self) -> Metric {
        Metric::Judge
    }

    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String> {
        candidates
            .iter()
            .map(|c| self.judge.judge(&c.code).map(|reply| parse_judge_score(&reply)))
            .collect()
    }
}

/// First integer in the reply over 10, clamped. No integer scores 0.
pub fn parse_judge_score(reply: &str) -> f64 {
    static NUM: OnceLock<Regex> = OnceLock::new();
    let re = NUM.get_or_init(|| Regex::new(r"\d+").expect("static regex"));

    re.find(reply)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|n| (n as f64 / 10.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}
