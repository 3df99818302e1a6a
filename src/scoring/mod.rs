//! scoring/mod.rs
//!
//! Multi-strategy scoring. Every strategy maps the whole candidate set
//! to one raw number per candidate; the engine min-max normalizes each
//! metric across the set and folds them into one weighted total.

pub mod elo;
pub mod strategies;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::llm::{EmbeddingModel, PreferenceModel, QualityJudge};
use crate::logger::{log, RunLog};
use crate::state::LogLevel;
use crate::testgen::candidate::{Candidate, CandidateId};

use self::elo::EloRanker;
use self::strategies::{
    ComplexityStrategy, CoverageStrategy, JudgeStrategy, QualityStrategy, SimilarityStrategy,
};

/// Value every candidate gets on a metric that does not vary.
pub const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Quality,
    Similarity,
    Elo,
    Complexity,
    Judge,
    Coverage,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Quality,
        Metric::Similarity,
        Metric::Elo,
        Metric::Complexity,
        Metric::Judge,
        Metric::Coverage,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Metric::Quality => 0.15,
            Metric::Similarity => 0.10,
            Metric::Elo => 0.20,
            Metric::Complexity => 0.15,
            Metric::Judge => 0.20,
            Metric::Coverage => 0.20,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Quality => "quality",
            Metric::Similarity => "similarity",
            Metric::Elo => "elo",
            Metric::Complexity => "complexity",
            Metric::Judge => "judge",
            Metric::Coverage => "test_coverage",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSet {
    pub quality: f64,
    pub similarity: f64,
    pub elo: f64,
    pub complexity: f64,
    pub judge: f64,
    pub test_coverage: f64,
}

impl MetricSet {
    pub fn get(&self, m: Metric) -> f64 {
        match m {
            Metric::Quality => self.quality,
            Metric::Similarity => self.similarity,
            Metric::Elo => self.elo,
            Metric::Complexity => self.complexity,
            Metric::Judge => self.judge,
            Metric::Coverage => self.test_coverage,
        }
    }

    pub fn set(&mut self, m: Metric, v: f64) {
        match m {
            Metric::Quality => self.quality = v,
            Metric::Similarity => self.similarity = v,
            Metric::Elo => self.elo = v,
            Metric::Complexity => self.complexity = v,
            Metric::Judge => self.judge = v,
            Metric::Coverage => self.test_coverage = v,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreEntry {
    pub code_id: CandidateId,
    pub code: String,
    pub raw: MetricSet,
    pub normalized: MetricSet,
    pub total_score: f64,
}

pub trait ScoringStrategy {
    fn metric(&self) -> Metric;

    /// One raw score per candidate, same order as `candidates`.
    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String>;
}

/* ============================================================
   Engine
   ============================================================ */

/// Ordered registry of strategies.
pub struct ScoringEngine {
    strategies: Vec<Box<dyn ScoringStrategy>>,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The six standard strategies, in weight-table order.
    pub fn standard(
        embedder: Arc<dyn EmbeddingModel>,
        preference: Arc<dyn PreferenceModel>,
        judge: Arc<dyn QualityJudge>,
        test_results: HashMap<CandidateId, Vec<bool>>,
    ) -> Self {
        Self::new()
            .register(QualityStrategy)
            .register(SimilarityStrategy::new(embedder))
            .register(EloRanker::new(preference))
            .register(ComplexityStrategy)
            .register(JudgeStrategy::new(judge))
            .register(CoverageStrategy::new(test_results))
    }

    pub fn register(mut self, strategy: impl ScoringStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Score and rank. Highest total first; equal totals keep
    /// ascending candidate id.
    pub fn score(&self, candidates: &[Candidate], run: &mut RunLog) -> Vec<ScoreEntry> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let n = candidates.len();
        let mut raw = vec![MetricSet::default(); n];
        let mut normalized = vec![MetricSet::default(); n];

        for metric in Metric::ALL {
            let values = self.raw_metric(metric, candidates, run);
            let scaled = normalize(&values);

            for i in 0..n {
                raw[i].set(metric, values[i]);
                normalized[i].set(metric, scaled[i]);
            }
        }

        let mut entries: Vec<ScoreEntry> = candidates
            .iter()
            .zip(raw.into_iter().zip(normalized))
            .map(|(c, (raw, normalized))| ScoreEntry {
                code_id: c.id,
                code: c.code.clone(),
                total_score: weighted_total(&normalized),
                raw,
                normalized,
            })
            .collect();

        rank(&mut entries);
        entries
    }

    fn raw_metric(&self, metric: Metric, candidates: &[Candidate], run: &mut RunLog) -> Vec<f64> {
        let neutral = vec![0.0; candidates.len()];

        let Some(strategy) = self.strategies.iter().find(|s| s.metric() == metric) else {
            log(run, LogLevel::Warn, format!("No strategy registered for {}", metric.name()));
            return neutral;
        };

        match strategy.score(candidates) {
            Ok(values) if values.len() == candidates.len() => values,
            Ok(values) => {
                log(
                    run,
                    LogLevel::Warn,
                    format!(
                        "{} returned {} scores for {} candidates; using neutral",
                        metric.name(),
                        values.len(),
                        candidates.len()
                    ),
                );
                neutral
            }
            Err(e) => {
                log(
                    run,
                    LogLevel::Warn,
                    format!("{} scoring failed, using neutral: {e}", metric.name()),
                );
                neutral
            }
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/* ============================================================
   Normalization / aggregation
   ============================================================ */

/// Min-max scale to [0, 1]. A metric that does not vary (or a single
/// candidate) maps every value to 0.5.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let span = max - min;
    if !span.is_finite() || span == 0.0 {
        return vec![NEUTRAL; values.len()];
    }

    values.iter().map(|v| (v - min) / span).collect()
}

pub fn weighted_total(normalized: &MetricSet) -> f64 {
    let total: f64 = Metric::ALL
        .iter()
        .map(|m| m.weight() * normalized.get(*m))
        .sum();
    round4(total)
}

pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn rank(entries: &mut [ScoreEntry]) {
    entries.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
            .then(a.code_id.cmp(&b.code_id))
    });
}

/* ============================================================
   Summary
   ============================================================ */

/// Plain-text digest of a ranking, fed to the refiner.
pub fn evaluation_summary(entries: &[ScoreEntry]) -> String {
    let mut lines = Vec::new();

    for e in entries {
        lines.push(format!("Code ID: {}", e.code_id));
        lines.push(format!("- Total Score: {}", e.total_score));
        lines.push(format!(
            "- Quality: {:.2}, Elo: {:.1}, Judge: {:.2}",
            e.raw.quality, e.raw.elo, e.raw.judge
        ));
        lines.push(format!(
            "- Test Coverage: {:.4}, Complexity: {:.2}, Similarity: {:.2}",
            e.raw.test_coverage, e.raw.complexity, e.raw.similarity
        ));
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Metric, Vec<f64>);

    impl ScoringStrategy for Fixed {
        fn metric(&self) -> Metric {
            self.0
        }
        fn score(&self, _: &[Candidate]) -> Result<Vec<f64>, String> {
            Ok(self.1.clone())
        }
    }

    struct Broken(Metric);

    impl ScoringStrategy for Broken {
        fn metric(&self) -> Metric {
            self.0
        }
        fn score(&self, _: &[Candidate]) -> Result<Vec<f64>, String> {
            Err("service unavailable".into())
        }
    }

    fn batch(n: usize) -> Vec<Candidate> {
        Candidate::batch((0..n).map(|i| format!("def f{i}(): pass")).collect())
    }

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = Metric::ALL.iter().map(|m| m.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_equal_values_is_neutral() {
        assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![0.5, 0.5, 0.5]);
        assert_eq!(normalize(&[7.0]), vec![0.5]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn normalize_maps_min_and_max_to_bounds() {
        let n = normalize(&[2.0, 4.0, 10.0]);
        assert_eq!(n[0], 0.0);
        assert_eq!(n[2], 1.0);
        assert!((n[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn total_stays_in_unit_interval() {
        let mut all_one = MetricSet::default();
        for m in Metric::ALL {
            all_one.set(m, 1.0);
        }
        assert_eq!(weighted_total(&all_one), 1.0);
        assert_eq!(weighted_total(&MetricSet::default()), 0.0);

        let mut mixed = MetricSet::default();
        mixed.set(Metric::Elo, 1.0);
        mixed.set(Metric::Quality, 0.33333);
        let t = weighted_total(&mixed);
        assert!((0.0..=1.0).contains(&t));
        assert_eq!(t, round4(t));
    }

    #[test]
    fn ranking_is_descending_with_index_tiebreak() {
        let engine = ScoringEngine::new()
            .register(Fixed(Metric::Quality, vec![0.0, 1.0, 0.0, 1.0]))
            .register(Fixed(Metric::Similarity, vec![1.0; 4]))
            .register(Fixed(Metric::Elo, vec![1000.0; 4]))
            .register(Fixed(Metric::Complexity, vec![0.5; 4]))
            .register(Fixed(Metric::Judge, vec![0.7; 4]))
            .register(Fixed(Metric::Coverage, vec![1.0; 4]));

        let mut run = RunLog::quiet();
        let ranked = engine.score(&batch(4), &mut run);

        let order: Vec<usize> = ranked.iter().map(|e| e.code_id.0).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert_eq!(ranked[0].total_score, ranked[1].total_score);
    }

    #[test]
    fn failing_strategy_degrades_to_neutral() {
        let engine = ScoringEngine::new()
            .register(Fixed(Metric::Quality, vec![0.1, 0.9]))
            .register(Broken(Metric::Judge));

        let mut run = RunLog::quiet();
        let ranked = engine.score(&batch(2), &mut run);

        for e in &ranked {
            assert_eq!(e.normalized.judge, NEUTRAL);
            assert_eq!(e.normalized.elo, NEUTRAL);
        }
        assert_eq!(ranked[0].code_id, CandidateId(2));
        assert!(run.count(LogLevel::Warn) >= 1);
    }

    #[test]
    fn wrong_length_is_treated_as_failure() {
        let engine = ScoringEngine::new().register(Fixed(Metric::Quality, vec![1.0]));

        let mut run = RunLog::quiet();
        let ranked = engine.score(&batch(3), &mut run);

        assert!(ranked.iter().all(|e| e.normalized.quality == NEUTRAL));
    }

    #[test]
    fn empty_set_scores_nothing() {
        let mut run = RunLog::quiet();
        assert!(ScoringEngine::new().score(&[], &mut run).is_empty());
    }

    #[test]
    fn summary_lists_every_entry() {
        let engine = ScoringEngine::new().register(Fixed(Metric::Quality, vec![0.2, 0.4]));
        let mut run = RunLog::quiet();
        let ranked = engine.score(&batch(2), &mut run);

        let summary = evaluation_summary(&ranked);
        assert!(summary.contains("Code ID: code_1"));
        assert!(summary.contains("Code ID: code_2"));
        assert!(summary.starts_with("Code ID: code_2"));
    }
}
