//! Pairwise comparative ranking.
//!
//! Every candidate starts at the same rating and plays every other one
//! exactly once, pairs enumerated in ascending index order. Ratings are
//! order dependent, so the enumeration is fixed.

use std::sync::Arc;

use crate::llm::PreferenceModel;
use crate::scoring::{Metric, ScoringStrategy};
use crate::testgen::candidate::Candidate;

pub const INITIAL_RATING: f64 = 1000.0;
pub const K_FACTOR: f64 = 32.0;

pub struct EloRanker {
    preference: Arc<dyn PreferenceModel>,
    k: f64,
}

impl EloRanker {
    pub fn new(preference: Arc<dyn PreferenceModel>) -> Self {
        Self {
            preference,
            k: K_FACTOR,
        }
    }

    pub fn ratings(&self, codes: &[&str]) -> Result<Vec<f64>, String> {
        let n = codes.len();
        let mut ratings = vec![INITIAL_RATING; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let score = self.preference.prefer(codes[i], codes[j])?;
                let (oi, oj) = outcome(score);

                let (ri, rj) = (ratings[i], ratings[j]);
                ratings[i] = update(ri, rj, oi, self.k);
                ratings[j] = update(rj, ri, oj, self.k);
            }
        }

        Ok(ratings)
    }
}

impl ScoringStrategy for EloRanker {
    fn metric(&self) -> Metric {
        Metric::Elo
    }

    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String> {
        let codes: Vec<&str> = candidates.iter().map(|c| c.code.as_str()).collect();
        self.ratings(&codes)
    }
}

pub fn expected_score(r1: f64, r2: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((r2 - r1) / 400.0))
}

/// Preference above 0.5 is a win for the left side, below is a loss,
/// exactly 0.5 is a draw.
pub fn outcome(score: f64) -> (f64, f64) {
    if score > 0.5 {
        (1.0, 0.0)
    } else if score < 0.5 {
        (0.0, 1.0)
    } else {
        (0.5, 0.5)
    }
}

pub fn update(rating: f64, opponent: f64, outcome: f64, k: f64) -> f64 {
    rating + k * (outcome - expected_score(rating, opponent))
}
