use std::collections::HashMap;

use crate::scoring::{round4, Metric, ScoringStrategy};
use crate::testgen::candidate::{Candidate, CandidateId};

/// Fraction of passing tests, looked up by candidate id.
pub struct CoverageStrategy {
    test_results: HashMap<CandidateId, Vec<bool>>,
}

impl CoverageStrategy {
    pub fn new(test_results: HashMap<CandidateId, Vec<bool>>) -> Self {
        Self { test_results }
    }
}

impl ScoringStrategy for CoverageStrategy {
    fn metric(&self) -> Metric {
        Metric::Coverage
    }

    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String> {
        Ok(candidates
            .iter()
            .map(|c| {
                self.test_results
                    .get(&c.id)
                    .map(|r| coverage(r))
                    .unwrap_or(0.0)
            })
            .collect())
    }
}

pub fn coverage(results: &[bool]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| **r).count();
    round4(passed as f64 / results.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_rounded() {
        assert_eq!(coverage(&[true, true, false]), 0.6667);
        assert_eq!(coverage(&[true; 20]), 1.0);
        assert_eq!(coverage(&[]), 0.0);
    }

    #[test]
    fn lookup_uses_batch_id_not_position() {
        let mut results = HashMap::new();
        results.insert(CandidateId(3), vec![true, false]);

        // survivor of a larger batch, now first in the list
        let survivor = Candidate::new(CandidateId(3), "x = 1");
        let unknown = Candidate::new(CandidateId(1), "y = 2");

        let scores = CoverageStrategy::new(results)
            .score(&[survivor, unknown])
            .unwrap_or_default();
        assert_eq!(scores, vec![0.5, 0.0]);
    }
}
