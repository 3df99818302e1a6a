use std::sync::OnceLock;

use regex::Regex;

use crate::scoring::{normalize, Metric, ScoringStrategy};
use crate::testgen::candidate::Candidate;

const LINE_WEIGHT: f64 = 0.4;
const BRANCH_WEIGHT: f64 = 1.5;
const LOOP_WEIGHT: f64 = 1.2;
const EXCEPTION_WEIGHT: f64 = 1.0;

struct Keywords {
    branch: Regex,
    looping: Regex,
    exception: Regex,
}

fn keywords() -> &'static Keywords {
    static KW: OnceLock<Keywords> = OnceLock::new();
    KW.get_or_init(|| Keywords {
        branch: Regex::new(r"\b(?:if|elif|else)\b").expect("static regex"),
        looping: Regex::new(r"\b(?:for|while)\b").expect("static regex"),
        exception: Regex::new(r"\b(?:try|except)\b").expect("static regex"),
    })
}

/// Structural weight of a candidate. Simpler code is rewarded, so the
/// strategy reports the inverted scale.
pub struct ComplexityStrategy;

impl ScoringStrategy for ComplexityStrategy {
    fn metric(&self) -> Metric {
        Metric::Complexity
    }

    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String> {
        let raws: Vec<f64> = candidates.iter().map(|c| raw_complexity(&c.code)).collect();
        Ok(invert(&raws))
    }
}

pub fn raw_complexity(code: &str) -> f64 {
    let kw = keywords();
    let lines = code.trim().split('\n').count();

    LINE_WEIGHT * lines as f64
        + BRANCH_WEIGHT * kw.branch.find_iter(code).count() as f64
        + LOOP_WEIGHT * kw.looping.find_iter(code).count() as f64
        + EXCEPTION_WEIGHT * kw.exception.find_iter(code).count() as f64
}

/// `1 - minmax(raw)`; every value is 0.5 when the raws do not vary.
pub fn invert(raws: &[f64]) -> Vec<f64> {
    normalize(raws)
        .into_iter()
        .map(|v| 1.0 - v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_complexity_scores_higher() {
        assert_eq!(invert(&[5.0, 15.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn degenerate_set_is_neutral() {
        assert_eq!(invert(&[4.0, 4.0]), vec![0.5, 0.5]);
        assert_eq!(invert(&[9.0]), vec![0.5]);
    }

    #[test]
    fn raw_counts_lines_and_keywords() {
        let code = "def f(x):\n    if x:\n        return 1\n    else:\n        return 0";
        // 5 lines, if + else
        assert!((raw_complexity(code) - (0.4 * 5.0 + 1.5 * 2.0)).abs() < 1e-9);

        let looped = "for i in x:\n    try:\n        pass\n    except E:\n        pass";
        assert!((raw_complexity(looped) - (0.4 * 5.0 + 1.2 + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn keywords_need_word_boundaries() {
        assert!((raw_complexity("elsewhere = format") - 0.4).abs() < 1e-9);
    }

    #[test]
    fn strategy_reports_inverted_scale() {
        let cands = Candidate::batch(vec![
            "x = 1".into(),
            "if a:\n    for b in c:\n        pass".into(),
        ]);
        let scores = ComplexityStrategy.score(&cands).unwrap_or_default();
        assert_eq!(scores, vec![1.0, 0.0]);
    }
}
