use std::sync::OnceLock;

use regex::Regex;

use crate::scoring::{Metric, ScoringStrategy};
use crate::testgen::candidate::Candidate;

const DOC_BONUS: f64 = 0.2;

/// Comment density plus a bonus for a documentation block.
pub struct QualityStrategy;

impl ScoringStrategy for QualityStrategy {
    fn metric(&self) -> Metric {
        Metric::Quality
    }

    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String> {
        Ok(candidates.iter().map(|c| quality(&c.code)).collect())
    }
}

pub fn quality(code: &str) -> f64 {
    let lines: Vec<&str> = code.trim().split('\n').collect();

    let comments = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with('#') || t.starts_with("//")
        })
        .count();

    let ratio = comments as f64 / lines.len() as f64;
    let bonus = if has_doc_block(code) { DOC_BONUS } else { 0.0 };

    (ratio + bonus).min(1.0)
}

fn has_doc_block(code: &str) -> bool {
    static DOC: OnceLock<Regex> = OnceLock::new();
    let re = DOC.get_or_init(|| {
        Regex::new(r#"(?s)""".+?"""|'''.+?'''|/\*\*.+?\*/"#)
            .expect("static regex")
    });
    re.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_ratio_counts_hash_lines() {
        let code = "# add\ndef f(a, b):\n    # sum\n    return a + b";
        assert!((quality(code) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn docstring_adds_bonus() {
        let code = "def f():\n    \"\"\"Return one.\"\"\"\n    return 1";
        assert!((quality(code) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_docstring_gets_no_bonus() {
        assert_eq!(quality("x = \"\"\"\"\"\""), 0.0);
    }

    #[test]
    fn capped_at_one() {
        let code = "'''module doc'''\n# a\n# b";
        assert_eq!(quality(code), 1.0);
    }

    #[test]
    fn plain_code_scores_zero() {
        assert_eq!(quality("x = 1"), 0.0);
    }
}
