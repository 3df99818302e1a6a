use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::testgen::format::clean_code_block;

/// Position of a candidate in its generation batch, 1-based.
///
/// Rendered as `code_{i}`. Survivors keep the id they were generated
/// with, so reports, coverage lookups and rankings all agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code_{}", self.0)
    }
}

impl Serialize for CandidateId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// One generated implementation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    /// Text exactly as the generator returned it.
    pub raw: String,
    /// `raw` with code fences stripped. This is what gets executed.
    pub code: String,
}

impl Candidate {
    pub fn new(id: CandidateId, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let code = clean_code_block(&raw);
        Self { id, raw, code }
    }

    /// Assign batch ids `code_1..=code_n` in generation order.
    pub fn batch(raws: Vec<String>) -> Vec<Candidate> {
        raws.into_iter()
            .enumerate()
            .map(|(i, raw)| Candidate::new(CandidateId(i + 1), raw))
            .collect()
    }
}

/// Which half of the suite a test case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Valid,
    Invalid,
}

impl CaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseKind::Valid => "valid",
            CaseKind::Invalid => "invalid",
        }
    }
}

/// Natural-language test description as produced by the test generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub kind: CaseKind,
    pub raw: String,
}

impl TestCase {
    pub fn new(kind: CaseKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    /// Expected result embedded as `<expected>..</expected>`.
    /// The older `<riskweight>` tag is still understood.
    pub fn expected(&self) -> Option<String> {
        static TAG: OnceLock<Regex> = OnceLock::new();
        let re = TAG.get_or_init(|| {
            Regex::new(r"(?s)<(expected|riskweight)>(.*?)</(?:expected|riskweight)>")
                .expect("static regex")
        });

        re.captures(&self.raw)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// Executable form of a [`TestCase`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedTest {
    /// Unique across the whole run: `test_case_{n}`.
    pub name: String,
    pub kind: CaseKind,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_ids_start_at_one() {
        let batch = Candidate::batch(vec!["a".into(), "b".into()]);
        assert_eq!(batch[0].id.to_string(), "code_1");
        assert_eq!(batch[1].id.to_string(), "code_2");
    }

    #[test]
    fn candidate_code_is_cleaned() {
        let c = Candidate::new(CandidateId(3), "```python\ndef f():\n    return 1\n```");
        assert_eq!(c.code, "def f():\n    return 1");
        assert!(c.raw.starts_with("```python"));
    }

    #[test]
    fn ids_order_numerically() {
        assert!(CandidateId(2) < CandidateId(10));
    }

    #[test]
    fn expected_marker_is_extracted() {
        let t = TestCase::new(
            CaseKind::Valid,
            "rating = 'AA'\nexposure = 'bank'\n<expected> 20 </expected>",
        );
        assert_eq!(t.expected().as_deref(), Some("20"));

        let legacy = TestCase::new(CaseKind::Invalid, "x = -1 <riskweight>Invalid input value!</riskweight>");
        assert_eq!(legacy.expected().as_deref(), Some("Invalid input value!"));

        let missing = TestCase::new(CaseKind::Valid, "no marker here");
        assert_eq!(missing.expected(), None);
    }
}
