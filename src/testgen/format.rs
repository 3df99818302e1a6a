//! format.rs
//!
//! Turns generator output into executable text: strips code fences and
//! gives every test function a unique, sequential name.

use std::sync::OnceLock;

use regex::Regex;

use crate::llm::TestFormatter;
use crate::logger::{log, RunLog};
use crate::state::LogLevel;
use crate::testgen::candidate::{FormattedTest, TestCase};

/* ============================================================
   Cleaning
   ============================================================ */

/// Remove markdown fences (with or without a language tag).
pub fn clean_code_block(code: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("static regex"));

    re.replace_all(code, "").trim().to_string()
}

/* ============================================================
   Renaming
   ============================================================ */

pub fn test_name(n: usize) -> String {
    format!("test_case_{n}")
}

/// Rename every `def test_*` in `code` to `test_case_{n}`.
pub fn rename_test(code: &str, n: usize) -> String {
    static DEF: OnceLock<Regex> = OnceLock::new();
    let re = DEF.get_or_init(|| Regex::new(r"def test_\w+").expect("static regex"));

    let cleaned = clean_code_block(code);
    re.replace_all(&cleaned, format!("def {}", test_name(n)).as_str())
        .into_owned()
}

/// Rename a suite positionally, numbering from 1.
pub fn rename_tests(tests: &[String]) -> Vec<String> {
    tests
        .iter()
        .enumerate()
        .map(|(i, t)| rename_test(t, i + 1))
        .collect()
}

/* ============================================================
   Formatting stage helper
   ============================================================ */

/// Format valid cases then invalid ones with one shared counter, so no
/// two formatted tests in a run ever share a name.
///
/// A formatter failure drops that case; the rest of the suite survives.
pub fn format_suite(
    formatter: &dyn TestFormatter,
    valid: &[TestCase],
    invalid: &[TestCase],
    run: &mut RunLog,
) -> (Vec<FormattedTest>, Vec<FormattedTest>) {
    let mut counter = 0usize;

    let mut format_all = |cases: &[TestCase], run: &mut RunLog| {
        let mut out = Vec::with_capacity(cases.len());
        for case in cases {
            match formatter.format_case(&case.raw) {
                Ok(text) => {
                    counter += 1;
                    if case.expected().is_none() {
                        log(
                            run,
                            LogLevel::Info,
                            format!("{} has no expected result; the formatter inferred one", test_name(counter)),
                        );
                    }
                    out.push(FormattedTest {
                        name: test_name(counter),
                        kind: case.kind,
                        code: rename_test(&text, counter),
                    });
                }
                Err(e) => log(
                    run,
                    LogLevel::Warn,
                    format!("Dropping {} test case, formatter failed: {e}", case.kind.as_str()),
                ),
            }
        }
        out
    };

    let formatted_valid = format_all(valid, run);
    let formatted_invalid = format_all(invalid, run);

    (formatted_valid, formatted_invalid)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testgen::candidate::CaseKind;

    struct Echo;

    impl TestFormatter for Echo {
        fn format_case(&self, raw: &str) -> Result<String, String> {
            if raw.contains("broken") {
                return Err("formatter offline".into());
            }
            Ok(format!("```python\ndef test_generated():\n    assert {raw}\n```"))
        }
    }

    #[test]
    fn clean_strips_tagged_and_bare_fences() {
        assert_eq!(clean_code_block("```python\nx = 1\n```"), "x = 1");
        assert_eq!(clean_code_block("```\nx = 1\n```"), "x = 1");
        assert_eq!(clean_code_block("  x = 1  "), "x = 1");
    }

    #[test]
    fn renaming_yields_distinct_names_from_one() {
        let tests: Vec<String> = (0..5)
            .map(|_| "def test_risk_weight():\n    assert True".to_string())
            .collect();

        let renamed = rename_tests(&tests);
        assert_eq!(renamed.len(), 5);

        let names: HashSet<&str> = renamed
            .iter()
            .filter_map(|t| t.lines().next())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(renamed[0].starts_with("def test_case_1():"));
        assert!(renamed[4].starts_with("def test_case_5():"));
    }

    #[test]
    fn rename_leaves_non_test_text_alone() {
        assert_eq!(rename_test("echo hi", 3), "echo hi");
    }

    #[test]
    fn suite_numbering_is_shared_across_kinds() {
        let valid = vec![
            TestCase::new(CaseKind::Valid, "1 == 1"),
            TestCase::new(CaseKind::Valid, "2 == 2"),
        ];
        let invalid = vec![TestCase::new(CaseKind::Invalid, "3 == 3")];

        let mut run = RunLog::quiet();
        let (v, i) = format_suite(&Echo, &valid, &invalid, &mut run);

        assert_eq!(v.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), ["test_case_1", "test_case_2"]);
        assert_eq!(i[0].name, "test_case_3");
        assert_eq!(i[0].kind, CaseKind::Invalid);
        assert!(i[0].code.starts_with("def test_case_3():"));
    }

    #[test]
    fn formatter_failure_drops_only_that_case() {
        let valid = vec![
            TestCase::new(CaseKind::Valid, "broken"),
            TestCase::new(CaseKind::Valid, "1 == 1"),
        ];

        let mut run = RunLog::quiet();
        let (v, i) = format_suite(&Echo, &valid, &[], &mut run);

        assert_eq!(v.len(), 1);
        assert_eq!(v[0].name, "test_case_1");
        assert!(i.is_empty());
        assert_eq!(run.count(LogLevel::Warn), 1);
    }

    #[test]
    fn cases_without_expected_result_are_noted() {
        let valid = vec![
            TestCase::new(CaseKind::Valid, "weigh AA <expected>20</expected>"),
            TestCase::new(CaseKind::Valid, "weigh BB"),
        ];

        let mut run = RunLog::quiet();
        format_suite(&Echo, &valid, &[], &mut run);

        let noted: Vec<&str> = run
            .lines
            .iter()
            .filter(|l| l.text.contains("no expected result"))
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(noted, ["test_case_2 has no expected result; the formatter inferred one"]);
    }
}
