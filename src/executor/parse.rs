// Per-test outcome parsing.
//
// Output contract: somewhere in the run output there is one block of
// consecutive lines made only of outcome markers, one marker per test in
// suite order. pytest -q prints it as e.g. `.F.s  [100%]` and wraps long
// suites over several lines; the progress suffix is ignored.

const PASS: char = '.';
const FAIL: char = 'F';
const ERROR: char = 'E';
const SKIP: char = 's';
const XFAIL: char = 'x';
const XPASS: char = 'X';

/// Parse the first marker block. No marker line means no per-test
/// information, which is not an error.
pub fn parse_test_markers(raw_output: &str) -> Vec<bool> {
    raw_output
        .lines()
        .map(|line| strip_progress(line.trim()))
        .skip_while(|line| !is_marker_line(line))
        .take_while(|line| is_marker_line(line))
        .flat_map(|line| line.chars().map(passed))
        .collect()
}

/// Only tests whose body ran to completion count as passed.
fn passed(marker: char) -> bool {
    matches!(marker, PASS | XPASS)
}

fn is_marker_line(line: &str) -> bool {
    !line.is_empty()
        && line
            .chars()
            .all(|c| matches!(c, PASS | FAIL | ERROR | SKIP | XFAIL | XPASS))
}

fn strip_progress(line: &str) -> &str {
    if !line.ends_with("%]") {
        return line;
    }

    match line.rfind('[') {
        Some(open) => {
            let pct = &line[open + 1..line.len() - 2];
            if pct.trim().chars().all(|c| c.is_ascii_digit()) {
                line[..open].trim_end()
            } else {
                line
            }
        }
        None => line,
    }
}
