//! select.rs
//!
//! Picks the representative valid and invalid case used for the cheap
//! first filtering pass.

use std::io::{self, BufRead, Write};

use crate::testgen::candidate::FormattedTest;

/// One chosen index per list; `None` when the list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Picks {
    pub valid: Option<usize>,
    pub invalid: Option<usize>,
}

pub trait TestSelector {
    fn select(&self, valid: &[FormattedTest], invalid: &[FormattedTest]) -> Result<Picks, String>;
}

/* ============================================================
   Automatic: longest test wins
   ============================================================ */

/// Treats the longest formatted test as the most demanding one.
/// Ties keep the earliest test.
pub struct ComplexitySelector;

impl TestSelector for ComplexitySelector {
    fn select(&self, valid: &[FormattedTest], invalid: &[FormattedTest]) -> Result<Picks, String> {
        Ok(Picks {
            valid: longest(valid),
            invalid: longest(invalid),
        })
    }
}

fn longest(tests: &[FormattedTest]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, t) in tests.iter().enumerate() {
        let len = t.code.len();
        match best {
            Some((_, l)) if l >= len => {}
            _ => best = Some((i, len)),
        }
    }
    best.map(|(i, _)| i)
}

/* ============================================================
   Interactive: operator types an index
   ============================================================ */

pub struct ConsoleSelector;

impl TestSelector for ConsoleSelector {
    fn select(&self, valid: &[FormattedTest], invalid: &[FormattedTest]) -> Result<Picks, String> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();

        let valid = prompt_pick(&mut input, &mut out, "VALID", valid)?;
        let invalid = prompt_pick(&mut input, &mut out, "INVALID", invalid)?;

        Ok(Picks { valid, invalid })
    }
}

fn prompt_pick(
    input: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    tests: &[FormattedTest],
) -> Result<Option<usize>, String> {
    if tests.is_empty() {
        return Ok(None);
    }

    writeln!(out, "\nSelect the most complex {label} test case:").map_err(|e| e.to_string())?;
    for (idx, test) in tests.iter().enumerate() {
        writeln!(out, "\n[{idx}] {}\n{}", test.name, test.code).map_err(|e| e.to_string())?;
    }

    loop {
        write!(out, "Index of the most complex {label} test case: ").map_err(|e| e.to_string())?;
        out.flush().map_err(|e| e.to_string())?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(|e| e.to_string())?;
        if read == 0 {
            return Err("stdin closed before a test case was selected".into());
        }

        match line.trim().parse::<usize>() {
            Ok(i) if i < tests.len() => return Ok(Some(i)),
            _ => writeln!(out, "Enter a number between 0 and {}.", tests.len() - 1)
                .map_err(|e| e.to_string())?,
        }
    }
}

/// Resolve picks against the lists, clamping out-of-range indices.
pub fn resolve<'a>(tests: &'a [FormattedTest], pick: Option<usize>) -> Option<&'a FormattedTest> {
    let last = tests.len().checked_sub(1)?;
    pick.map(|i| &tests[i.min(last)])
}
