use std::collections::VecDeque;
use std::time::Instant;

use crate::state::{LogLevel, LogLine, MAX_LOGS};

/// Bounded log of one run. Lines are echoed to stderr as they arrive
/// unless the log is quiet.
#[derive(Debug, Default)]
pub struct RunLog {
    pub lines: VecDeque<LogLine>,
    quiet: bool,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self {
            lines: VecDeque::new(),
            quiet: true,
        }
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lines.iter().filter(|l| l.level == level).count()
    }
}

pub fn log(run: &mut RunLog, level: LogLevel, msg: impl Into<String>) {
    if run.lines.len() >= MAX_LOGS {
        run.lines.pop_front();
    }

    let text = msg.into();

    if !run.quiet {
        eprintln!("{} {}", prefix(level), text);
    }

    run.lines.push_back(LogLine {
        level,
        text,
        at: Instant::now(),
    });
}

fn prefix(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "[info]",
        LogLevel::Success => "[ ok ]",
        LogLevel::Warn => "[warn]",
        LogLevel::Error => "[fail]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_line() {
        let mut run = RunLog::quiet();
        for i in 0..(MAX_LOGS + 5) {
            log(&mut run, LogLevel::Info, format!("line {i}"));
        }

        assert_eq!(run.lines.len(), MAX_LOGS);
        assert_eq!(run.lines.front().map(|l| l.text.as_str()), Some("line 5"));
    }

    #[test]
    fn counts_by_level() {
        let mut run = RunLog::quiet();
        log(&mut run, LogLevel::Warn, "a");
        log(&mut run, LogLevel::Info, "b");
        log(&mut run, LogLevel::Warn, "c");

        assert_eq!(run.count(LogLevel::Warn), 2);
        assert_eq!(run.count(LogLevel::Error), 0);
    }
}
