//! report.rs
//!
//! Serializable end-of-run report and its terminal rendering.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::executor::Reports;
use crate::logger::RunLog;
use crate::scoring::ScoreEntry;
use crate::state::{LogLevel, Outcome, RequestType, WorkflowState};

#[derive(Debug, Clone, Serialize)]
pub struct ReportLine {
    /// Milliseconds since the first retained log line.
    pub elapsed_ms: u64,
    pub level: LogLevel,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: String,
    pub input: String,
    pub request_type: Option<RequestType>,
    pub outcome: Option<Outcome>,
    pub attempts: u32,
    pub stages: Vec<&'static str>,
    pub general_answer: Option<String>,
    pub ranking: Vec<ScoreEntry>,
    pub best_code: Option<String>,
    pub evaluation_summary: Option<String>,
    pub optimized_code: Option<String>,
    pub optimized_diff: Option<String>,
    pub phase1_report: Reports,
    pub phase2_report: Reports,
    pub logs: Vec<ReportLine>,
}

impl RunReport {
    pub fn from_state(state: &WorkflowState, run: &RunLog) -> Self {
        let start = run.lines.front().map(|l| l.at);

        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now().to_rfc3339(),
            input: state.input().to_string(),
            request_type: state.request_type,
            outcome: state.outcome,
            attempts: state.attempts(),
            stages: state.visited.clone(),
            general_answer: state.general_answer.clone(),
            ranking: state.scoring_results.clone().unwrap_or_default(),
            best_code: state.best_code.clone(),
            evaluation_summary: state.evaluation_summary.clone(),
            optimized_code: state.optimized_code.clone(),
            optimized_diff: state.optimized_diff.clone(),
            phase1_report: state.phase1_report.clone().unwrap_or_default(),
            phase2_report: state.phase2_report.clone().unwrap_or_default(),
            logs: run
                .lines
                .iter()
                .map(|l| ReportLine {
                    elapsed_ms: start
                        .map(|s| l.at.duration_since(s).as_millis() as u64)
                        .unwrap_or(0),
                    level: l.level,
                    text: l.text.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }
        fs::write(path, self.to_json()?).map_err(|e| e.to_string())
    }

    /// Human summary for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("run {} ({})\n", self.run_id, self.generated_at));

        match self.outcome {
            Some(Outcome::Answered) => {
                out.push('\n');
                out.push_str(self.general_answer.as_deref().unwrap_or(""));
                out.push('\n');
                return out;
            }
            Some(Outcome::ValidationExhausted) => {
                out.push_str(&format!(
                    "\nNo candidate passed validation after {} generation rounds.\n",
                    self.attempts
                ));
                return out;
            }
            Some(Outcome::NoResult) | None => {
                out.push_str("\nNo result.\n");
                return out;
            }
            Some(Outcome::Ranked) => {}
        }

        out.push_str(&format!("\nRanking ({} rounds):\n", self.attempts));
        out.push_str(&format!(
            "{:<10} {:>7} {:>8} {:>6} {:>8} {:>6} {:>6} {:>8}\n",
            "id", "total", "quality", "sim", "elo", "cplx", "judge", "coverage"
        ));
        for e in &self.ranking {
            let n = &e.normalized;
            out.push_str(&format!(
                "{:<10} {:>7.4} {:>8.2} {:>6.2} {:>8.1} {:>6.2} {:>6.2} {:>8.2}\n",
                e.code_id.to_string(),
                e.total_score,
                n.quality,
                n.similarity,
                e.raw.elo,
                n.complexity,
                n.judge,
                n.test_coverage
            ));
        }

        if let Some(best) = &self.best_code {
            out.push_str("\nBest candidate:\n");
            out.push_str(best);
            out.push('\n');
        }

        if let Some(diff) = self.optimized_diff.as_deref().filter(|d| !d.is_empty()) {
            out.push_str("\nOptimization:\n");
            out.push_str(diff);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::log;
    use crate::scoring::MetricSet;
    use crate::testgen::candidate::CandidateId;

    fn ranked_state() -> WorkflowState {
        let mut state = WorkflowState::new("weigh it");
        state.attempts = Some(2);
        state.outcome = Some(Outcome::Ranked);
        state.best_code = Some("def compute(): return 1".into());
        state.scoring_results = Some(vec![ScoreEntry {
            code_id: CandidateId(2),
            code: "def compute(): return 1".into(),
            raw: MetricSet::default(),
            normalized: MetricSet::default(),
            total_score: 0.5,
        }]);
        state.visited = vec!["classify", "score_and_rank"];
        state
    }

    #[test]
    fn json_carries_ids_and_logs() {
        let mut run = RunLog::quiet();
        log(&mut run, LogLevel::Info, "start");
        std::thread::sleep(std::time::Duration::from_millis(20));
        log(&mut run, LogLevel::Success, "done");

        let report = RunReport::from_state(&ranked_state(), &run);
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["outcome"], "ranked");
        assert_eq!(json["ranking"][0]["code_id"], "code_2");
        assert_eq!(json["logs"][0]["elapsed_ms"], 0);
        assert_eq!(json["logs"][1]["level"], "success");
        assert!(json["logs"][1]["elapsed_ms"].as_u64().unwrap_or(0) >= 20);
        assert_eq!(json["stages"][1], "score_and_rank");
        assert_eq!(json["run_id"].as_str().map(str::len), Some(36));
    }

    #[test]
    fn render_lists_ranking_and_best() {
        let report = RunReport::from_state(&ranked_state(), &RunLog::quiet());
        let text = report.render();

        assert!(text.contains("Ranking (2 rounds)"));
        assert!(text.contains("code_2"));
        assert!(text.contains("Best candidate:\ndef compute(): return 1"));
    }

    #[test]
    fn render_exhausted() {
        let mut state = WorkflowState::new("x");
        state.attempts = Some(4);
        state.outcome = Some(Outcome::ValidationExhausted);

        let text = RunReport::from_state(&state, &RunLog::quiet()).render();
        assert!(text.contains("after 4 generation rounds"));
    }

    #[test]
    fn render_answer_is_padded_by_newlines() {
        let mut state = WorkflowState::new("what is a risk weight?");
        state.outcome = Some(Outcome::Answered);
        state.general_answer = Some("A multiplier on exposure.".into());

        let text = RunReport::from_state(&state, &RunLog::quiet()).render();
        assert!(text.ends_with(")\n\nA multiplier on exposure.\n"));
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");

        RunReport::from_state(&ranked_state(), &RunLog::quiet())
            .write_json(&path)
            .unwrap();

        assert!(fs::read_to_string(&path).unwrap().contains("\"code_2\""));
    }
}
