// Parsing of free-form model replies.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::llm::Classification;
use crate::state::{RequestType, TaskSpec};
use crate::testgen::format::clean_code_block;

#[derive(Debug, Deserialize)]
struct RawClassification {
    request_type: String,
    #[serde(default, alias = "regulatory_text")]
    domain_text: String,
    #[serde(default)]
    assumptions: String,
    #[serde(default)]
    input_variables: Value,
}

/// Parse the classifier's JSON reply. Code fences and text around the
/// object are tolerated.
pub fn parse_classification(reply: &str) -> Result<Classification, String> {
    let cleaned = clean_code_block(reply);
    let json = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => return Err("classifier reply has no JSON object".into()),
    };

    let raw: RawClassification =
        serde_json::from_str(json).map_err(|e| format!("classifier JSON: {e}"))?;

    let request_type = match raw.request_type.trim().to_ascii_lowercase().as_str() {
        "general" => RequestType::General,
        "code_request" | "code" => RequestType::CodeRequest,
        other => return Err(format!("unknown request_type `{other}`")),
    };

    Ok(Classification {
        request_type,
        task: TaskSpec {
            domain_text: raw.domain_text.trim().to_string(),
            assumptions: raw.assumptions.trim().to_string(),
            input_variables: variables(&raw.input_variables),
        },
    })
}

/// Input variables arrive as an array or a comma separated string.
fn variables(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .filter_map(|i| i.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// First number in the reply, clamped to [0, 1]. Anything unreadable is a draw.
pub fn parse_preference(reply: &str) -> f64 {
    static NUM: OnceLock<Regex> = OnceLock::new();
    let re = NUM.get_or_init(|| Regex::new(r"-?\d*\.?\d+").expect("static regex"));

    re.find(reply)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(0.5)
}
