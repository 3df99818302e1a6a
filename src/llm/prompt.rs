use crate::state::TaskSpec;
use crate::testgen::candidate::CaseKind;

/// Name every candidate must define and every test must call.
pub const ENTRY_FUNCTION: &str = "compute";

/// Result a candidate returns for inputs it cannot handle.
pub const INVALID_RESULT: &str = "Invalid input value!";

#[derive(Debug, Clone)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

impl LlmPrompt {
    fn new(system: &str, user: String) -> Self {
        Self {
            system: system.trim().to_string(),
            user,
        }
    }
}

/* ============================================================
   Intake
   ============================================================ */

pub fn classify_prompt(user_input: &str) -> LlmPrompt {
    let system = r#"
You are a classification and extraction agent.

Decide whether the user input is a general question ("general") or a
request to implement a function ("code_request").

For a code_request also extract:
- domain_text: the rules or text the function must implement
- assumptions: assumptions the user states about the inputs
- input_variables: the function's input names, in order

Reply with JSON only:
{"request_type": "...", "domain_text": "...", "assumptions": "...", "input_variables": ["..."]}
"#;

    LlmPrompt::new(system, format!("### User Input:\n{user_input}"))
}

pub fn answer_prompt(user_input: &str) -> LlmPrompt {
    LlmPrompt::new(
        "You are a helpful assistant. Answer the question clearly and concisely.",
        format!("### Question:\n{user_input}"),
    )
}

/* ============================================================
   Generation
   ============================================================ */

pub fn candidate_prompt(task: &TaskSpec, feedback: Option<&str>) -> LlmPrompt {
    let system = format!(
        r#"
Write one Python function named `{ENTRY_FUNCTION}` that implements the given text.

- Comment the function, including its inputs, so a reader can follow it.
- Return the computed value, or the string "{INVALID_RESULT}" when the inputs
  cannot be handled.
- Output only the code, no explanation.
"#
    );

    let mut user = task_block(task);
    user.push_str(&format!(
        "### Function Declaration:\n```python\ndef {ENTRY_FUNCTION}({}):\n```\n",
        task.input_variables.join(", ")
    ));

    if let Some(fb) = feedback {
        user.push_str("\n### Previous attempts failed:\n");
        user.push_str(fb);
        user.push('\n');
    }

    LlmPrompt::new(&system, user)
}

pub fn test_case_prompt(task: &TaskSpec, kind: CaseKind) -> LlmPrompt {
    let system = format!(
        r#"
You write one {kind} test case for the function `{ENTRY_FUNCTION}`.

1. Give the input values as Python variable assignments.
2. Wrap the expected result in <expected></expected> tags. For an invalid
   case the expected result is "{INVALID_RESULT}".

Think step by step so the expected result is correct.
"#,
        kind = kind.as_str()
    );

    let mut user = task_block(task);
    user.push_str(&format!("### Test Type:\n{}\n", kind.as_str()));

    LlmPrompt::new(&system, user)
}

pub fn format_prompt(raw_case: &str) -> LlmPrompt {
    let system = format!(
        r#"
Turn the test case into one plain pytest test function.

- Name it `test_case_` followed by a number.
- Put the value between <expected></expected> into `expected_output`, as a number
  when it is one, otherwise as a string.
- Call `{ENTRY_FUNCTION}()` with the given inputs and assert the result equals
  `expected_output`.
- Output only the function.
"#
    );

    LlmPrompt::new(&system, format!("### Test Case:\n{raw_case}"))
}

/* ============================================================
   Scoring
   ============================================================ */

pub fn preference_prompt(left: &str, right: &str) -> LlmPrompt {
    let system = r#"
You compare two implementations of the same function.

Reply with a single number between 0 and 1: close to 1 when A is better,
close to 0 when B is better, 0.5 when they are equally good.
"#;

    LlmPrompt::new(
        system,
        format!("### A:\n```python\n{left}\n```\n\n### B:\n```python\n{right}\n```"),
    )
}

pub fn judge_prompt(code: &str) -> LlmPrompt {
    let system = r#"
You are a code reviewer. Score the function from 0 to 10 on clarity,
comments and structure, style, and overall implementation quality.

Reply with a single integer.
"#;

    LlmPrompt::new(system, format!("### Code:\n```python\n{code}\n```"))
}

pub fn refine_prompt(code: &str, evaluation_summary: &str) -> LlmPrompt {
    let system = r#"
You are a code optimizer. Improve clarity, naming, formatting and comments of
the function without changing its signature or behavior.

Return only the full function in a Python code block.
"#;

    LlmPrompt::new(
        system,
        format!("### Evaluation:\n{evaluation_summary}\n\n### Code:\n```python\n{code}\n```"),
    )
}

fn task_block(task: &TaskSpec) -> String {
    let mut out = String::new();

    out.push_str("### Input Variables:\n");
    out.push_str(&task.input_variables.join(", "));
    out.push_str("\n\n### Assumptions:\n");
    out.push_str(&task.assumptions);
    out.push_str("\n\n### Text:\n");
    out.push_str(&task.domain_text);
    out.push_str("\n\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> TaskSpec {
        TaskSpec {
            domain_text: "Rated AA exposures weigh 20.".into(),
            assumptions: "rating is a string".into(),
            input_variables: vec!["rating".into(), "exposure".into()],
        }
    }

    #[test]
    fn candidate_prompt_keeps_variable_order() {
        let p = candidate_prompt(&task(), None);
        assert!(p.user.contains("def compute(rating, exposure):"));
        assert!(!p.user.contains("Previous attempts failed"));
    }

    #[test]
    fn feedback_is_appended() {
        let p = candidate_prompt(&task(), Some("code_1: test_case_2 failed"));
        assert!(p.user.contains("Previous attempts failed"));
        assert!(p.user.contains("test_case_2 failed"));
    }

    #[test]
    fn test_case_prompt_names_kind() {
        let p = test_case_prompt(&task(), CaseKind::Invalid);
        assert!(p.system.contains("invalid test case"));
        assert!(p.user.ends_with("### Test Type:\ninvalid\n"));
    }
}
