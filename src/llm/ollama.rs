use std::io::{self, Write};
use std::process::{Command, Stdio};

use crate::llm::prompt::LlmPrompt;

pub struct Ollama;

impl Ollama {
    /// One-shot `ollama run <model>` with the prompt fed through stdin.
    pub fn run(prompt: &LlmPrompt, model: &str) -> io::Result<String> {
        let mut child = Command::new("ollama")
            .arg("run")
            .arg(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let input = format!("{}\n\n{}", prompt.system, prompt.user);

        match child.stdin.take() {
            Some(mut stdin) => {
                stdin.write_all(input.as_bytes())?;
                stdin.flush()?;
                // dropped here so ollama sees EOF
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "Failed to open stdin for Ollama process",
                ));
            }
        }

        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(io::Error::other(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
