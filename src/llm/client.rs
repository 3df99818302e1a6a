// src/llm/client.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::llm::prompt::LlmPrompt;

const PROMPT_ABI_VERSION: &str = "v1-forgerank";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const OPENAI_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Clone)]
pub struct LlmClient {
    cfg: ProviderConfig,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(cfg: ProviderConfig) -> Result<Self, String> {
        if cfg.api_key.trim().is_empty() {
            return Err("API key cannot be empty".into());
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self { cfg, http })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.cfg
    }

    /// Execute one completion request.
    pub fn run(&self, prompt: &LlmPrompt) -> Result<String, String> {
        let (url, headers, body) = build_request(&self.cfg, prompt);

        let json = self.post(&url, headers, &body)?;
        extract_text(self.cfg.provider, &json)
    }

    /// OpenAI-compatible embeddings endpoint, one vector per input.
    pub fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f64>>, String> {
        if self.cfg.provider != Provider::OpenAI {
            return Err("remote embeddings need an OpenAI-compatible provider".into());
        }

        let url = match &self.cfg.base_url {
            Some(base) => format!("{}/embeddings", base.trim_end_matches('/')),
            None => OPENAI_EMBEDDINGS_URL.into(),
        };

        let body = serde_json::json!({ "model": model, "input": texts });
        let json = self.post(&url, self.auth_headers(), &body)?;

        extract_embeddings(&json)
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        vec![("Authorization", format!("Bearer {}", self.cfg.api_key))]
    }

    fn post(
        &self,
        url: &str,
        headers: Vec<(&'static str, String)>,
        body: &Value,
    ) -> Result<Value, String> {
        let mut req = self.http.post(url).json(body);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req.send().map_err(|e| e.to_string())?;
        let status = resp.status();
        let json: Value = resp.json().map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(format!("LLM error {}: {}", status, json));
        }

        Ok(json)
    }
}

pub fn hash_prompt(prompt: &LlmPrompt) -> String {
    let mut h = Sha256::new();
    h.update(PROMPT_ABI_VERSION.as_bytes());
    h.update(prompt.system.as_bytes());
    h.update(prompt.user.as_bytes());
    hex::encode(h.finalize())
}

fn build_request(
    cfg: &ProviderConfig,
    prompt: &LlmPrompt,
) -> (String, Vec<(&'static str, String)>, Value) {
    match cfg.provider {
        Provider::OpenAI => {
            let url = match &cfg.base_url {
                Some(base) => format!("{}/responses", base.trim_end_matches('/')),
                None => OPENAI_RESPONSES_URL.into(),
            };

            let body = serde_json::json!({
                "model": cfg.model,
                "instructions": prompt.system,
                "input": prompt.user,
            });

            (
                url,
                vec![("Authorization", format!("Bearer {}", cfg.api_key))],
                body,
            )
        }

        Provider::Anthropic => {
            let url = match &cfg.base_url {
                Some(base) => format!("{}/messages", base.trim_end_matches('/')),
                None => ANTHROPIC_MESSAGES_URL.into(),
            };

            let body = serde_json::json!({
                "model": cfg.model,
                "max_tokens": 2048,
                "system": prompt.system,
                "messages": [
                    { "role": "user", "content": prompt.user }
                ]
            });

            (
                url,
                vec![
                    ("x-api-key", cfg.api_key.clone()),
                    ("anthropic-version", "2023-06-01".into()),
                ],
                body,
            )
        }
    }
}

fn extract_text(provider: Provider, v: &Value) -> Result<String, String> {
    match provider {
        Provider::OpenAI => v
            .get("output")
            .and_then(|o| o.as_array())
            .and_then(|arr| {
                arr.iter().find_map(|item| {
                    item.get("content")?
                        .as_array()?
                        .iter()
                        .find_map(|c| c.get("text")?.as_str())
                })
            })
            .map(str::to_owned)
            .ok_or_else(|| "OpenAI response parse failure".into()),

        Provider::Anthropic => v
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| "Anthropic response parse failure".into()),
    }
}

fn extract_embeddings(v: &Value) -> Result<Vec<Vec<f64>>, String> {
    let data = v
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or("embedding response has no data")?;

    data.iter()
        .map(|item| {
            item.get("embedding")
                .and_then(|e| e.as_array())
                .map(|e| e.iter().filter_map(|x| x.as_f64()).collect())
                .ok_or_else(|| "embedding entry has no vector".to_string())
        })
        .collect()
}
