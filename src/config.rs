//! config.rs
//!
//! Settings file at `<config dir>/forgerank/config.toml`. Every field is
//! optional; environment variables override the file and CLI flags
//! override both.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::SandboxConfig;
use crate::llm::backend::LlmBackend;
use crate::llm::client::{LlmClient, Provider, ProviderConfig};
use crate::llm::embedding::LOCAL_EMBEDDING_MODEL;
use crate::workflow::RunSettings;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "FORGERANK_MODEL";
pub const ENV_PROVIDER: &str = "FORGERANK_PROVIDER";
pub const ENV_BASE_URL: &str = "FORGERANK_BASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(format!("Unknown provider `{other}` (openai, anthropic, ollama)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    pub program: String,
    pub args: Vec<String>,
    pub file_suffix: String,
    pub timeout_secs: u64,
}

impl Default for SandboxSection {
    fn default() -> Self {
        let d = SandboxConfig::default();
        Self {
            program: d.program,
            args: d.args,
            file_suffix: d.file_suffix,
            timeout_secs: d.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// `local` selects the offline token embedder.
    pub embedding_model: String,
    pub candidate_count: usize,
    pub test_count: usize,
    pub max_regenerations: u32,
    pub optimize: bool,
    pub interactive: bool,
    pub sandbox: SandboxSection,
}

impl Default for Config {
    fn default() -> Self {
        let run = RunSettings::default();
        Self {
            provider: ProviderKind::OpenAI,
            model: "gpt-5.2".into(),
            api_key: None,
            base_url: None,
            embedding_model: LOCAL_EMBEDDING_MODEL.into(),
            candidate_count: run.candidate_count,
            test_count: run.test_count,
            max_regenerations: run.max_regenerations,
            optimize: run.optimize,
            interactive: false,
            sandbox: SandboxSection::default(),
        }
    }
}

pub fn config_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("forgerank");
    dir.push("config.toml");
    dir
}

impl Config {
    /// File (if any) plus environment overrides.
    pub fn load() -> Result<Self, String> {
        let mut cfg = Self::load_from(&config_path())?;
        cfg.apply_env(|k| env::var(k).ok())?;
        Ok(cfg)
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw).map_err(|e| format!("{}: {e}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("{}: {e}", path.display())),
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), String> {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.model = model;
        }
        if let Some(p) = non_empty(ENV_PROVIDER) {
            self.provider = ProviderKind::parse(&p)?;
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, text).map_err(|e| e.to_string())
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            candidate_count: self.candidate_count,
            test_count: self.test_count,
            max_regenerations: self.max_regenerations,
            optimize: self.optimize,
        }
    }

    pub fn sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            program: self.sandbox.program.clone(),
            args: self.sandbox.args.clone(),
            file_suffix: self.sandbox.file_suffix.clone(),
            timeout: Duration::from_secs(self.sandbox.timeout_secs.max(1)),
            scratch_root: None,
        }
    }

    pub fn backend(&self) -> Result<LlmBackend, String> {
        let provider = match self.provider {
            ProviderKind::Ollama => return Ok(LlmBackend::ollama(self.model.clone())),
            ProviderKind::OpenAI => Provider::OpenAI,
            ProviderKind::Anthropic => Provider::Anthropic,
        };

        let api_key = self
            .api_key
            .clone()
            .ok_or("No API key configured. Run `forgerank config --set-key <KEY>` or set OPENAI_API_KEY.")?;

        let client = LlmClient::new(ProviderConfig {
            provider,
            model: self.model.clone(),
            api_key,
            base_url: self.base_url.clone(),
        })?;

        Ok(LlmBackend::remote(client))
    }
}
