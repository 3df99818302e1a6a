//! cli.rs
//!
//! `run` and `config` subcommands.

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::config::{Config, ProviderKind};
use crate::executor::Sandbox;
use crate::llm::agent::LlmAgent;
use crate::llm::backend::LlmBackend;
use crate::llm::embedding::{RemoteEmbedder, TokenEmbedder, LOCAL_EMBEDDING_MODEL};
use crate::llm::{Collaborators, EmbeddingModel};
use crate::logger::{log, RunLog};
use crate::report::RunReport;
use crate::state::LogLevel;
use crate::testgen::select::{ComplexitySelector, ConsoleSelector, TestSelector};
use crate::workflow::Pipeline;

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(help = "Request text; read from --input-file or stdin when omitted")]
    pub input: Option<String>,

    #[arg(long, help = "Read the request from this file")]
    pub input_file: Option<PathBuf>,

    #[arg(long, help = "Candidate implementations per generation round")]
    pub candidates: Option<usize>,

    #[arg(long, help = "Test cases per kind (valid and invalid)")]
    pub tests: Option<usize>,

    #[arg(long, help = "Regeneration rounds before giving up")]
    pub max_regenerations: Option<u32>,

    #[arg(long, default_value_t = false, help = "Refine the best candidate after ranking")]
    pub optimize: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Pick the phase-1 test cases by hand"
    )]
    pub interactive: bool,

    #[arg(long, help = "Per-candidate sandbox timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Write the JSON report to this path")]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Print the JSON report instead of the summary")]
    pub json_only: bool,

    #[arg(long, default_value_t = false, help = "Do not echo log lines to stderr")]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    #[arg(long, help = "openai | anthropic | ollama")]
    pub provider: Option<String>,

    #[arg(long, help = "Model name for the selected provider")]
    pub model: Option<String>,

    #[arg(long, help = "Store an API key in the config file")]
    pub set_key: Option<String>,

    #[arg(long, help = "Override the provider API base URL")]
    pub base_url: Option<String>,
}

/* ============================================================
   run
   ============================================================ */

pub fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut cfg = Config::load()?;
    apply_run_args(&mut cfg, &args);

    let input = resolve_input(&args)?;

    let mut run = if args.quiet || args.json_only {
        RunLog::quiet()
    } else {
        RunLog::new()
    };

    let backend = cfg.backend()?;
    log(
        &mut run,
        LogLevel::Info,
        format!(
            "Using {} ({} candidates, {} tests per kind, {} regenerations)",
            backend.label(),
            cfg.candidate_count,
            cfg.test_count,
            cfg.max_regenerations
        ),
    );

    let pipeline = build_pipeline(&cfg, backend);
    let state = pipeline.run_workflow(&input, &mut run)?;
    let report = RunReport::from_state(&state, &run);

    if let Some(path) = &args.out {
        report.write_json(path)?;
        log(&mut run, LogLevel::Success, format!("Report written to {}", path.display()));
    }

    if args.json_only {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }

    Ok(())
}

/// CLI flags override config and environment.
pub fn apply_run_args(cfg: &mut Config, args: &RunArgs) {
    if let Some(n) = args.candidates {
        cfg.candidate_count = n;
    }
    if let Some(n) = args.tests {
        cfg.test_count = n;
    }
    if let Some(n) = args.max_regenerations {
        cfg.max_regenerations = n;
    }
    if let Some(secs) = args.timeout {
        cfg.sandbox.timeout_secs = secs;
    }
    cfg.optimize |= args.optimize;
    cfg.interactive |= args.interactive;
}

fn resolve_input(args: &RunArgs) -> Result<String, String> {
    let text = if let Some(text) = &args.input {
        text.clone()
    } else if let Some(path) = &args.input_file {
        fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| e.to_string())?;
        buf
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err("Empty request. Pass INPUT, --input-file, or pipe text on stdin.".into());
    }
    Ok(text)
}

pub fn build_pipeline(cfg: &Config, backend: LlmBackend) -> Pipeline {
    let embedder: Arc<dyn EmbeddingModel> = if cfg.embedding_model == LOCAL_EMBEDDING_MODEL {
        Arc::new(TokenEmbedder::default())
    } else {
        Arc::new(RemoteEmbedder::new(backend.clone(), cfg.embedding_model.clone()))
    };

    let selector: Arc<dyn TestSelector> = if cfg.interactive {
        Arc::new(ConsoleSelector)
    } else {
        Arc::new(ComplexitySelector)
    };

    let agent = Arc::new(LlmAgent::new(backend));
    let collab = Collaborators::from_agent(agent, embedder, selector);

    Pipeline::new(
        cfg.run_settings(),
        collab,
        Sandbox::new(cfg.sandbox_config()),
    )
}

/* ============================================================
   config
   ============================================================ */

pub fn configure(args: ConfigArgs) -> Result<(), Box<dyn Error>> {
    let mut cfg = Config::load_from(&crate::config::config_path())?;
    let changed = apply_config_args(&mut cfg, &args)?;

    if changed {
        let path = cfg.save()?;
        println!("Saved {}", path.display());
    }

    match cfg.backend() {
        Ok(backend) => println!("provider: {}", backend.label()),
        Err(e) => println!("provider: not ready ({e})"),
    }
    println!(
        "api key:  {}",
        if cfg.api_key.is_some() { "set" } else { "not set" }
    );
    if let Some(url) = &cfg.base_url {
        println!("base url: {url}");
    }
    Ok(())
}

/// Returns whether anything changed.
pub fn apply_config_args(cfg: &mut Config, args: &ConfigArgs) -> Result<bool, String> {
    let mut changed = false;

    if let Some(p) = &args.provider {
        cfg.provider = ProviderKind::parse(p)?;
        changed = true;
    }
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        cfg.model = model.to_string();
        changed = true;
    }
    if let Some(key) = args.set_key.as_deref().map(str::trim) {
        if key.is_empty() {
            return Err("API key cannot be empty".into());
        }
        cfg.api_key = Some(key.to_string());
        changed = true;
    }
    if let Some(url) = &args.base_url {
        cfg.base_url = Some(url.trim_end_matches('/').to_string());
        changed = true;
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut cfg = Config::default();
        cfg.optimize = true;

        apply_run_args(
            &mut cfg,
            &RunArgs {
                candidates: Some(5),
                timeout: Some(2),
                interactive: true,
                ..RunArgs::default()
            },
        );

        assert_eq!(cfg.candidate_count, 5);
        assert_eq!(cfg.test_count, 10);
        assert_eq!(cfg.sandbox.timeout_secs, 2);
        assert!(cfg.interactive);
        assert!(cfg.optimize);
    }

    #[test]
    fn inline_input_is_trimmed_and_blank_rejected() {
        let args = RunArgs {
            input: Some("  weigh a loan  ".into()),
            ..RunArgs::default()
        };
        assert_eq!(resolve_input(&args).unwrap(), "weigh a loan");

        let blank = RunArgs {
            input: Some("   ".into()),
            ..RunArgs::default()
        };
        assert!(resolve_input(&blank).is_err());
    }

    #[test]
    fn input_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("req.txt");
        fs::write(&path, "from a file\n").unwrap();

        let args = RunArgs {
            input_file: Some(path),
            ..RunArgs::default()
        };
        assert_eq!(resolve_input(&args).unwrap(), "from a file");
    }

    #[test]
    fn config_args_update_provider_and_key() {
        let mut cfg = Config::default();
        let changed = apply_config_args(
            &mut cfg,
            &ConfigArgs {
                provider: Some("ollama".into()),
                set_key: Some(" sk-1 ".into()),
                base_url: Some("http://localhost:8080/v1/".into()),
                ..ConfigArgs::default()
            },
        )
        .unwrap();

        assert!(changed);
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.api_key.as_deref(), Some("sk-1"));
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:8080/v1"));
    }

    #[test]
    fn empty_key_and_unknown_provider_are_errors() {
        let mut cfg = Config::default();
        let empty_key = ConfigArgs {
            set_key: Some(" ".into()),
            ..ConfigArgs::default()
        };
        assert!(apply_config_args(&mut cfg, &empty_key).is_err());

        let bad = ConfigArgs {
            provider: Some("mystery".into()),
            ..ConfigArgs::default()
        };
        assert!(apply_config_args(&mut cfg, &bad).is_err());
    }

    #[test]
    fn no_flags_means_no_change() {
        let mut cfg = Config::default();
        assert_eq!(apply_config_args(&mut cfg, &ConfigArgs::default()), Ok(false));
    }

    #[test]
    fn pipeline_takes_counts_from_config() {
        let mut cfg = Config::default();
        cfg.provider = ProviderKind::Ollama;
        cfg.candidate_count = 7;
        cfg.sandbox.timeout_secs = 0;

        let backend = cfg.backend().unwrap();
        assert_eq!(backend.label(), "ollama/gpt-5.2");

        let pipeline = build_pipeline(&cfg, backend);
        assert_eq!(pipeline.settings.candidate_count, 7);
        assert_eq!(pipeline.sandbox.config().timeout.as_secs(), 1);
    }

    #[test]
    fn configured_provider_is_labelled_by_its_backend() {
        let mut cfg = Config::default();
        apply_config_args(
            &mut cfg,
            &ConfigArgs {
                provider: Some("anthropic".into()),
                model: Some("claude-x".into()),
                set_key: Some("sk-2".into()),
                ..ConfigArgs::default()
            },
        )
        .unwrap();

        assert_eq!(cfg.backend().unwrap().label(), "anthropic/claude-x");
    }
}
