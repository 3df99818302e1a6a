mod cli;
mod config;
mod executor;
mod llm;
mod logger;
mod report;
mod scoring;
mod state;
mod testgen;
mod workflow;

use std::error::Error;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "forgerank",
    version,
    about = "Generate candidate implementations, filter them against a derived test suite, and rank the survivors."
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run one request through classification, generation, filtering and ranking
    Run(cli::RunArgs),
    /// Show or persist provider settings
    Config(cli::ConfigArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command {
        CliCommand::Run(args) => cli::run(args),
        CliCommand::Config(args) => cli::configure(args),
    }
}
