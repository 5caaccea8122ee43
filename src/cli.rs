// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ExecutionStrategy;

/// Command-line arguments for `tierdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tierdag",
    version,
    about = "Run a plan of prioritised, dependency-ordered commands in parallel.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML). Defaults to `Tierdag.toml`.
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    /// Worker pool size; overrides `[config].workers`.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Execution strategy; overrides `[config].strategy`.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub strategy: Option<ExecutionStrategy>,

    /// Retries per task; overrides `[config.retry].max_retries`.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TIERDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse and validate the plan, print it in dependency order, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
