// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `xasl-run`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "xasl-run",
    version,
    about = "Run the ExploreASL pipeline on a study and follow its progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML) holding the `[run]` request.
    ///
    /// Default: `XaslRun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "XaslRun.toml")]
    pub config: String,

    /// Name of the event channel; prefixes every printed event.
    #[arg(long, value_name = "NAME", default_value = "run")]
    pub channel: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `XASL_RUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Estimate the workload and print it, but don't start any worker.
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
