// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The CLI is a thin front-end: it loads the config, hands task names to the
//! resolver and prints reports as log lines.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `conductor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "conductor",
    version,
    about = "Resolve, schedule and run tasks; re-run them when files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, global = true, value_name = "PATH", default_value = "Conductor.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONDUCTOR_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the given tasks once.
    Run {
        /// Task names, aliases or adaptor invocations (e.g. `build`, `sass:*`, `@sh make`).
        #[arg(required = true, value_name = "TASK")]
        tasks: Vec<String>,

        /// Run the top-level tasks in parallel instead of in series.
        #[arg(long, short = 'p')]
        parallel: bool,

        /// Keep running series siblings after a task fails.
        #[arg(long)]
        continue_on_error: bool,

        /// Resolve and print the task tree without executing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Watch files and run the tasks of the selected watch groups on change.
    Watch {
        /// Watch group names (all groups when omitted).
        #[arg(value_name = "GROUP")]
        groups: Vec<String>,

        /// Resolve and print the watchers without starting them.
        #[arg(long)]
        dry_run: bool,
    },
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
