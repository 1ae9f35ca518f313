//! # CLI Interface
//!
//! Defines the command-line argument structure for `educoin-server` using
//! `clap` derive. Two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EduCoin classroom ledger server.
///
/// Serves the JSON API for wallet creation, teacher mints, student
/// transfers, and the balance/leaderboard/ledger views, plus a Prometheus
/// metrics endpoint.
#[derive(Parser, Debug)]
#[command(
    name = "educoin-server",
    about = "EduCoin classroom ledger server",
    version,
    propagate_version = true
)]
pub struct EducoinServerCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the server binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger server.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the data directory where the ledger database is stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "EDUCOIN_DATA_DIR", default_value = "educoin-data")]
    pub data_dir: PathBuf,

    /// Port for the JSON API.
    #[arg(long, env = "EDUCOIN_PORT", default_value_t = 8470)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "EDUCOIN_METRICS_PORT", default_value_t = 8471)]
    pub metrics_port: u16,

    /// The teacher secret that authorizes mint operations.
    ///
    /// **Set this in any real classroom** — the default is well known.
    #[arg(
        long,
        env = "EDUCOIN_TEACHER_SECRET",
        default_value = educoin_ledger::config::DEFAULT_TEACHER_SECRET,
        hide_default_value = true
    )]
    pub teacher_secret: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "EDUCOIN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
