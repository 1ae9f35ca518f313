// Copyright (c) 2026 EduCoin Contributors. MIT License.
// See LICENSE for details.

//! # EduCoin CLI
//!
//! Entry point for the `educoin` binary: a terminal client for the
//! classroom ledger that talks to the database directly. Useful for
//! teachers running a class without the HTTP server, and for poking at
//! a data directory offline.
//!
//! The CLI opens the sled database exclusively — stop `educoin-server`
//! before pointing it at the same data directory.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use educoin_ledger::config::{LedgerConfig, DEFAULT_TEACHER_SECRET};
use educoin_ledger::ops::LedgerService;
use educoin_ledger::store::LedgerDb;

/// EduCoin — classroom coin ledger, terminal edition.
#[derive(Debug, Parser)]
#[command(name = "educoin", version, about)]
pub struct EducoinCli {
    /// Ledger data directory.
    #[arg(
        short,
        long,
        global = true,
        env = "EDUCOIN_DATA_DIR",
        default_value = "educoin-data"
    )]
    pub data_dir: PathBuf,

    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a wallet and print its address and PIN.
    CreateWallet {
        /// Display name for the wallet.
        name: String,
    },

    /// Mint coins into a wallet (teacher only).
    Mint {
        /// Recipient address.
        to: String,

        /// Coins to mint.
        #[arg(short, long, default_value_t = educoin_ledger::config::MINT_DEFAULT_AMOUNT)]
        amount: u64,

        /// Optional note recorded in the ledger.
        #[arg(short, long)]
        note: Option<String>,

        /// Teacher secret authorizing the mint.
        #[arg(
            long,
            env = "EDUCOIN_TEACHER_SECRET",
            default_value = DEFAULT_TEACHER_SECRET,
            hide_default_value = true
        )]
        teacher_secret: String,
    },

    /// Move coins between wallets, authorized by the sender's PIN.
    Transfer {
        /// Sender address.
        from: String,

        /// Recipient address.
        to: String,

        /// Coins to move.
        amount: u64,

        /// The sender's PIN.
        #[arg(short, long)]
        pin: String,

        /// Optional note recorded in the ledger.
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show every wallet's balance, richest first.
    Balances,

    /// Show the top 10 wallets.
    Leaderboard,

    /// Show recent ledger rows, newest first.
    Ledger {
        /// Maximum rows to print.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the classroom at a glance: balances plus recent activity.
    Dashboard,
}

fn main() -> Result<()> {
    let cli = EducoinCli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let db = Arc::new(LedgerDb::open(&cli.data_dir.join("db")).with_context(|| {
        format!(
            "failed to open ledger database under {}",
            cli.data_dir.display()
        )
    })?);

    // The configured classroom secret comes from the environment or the
    // library default. `mint`'s --teacher-secret is the supplied
    // credential and is checked against it, never substituted for it.
    let service = LedgerService::new(db, LedgerConfig::new(configured_secret()));

    commands::dispatch(&service, cli.json, cli.command)
}

/// The classroom's configured teacher secret: `EDUCOIN_TEACHER_SECRET`
/// when set, the library default otherwise.
fn configured_secret() -> String {
    resolve_secret(std::env::var("EDUCOIN_TEACHER_SECRET").ok())
}

fn resolve_secret(env_secret: Option<String>) -> String {
    env_secret.unwrap_or_else(|| DEFAULT_TEACHER_SECRET.to_string())
}
