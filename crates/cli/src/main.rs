//! `tunestats` command-line entry point

mod commands;
mod context;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tunestats_domain::constants::{DEFAULT_CALLBACK_TIMEOUT_SECS, DEFAULT_TOP_ITEMS_LIMIT};

use crate::commands::{auth, stats};
use crate::context::AppContext;

#[derive(Debug, Parser)]
#[command(name = "tunestats", version, about = "Your listening statistics from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Read configuration from this file instead of the environment.
    #[arg(long, global = true, env = "TUNESTATS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured tracing filter (e.g. `debug`, `tunestats=trace`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in through the browser (or finish with a pasted code).
    Login {
        /// Authorization code copied from the redirect URL.
        #[arg(long)]
        code: Option<String>,
        /// Seconds to wait for the browser redirect.
        #[arg(long, default_value_t = DEFAULT_CALLBACK_TIMEOUT_SECS)]
        timeout: u64,
    },
    /// Sign out and forget stored credentials.
    Logout,
    /// Show whether a session exists.
    Status,
    /// Show the signed-in user's profile.
    Profile,
    /// List top artists or tracks.
    Top {
        /// `artists` or `tracks`.
        kind: tunestats_domain::ItemKind,
        /// `short-term`, `medium-term` or `long-term`.
        #[arg(long, default_value = "medium-term")]
        period: tunestats_domain::TimeRange,
        /// Number of entries (1-50).
        #[arg(long, default_value_t = DEFAULT_TOP_ITEMS_LIMIT)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = context::load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json_logs;
    tunestats_infra::init_tracing(&config.logging).context("failed to initialise logging")?;

    let ctx = AppContext::new(config).await?;

    match cli.command {
        Command::Login { code, timeout } => auth::login(&ctx, code.as_deref(), timeout).await,
        Command::Logout => auth::logout(&ctx).await,
        Command::Status => auth::status(&ctx).await,
        Command::Profile => stats::profile(&ctx).await,
        Command::Top { kind, period, limit } => stats::top(&ctx, kind, period, limit).await,
    }
}
