//! finsync - offline diagnostics for the personal finance sync layer.
//!
//! Main entry point for the finsync CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{cache, config, dashboard, records, session};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// finsync - inspect the local cache, credentials and record exports
#[derive(Parser)]
#[command(name = "finsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: platform config dir)
    #[arg(long, global = true, env = "FINSYNC_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or purge the local TTL cache
    Cache(cache::CacheArgs),

    /// Filter and sort a JSON record export
    Records(records::RecordsArgs),

    /// Compute dashboard aggregates from a JSON record export
    Dashboard(dashboard::DashboardArgs),

    /// Inspect or clear stored credentials
    Session(session::SessionArgs),

    /// Configuration inspection
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Workspace crates whose events the log filters name explicitly.
const LOG_TARGETS: &[&str] = &[
    "finsync",
    "finsync_types",
    "finsync_config",
    "finsync_cache",
    "finsync_session",
    "finsync_repository",
    "finsync_reactive",
];

/// `EnvFilter` directive: every workspace crate at `level`, the rest at
/// `fallback`.
fn target_filter(level: &str, fallback: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    directives.push(fallback.to_string());
    directives.join(",")
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = finsync_config::load_config_with_options(None, cli.config_dir.as_deref())?;
    let config_dir = cli
        .config_dir
        .clone()
        .or_else(finsync_config::user_config_dir);

    // Console layer on stderr, daily-rotated JSON file layer
    let filter = if cli.verbose {
        target_filter("debug", "info")
    } else {
        loaded
            .config
            .logging()
            .level
            .unwrap_or_else(|| target_filter("info", "warn"))
    };

    let log_dir = config_dir
        .as_ref()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "finsync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(target_filter(
                    "trace", "info",
                ))),
        )
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        loaded,
    };

    match cli.command {
        Commands::Cache(args) => cache::run(args, &ctx).await,
        Commands::Records(args) => records::run(args, &ctx).await,
        Commands::Dashboard(args) => dashboard::run(args, &ctx).await,
        Commands::Session(args) => session::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_filter_names_every_crate() {
        let filter = target_filter("debug", "info");
        for target in [
            "finsync_types=debug",
            "finsync_repository=debug",
            "finsync_reactive=debug",
            "finsync_session=debug",
        ] {
            assert!(filter.split(',').any(|d| d == target), "{} missing", target);
        }
        assert!(filter.ends_with(",info"));
        assert!(tracing_subscriber::EnvFilter::try_new(&filter).is_ok());
    }
}
