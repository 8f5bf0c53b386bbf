//! Cache command - inspect or purge the local TTL cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;

use super::{Context, human_duration};

/// Arguments for the cache command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show entry count and size of the cache
    Info,

    /// Remove expired entries
    Sweep,

    /// Remove every cache entry
    Clear,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    dir: String,
    namespace: String,
    entries: usize,
    bytes: usize,
    megabytes: f64,
}

#[derive(Debug, Serialize)]
struct RemovedOutput {
    removed: usize,
}

/// Run the cache command.
pub async fn run(args: CacheArgs, ctx: &Context) -> Result<()> {
    match args.command {
        CacheCommand::Info => cmd_info(ctx).await,
        CacheCommand::Sweep => {
            let removed = ctx.open_cache().clear_expired().await;
            print_removed(ctx, removed, "expired")
        }
        CacheCommand::Clear => {
            let removed = ctx.open_cache().clear().await;
            print_removed(ctx, removed, "cached")
        }
    }
}

async fn cmd_info(ctx: &Context) -> Result<()> {
    let cache = ctx.open_cache();
    let info = cache.info().await;
    let output = InfoOutput {
        dir: ctx.cache_dir().display().to_string(),
        namespace: cache.config().namespace.clone(),
        entries: info.entries,
        bytes: info.bytes,
        megabytes: info.megabytes,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("finsync cache").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Directory:"), output.dir);
    println!("  {} {}", dim.apply_to("Namespace:"), output.namespace);
    println!("  {} {}", dim.apply_to("Entries:"), output.entries);
    println!(
        "  {} {} bytes ({:.2} MB)",
        dim.apply_to("Size:"),
        output.bytes,
        output.megabytes
    );

    if ctx.verbose {
        let tiers = cache.tiers();
        println!();
        println!(
            "  {} short {} / medium {} / long {} / very long {}",
            dim.apply_to("TTL tiers:"),
            human_duration(tiers.short),
            human_duration(tiers.medium),
            human_duration(tiers.long),
            human_duration(tiers.very_long)
        );
    }
    println!();
    Ok(())
}

fn print_removed(ctx: &Context, removed: usize, what: &str) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&RemovedOutput { removed })?);
    } else {
        println!("Removed {} {} entries", removed, what);
    }
    Ok(())
}
