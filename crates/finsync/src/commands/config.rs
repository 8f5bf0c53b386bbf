//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use finsync_config::FinsyncConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration and the files it came from
    Show,
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    sources: Vec<String>,
    warnings: &'a [String],
    /// Effective values with every section defaulted.
    config: FinsyncConfig,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
    }
}

fn effective(config: &FinsyncConfig) -> FinsyncConfig {
    FinsyncConfig {
        cache: Some(config.cache()),
        session: Some(config.session()),
        stream: Some(config.stream()),
        logging: Some(config.logging()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = effective(&loaded.config);

    if ctx.json_output {
        let output = ShowOutput {
            sources: loaded
                .loaded_from()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            warnings: &loaded.warnings,
            config,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# finsync configuration\n");
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)");
    } else {
        for source in &sources {
            println!("# from {}", source.display());
        }
    }
    for warning in &loaded.warnings {
        println!("# warning: {}", warning);
    }
    if ctx.verbose {
        let stream = ctx.stream_config();
        println!(
            "# live streams: search debounce {}ms, buffer {}",
            stream.search_debounce.as_millis(),
            stream.buffer_size
        );
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
