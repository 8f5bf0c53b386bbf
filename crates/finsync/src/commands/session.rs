//! Session command - inspect or clear stored credentials.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;

use super::{Context, human_duration};

/// Arguments for the session command.
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Show what is stored in the keyring
    Status,

    /// Remove every stored credential
    Clear,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    keyring_service: String,
    user_id: Option<String>,
    has_token: bool,
    has_refresh_token: bool,
    expires_at: Option<String>,
    valid: bool,
}

/// Run the session command.
pub async fn run(args: SessionArgs, ctx: &Context) -> Result<()> {
    match args.command {
        SessionCommand::Status => cmd_status(ctx).await,
        SessionCommand::Clear => cmd_clear(ctx).await,
    }
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let config = ctx.session_config();
    let store = ctx.credential_store();
    let expiry = store.session_expiry().await;
    let output = StatusOutput {
        keyring_service: config.keyring_service.clone(),
        user_id: store.user_id().await,
        has_token: store.token().await.is_some(),
        has_refresh_token: store.refresh_token().await.is_some(),
        expires_at: expiry.map(|e| e.to_rfc3339()),
        valid: store.is_session_valid(Utc::now()).await,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let state = if output.valid {
        Style::new().green().apply_to("● active")
    } else if output.user_id.is_some() {
        Style::new().yellow().apply_to("● expired")
    } else {
        Style::new().red().apply_to("● signed out")
    };

    println!();
    println!("{}", style("finsync session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Status:"), state);
    if let Some(user_id) = &output.user_id {
        println!("  {} {}", dim.apply_to("User:"), user_id);
    }
    if let Some(expires_at) = &output.expires_at {
        println!("  {} {}", dim.apply_to("Expires:"), expires_at);
    }
    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Keyring:"), output.keyring_service);
        println!(
            "  {} {} / renew every {}",
            dim.apply_to("Lifetime:"),
            human_duration(config.duration),
            human_duration(config.renewal_interval)
        );
    }
    println!();
    Ok(())
}

async fn cmd_clear(ctx: &Context) -> Result<()> {
    ctx.credential_store().clear_auth_data().await;
    if ctx.json_output {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        println!("Stored credentials cleared");
    }
    Ok(())
}
