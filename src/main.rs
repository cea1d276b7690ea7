//! CLI entry point for leadscout.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use leadscout_core::http_client::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, configure_http_timeouts,
};
use tracing::debug;

mod app_config;
mod cli;
mod commands;

use app_config::load_default_file_config;
use cli::{Args, Command, ConfigCommand};
use commands::CommandContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let Some(command) = args.command else {
        println!("No command given. Start with `leadscout presets`, then `leadscout scan --help`.");
        println!("Run `leadscout --help` for every command.");
        return Ok(());
    };

    let loaded = load_default_file_config()?;
    let show_progress = !args.quiet && io::stderr().is_terminal();
    let ctx = CommandContext::new(loaded, show_progress);
    configure_http_timeouts(
        ctx.config
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        ctx.config
            .read_timeout_secs
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
    );

    match command {
        Command::Scan(scan) => commands::run_scan_command(&scan, &ctx).await,
        Command::Collect(collect) => commands::run_collect_command(&collect, &ctx).await,
        Command::Merge(merge) => commands::run_merge_command(&merge),
        Command::Enrich(enrich) => commands::run_enrich_command(&enrich, &ctx).await,
        Command::Outreach(outreach) => commands::run_outreach_command(&outreach, &ctx).await,
        Command::Export(export) => commands::run_export_command(&export),
        Command::Sync(sync) => commands::run_sync_command(&sync, &ctx).await,
        Command::Presets => {
            commands::run_presets_command();
            Ok(())
        }
        Command::Config(config) => match config.command {
            ConfigCommand::Show => {
                commands::run_config_show_command(&ctx);
                Ok(())
            }
        },
    }
}
