//! `sync`: upsert into Supabase or SQLite.

use anyhow::{Context, Result};
use leadscout_core::{Database, LeadSink, SqliteSink, SupabaseSink, read_records};
use tracing::info;

use super::{CommandContext, DEFAULT_SUPABASE_TABLE};
use crate::cli::{SyncArgs, SyncTarget};

pub async fn run_sync_command(args: &SyncArgs, ctx: &CommandContext) -> Result<()> {
    let records = read_records(&args.input)?;
    let sink: Box<dyn LeadSink> = match args.target {
        SyncTarget::Supabase => {
            let table = args
                .table
                .clone()
                .or_else(|| ctx.config.supabase_table.clone())
                .unwrap_or_else(|| DEFAULT_SUPABASE_TABLE.to_string());
            Box::new(SupabaseSink::new(
                &args.supabase_url,
                &args.supabase_service_key,
                table,
            )?)
        }
        SyncTarget::Sqlite => {
            let path = ctx.sqlite_path(args.db.as_ref());
            let db = Database::new(&path)
                .await
                .with_context(|| format!("Failed to open lead store '{}'", path.display()))?;
            Box::new(SqliteSink::new(db))
        }
    };

    let written = sink.upsert(&records).await?;
    info!(sink = sink.name(), written, "sync complete");
    println!("{written} leads upserted to {}", sink.name());
    Ok(())
}
