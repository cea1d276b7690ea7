//! `enrich`: opportunity scoring.

use std::sync::Arc;

use anyhow::{Context, Result};
use leadscout_core::enrich::DEFAULT_CONCURRENCY;
use leadscout_core::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use leadscout_core::{
    ChatClient, Enricher, HeuristicEnricher, LlmEnricher, OpenAiChatClient, enrich_batch,
    read_records, write_records,
};
use tracing::info;

use super::CommandContext;
use super::progress::counting_bar;
use crate::cli::EnrichArgs;

/// Builds the configured chat client.
pub(crate) fn chat_client(api_key: &str, ctx: &CommandContext) -> Result<Arc<dyn ChatClient>> {
    let model = ctx.config.llm_model.as_deref().unwrap_or(DEFAULT_MODEL);
    let base_url = ctx.config.llm_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let client = OpenAiChatClient::with_base_url(api_key, model, base_url)
        .context("Failed to create LLM client")?;
    Ok(Arc::new(client))
}

pub async fn run_enrich_command(args: &EnrichArgs, ctx: &CommandContext) -> Result<()> {
    let mut records = read_records(&args.input)?;
    if args.force {
        for record in &mut records {
            record.enrichment = None;
        }
    }

    let enricher: Arc<dyn Enricher> = if args.offline {
        info!("offline mode: heuristic scoring");
        Arc::new(HeuristicEnricher)
    } else {
        Arc::new(LlmEnricher::new(chat_client(&args.llm_api_key, ctx)?))
    };
    let concurrency = args
        .concurrency
        .map(usize::from)
        .or(ctx.config.enrich_concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);

    let pending = records.iter().filter(|r| r.enrichment.is_none()).count();
    let bar = counting_bar(ctx.show_progress, pending, "enrich");
    let report = enrich_batch(enricher, records, concurrency, |done, _total| {
        bar.set_position(done as u64);
    })
    .await?;
    bar.finish_and_clear();

    write_records(&args.output, &report.records)?;
    println!(
        "{} enriched, {} failed, {} already enriched; written to {}",
        report.enriched,
        report.failed,
        report.skipped,
        args.output.display()
    );
    Ok(())
}
