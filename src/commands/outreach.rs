//! `outreach`: artifacts for the best leads.

use anyhow::Result;
use leadscout_core::outreach::{select_targets, write_artifacts};
use leadscout_core::{OutreachGenerator, read_records};
use tracing::{info, warn};

use super::CommandContext;
use super::enrich::chat_client;
use super::progress::counting_bar;
use crate::cli::OutreachArgs;

pub async fn run_outreach_command(args: &OutreachArgs, ctx: &CommandContext) -> Result<()> {
    let records = read_records(&args.input)?;
    if records.iter().all(|r| r.enrichment.is_none()) {
        warn!("no lead carries an opportunity score; run `leadscout enrich` first");
    }
    let targets = select_targets(&records, args.min_score, args.limit);
    info!(
        targets = targets.len(),
        min_score = args.min_score,
        kind = %args.kind,
        "outreach targets selected"
    );

    let chat = if args.offline {
        None
    } else {
        Some(chat_client(&args.llm_api_key, ctx)?)
    };
    let persona = ctx.config.persona.clone().unwrap_or_default();
    let generator = OutreachGenerator::new(persona, chat);

    let bar = counting_bar(ctx.show_progress, targets.len(), "outreach");
    let mut artifacts = Vec::with_capacity(targets.len());
    for record in targets {
        bar.set_message(record.name.clone());
        artifacts.push(generator.generate(record, args.kind).await);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let paths = write_artifacts(&args.out_dir, &artifacts)?;
    let from_template = artifacts
        .iter()
        .filter(|a| a.generated_by == "template")
        .count();
    println!(
        "{} {} artifacts ({} from templates) written to {}",
        paths.len(),
        args.kind,
        from_template,
        args.out_dir.display()
    );
    Ok(())
}
