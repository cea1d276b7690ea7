//! `scan`: elite Google Places sweep.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use leadscout_core::places::MAX_PAGES;
use leadscout_core::query::{category_preset, city_preset, locations_for_city};
use leadscout_core::scanner::{DEFAULT_DETAILS_CONCURRENCY, DEFAULT_QUERY_DELAY};
use leadscout_core::{
    Database, EliteScanner, PlacesClient, QueryGenerator, ScanOptions, SqliteSink, write_records,
};
use tracing::{debug, info};

use super::progress::counting_bar;
use super::{CommandContext, DEFAULT_CITY};
use crate::cli::ScanArgs;

pub async fn run_scan_command(args: &ScanArgs, ctx: &CommandContext) -> Result<()> {
    let city_slug = args
        .city
        .clone()
        .or_else(|| ctx.config.default_city.clone())
        .unwrap_or_else(|| DEFAULT_CITY.to_string());
    let city = city_preset(&city_slug)
        .ok_or_else(|| anyhow!("Unknown city '{city_slug}'. Run `leadscout presets` for known cities"))?;

    let mut terms = Vec::new();
    let mut hints = Vec::new();
    for slug in &args.categories {
        let preset = category_preset(slug).ok_or_else(|| {
            anyhow!("Unknown category '{slug}'. Run `leadscout presets` for known categories")
        })?;
        terms.extend(preset.terms.iter().map(ToString::to_string));
        hints.push(preset.category);
    }
    terms.extend(args.terms.iter().cloned());
    if terms.is_empty() {
        bail!("Nothing to search. Pass at least one --category or --term");
    }
    // a single vertical gives unclassifiable results a sensible default
    let category_hint = match hints.as_slice() {
        [only] => Some(*only),
        _ => None,
    };

    let locations = locations_for_city(city, &args.neighborhoods, true);
    let mut generator = QueryGenerator::new(terms, locations);
    if let Some(max_queries) = args.max_queries {
        generator = generator.with_max_queries(max_queries as usize);
    }
    let queries = generator.generate();
    info!(city = city.name, queries = queries.len(), "queries generated");

    let client = match args.places_base_url.as_deref() {
        Some(base_url) => PlacesClient::with_base_url(&args.api_key, base_url),
        None => PlacesClient::new(&args.api_key),
    }
    .context("Failed to create Google Places client")?;

    let options = ScanOptions {
        max_pages: args.max_pages.or(ctx.config.max_pages).unwrap_or(MAX_PAGES),
        query_delay: args
            .delay_ms
            .or(ctx.config.query_delay_ms)
            .map_or(DEFAULT_QUERY_DELAY, Duration::from_millis),
        fetch_details: args.details,
        details_concurrency: ctx
            .config
            .details_concurrency
            .unwrap_or(DEFAULT_DETAILS_CONCURRENCY),
        min_rating: args.min_rating,
        min_reviews: args.min_reviews,
        skip_closed: true,
        category_hint,
    };
    debug!(?options, "scan options");

    let known_keys = if args.skip_known {
        let path = ctx.sqlite_path(args.db.as_ref());
        let db = Database::new(&path)
            .await
            .with_context(|| format!("Failed to open lead store '{}'", path.display()))?;
        let keys = SqliteSink::new(db).known_keys().await?;
        info!(known = keys.len(), "skipping leads already stored");
        keys
    } else {
        HashSet::new()
    };

    let scanner = EliteScanner::new(Arc::new(client), options).with_known_keys(known_keys);
    let bar = counting_bar(ctx.show_progress, queries.len(), "scan");
    let report = scanner
        .run(&queries, |progress| {
            bar.set_position(progress.completed as u64);
            bar.set_message(format!(
                "{} ({} unique)",
                progress.query, progress.unique_so_far
            ));
        })
        .await?;
    bar.finish_and_clear();

    write_records(&args.output, &report.records)?;
    let stats = &report.stats;
    info!(
        queries = stats.queries_run,
        failed = stats.queries_failed,
        raw = stats.raw_results,
        duplicates = stats.duplicates,
        filtered = stats.filtered,
        details = stats.details_fetched,
        "scan complete"
    );
    println!(
        "{} leads from {} queries written to {}",
        report.records.len(),
        stats.queries_run,
        args.output.display()
    );
    Ok(())
}
