//! `collect`: secondary sources into the shared lead format.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Days, Utc};
use leadscout_core::normalize::{
    normalize_eventbrite_event, normalize_ra_event, normalize_reddit_post, normalize_website,
};
use leadscout_core::query::city_preset;
use leadscout_core::sources::resident_advisor::{AREA_IDS, area_for_city};
use leadscout_core::sources::{
    EventbriteClient, RedditClient, ResidentAdvisorClient, WebsiteScraper,
};
use leadscout_core::{BusinessRecord, Deduplicator, RateLimiter, write_records};
use tracing::{info, warn};

use super::CommandContext;
use super::progress::counting_bar;
use crate::cli::{CollectArgs, CollectSource};

/// Public endpoints get one request per second per host.
const SOURCE_MIN_DELAY: Duration = Duration::from_secs(1);

fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(SOURCE_MIN_DELAY).with_jitter(Duration::from_millis(250)))
}

/// Resolves `--area` to an RA area id and, when known, the city name.
fn resolve_area(raw: &str) -> Result<(u32, Option<&'static str>)> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u32>() {
        let city = AREA_IDS
            .iter()
            .find(|(_, area)| *area == id)
            .and_then(|(slug, _)| city_preset(slug))
            .map(|preset| preset.name);
        return Ok((id, city));
    }
    let id = area_for_city(raw).ok_or_else(|| {
        anyhow!("Unknown Resident Advisor area '{raw}'. Pass a numeric area id or medellin, bogota, cartagena")
    })?;
    Ok((id, city_preset(raw).map(|preset| preset.name)))
}

fn finish(records: Vec<BusinessRecord>, output: &std::path::Path, source: &str) -> Result<()> {
    let deduped: Deduplicator<BusinessRecord> = records.into_iter().collect();
    let duplicates = deduped.duplicates();
    let records = deduped.into_vec();
    write_records(output, &records)?;
    info!(source, leads = records.len(), duplicates, "collect complete");
    println!(
        "{} {source} leads written to {}",
        records.len(),
        output.display()
    );
    Ok(())
}

pub async fn run_collect_command(args: &CollectArgs, ctx: &CommandContext) -> Result<()> {
    match &args.source {
        CollectSource::Reddit {
            subreddit,
            query,
            limit,
            output,
            base_url,
        } => {
            let client = match base_url.as_deref() {
                Some(base_url) => RedditClient::with_base_url(base_url, limiter()),
                None => RedditClient::new(limiter()),
            }
            .context("Failed to create Reddit client")?;
            let posts = client.search(subreddit, query, *limit).await?;
            let records = posts.iter().map(normalize_reddit_post).collect();
            finish(records, output, "reddit")
        }
        CollectSource::Eventbrite {
            organization,
            output,
            token,
            base_url,
        } => {
            let client = match base_url.as_deref() {
                Some(base_url) => EventbriteClient::with_base_url(token, base_url, limiter()),
                None => EventbriteClient::new(token, limiter()),
            }?;
            let events = client.organization_events(organization).await?;
            let without_venue = events.iter().filter(|e| e.venue.is_none()).count();
            if without_venue > 0 {
                info!(without_venue, "online events skipped");
            }
            let records = events.iter().filter_map(normalize_eventbrite_event).collect();
            finish(records, output, "eventbrite")
        }
        CollectSource::Ra {
            area,
            days,
            output,
            base_url,
        } => {
            let (area_id, city) = resolve_area(area)?;
            let client = match base_url.as_deref() {
                Some(base_url) => ResidentAdvisorClient::with_base_url(base_url, limiter()),
                None => ResidentAdvisorClient::new(limiter()),
            }?;
            let from = Utc::now().date_naive();
            let to = from
                .checked_add_days(Days::new(u64::from(*days)))
                .ok_or_else(|| anyhow!("--days {days} overflows the calendar"))?;
            let listings = client.area_events(area_id, from, to).await?;
            let records = listings
                .iter()
                .filter_map(|listing| normalize_ra_event(listing, city))
                .collect();
            finish(records, output, "resident_advisor")
        }
        CollectSource::Website { urls, output } => {
            let scraper = WebsiteScraper::new(limiter())?;
            let bar = counting_bar(ctx.show_progress, urls.len(), "website");
            let mut records = Vec::new();
            let mut failed = 0;
            for url in urls {
                bar.set_message(url.clone());
                match scraper.scrape(url).await {
                    Ok(contacts) if contacts.is_empty() => {
                        warn!(url = %url, "no contact details found");
                        records.push(normalize_website(&contacts));
                    }
                    Ok(contacts) => records.push(normalize_website(&contacts)),
                    Err(error) => {
                        warn!(url = %url, error = %error, "website skipped");
                        failed += 1;
                    }
                }
                bar.inc(1);
            }
            bar.finish_and_clear();
            if records.is_empty() && failed > 0 {
                bail!("All {failed} websites failed to load");
            }
            finish(records, output, "website")
        }
    }
}
