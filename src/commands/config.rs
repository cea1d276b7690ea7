//! Config command handlers: show effective configuration.

use std::env;
use std::time::Duration;

use leadscout_core::enrich::DEFAULT_CONCURRENCY;
use leadscout_core::http_client::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};
use leadscout_core::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use leadscout_core::places::MAX_PAGES;
use leadscout_core::scanner::{DEFAULT_DETAILS_CONCURRENCY, DEFAULT_QUERY_DELAY};

use super::{CommandContext, DEFAULT_CITY, DEFAULT_SUPABASE_TABLE};

const SECRETS: [&str; 5] = [
    "GOOGLE_PLACES_API_KEY",
    "OPENAI_API_KEY",
    "SUPABASE_URL",
    "SUPABASE_SERVICE_KEY",
    "EVENTBRITE_TOKEN",
];

fn secret_state(name: &str) -> &'static str {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => "set",
        _ => "unset",
    }
}

pub fn run_config_show_command(ctx: &CommandContext) {
    let cfg = &ctx.config;
    let resolved_path = ctx.loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if ctx.loaded.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!(
        "default_city = {}",
        cfg.default_city.as_deref().unwrap_or(DEFAULT_CITY)
    );
    println!(
        "query_delay_ms = {}",
        cfg.query_delay_ms
            .map_or(DEFAULT_QUERY_DELAY, Duration::from_millis)
            .as_millis()
    );
    println!("max_pages = {}", cfg.max_pages.unwrap_or(MAX_PAGES));
    println!(
        "details_concurrency = {}",
        cfg.details_concurrency.unwrap_or(DEFAULT_DETAILS_CONCURRENCY)
    );
    println!(
        "enrich_concurrency = {}",
        cfg.enrich_concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    );
    println!("llm_model = {}", cfg.llm_model.as_deref().unwrap_or(DEFAULT_MODEL));
    println!(
        "llm_base_url = {}",
        cfg.llm_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    );
    println!(
        "supabase_table = {}",
        cfg.supabase_table.as_deref().unwrap_or(DEFAULT_SUPABASE_TABLE)
    );
    println!("sqlite_path = {}", ctx.sqlite_path(None).display());
    println!(
        "connect_timeout_secs = {}",
        cfg.connect_timeout_secs.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    );
    println!(
        "read_timeout_secs = {}",
        cfg.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS)
    );
    let persona = cfg.persona.clone().unwrap_or_default();
    println!("persona.sender_name = {}", persona.sender_name);
    println!("persona.agency = {}", persona.agency);
    println!("persona.language = {}", persona.language);
    for name in SECRETS {
        println!("{} = {}", name.to_ascii_lowercase(), secret_state(name));
    }
}
