//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use leadscout_core::OutreachKind;

/// Scrape, enrich and prepare outreach for Colombian business leads.
///
/// Stages exchange a JSON array of leads: `scan`/`collect` write it,
/// `merge` and `enrich` transform it, and `outreach`/`export`/`sync`
/// consume it.
#[derive(Parser, Debug)]
#[command(name = "leadscout")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sweep Google Places across category terms and neighborhoods
    Scan(ScanArgs),
    /// Pull leads from a secondary source
    Collect(CollectArgs),
    /// Merge lead files, folding duplicates across sources
    Merge(MergeArgs),
    /// Score leads with a chat model or the offline heuristic
    Enrich(EnrichArgs),
    /// Write outreach artifacts for the best-scoring leads
    Outreach(OutreachArgs),
    /// Export leads as CSV, HTML dashboard, markdown report or JSON
    Export(ExportArgs),
    /// Upsert leads into Supabase or the local SQLite store
    Sync(SyncArgs),
    /// List built-in category and city presets
    Presets,
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScanArgs {
    /// Category preset slug (repeatable), e.g. nightlife, hotels
    #[arg(short = 'c', long = "category")]
    pub categories: Vec<String>,

    /// City preset slug (defaults to config `default_city`, then medellin)
    #[arg(long)]
    pub city: Option<String>,

    /// Extra search term (repeatable)
    #[arg(short = 't', long = "term")]
    pub terms: Vec<String>,

    /// Only scan these neighborhoods (repeatable)
    #[arg(short = 'n', long = "neighborhood")]
    pub neighborhoods: Vec<String>,

    /// Result pages per query (1-3)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub max_pages: Option<u8>,

    /// Pause between queries in milliseconds (max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay_ms: Option<u64>,

    /// Fetch place details (phone, website) for every result
    #[arg(long)]
    pub details: bool,

    /// Stop after this many queries
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_queries: Option<u32>,

    /// Drop results rated below this
    #[arg(long)]
    pub min_rating: Option<f32>,

    /// Drop results with fewer reviews
    #[arg(long)]
    pub min_reviews: Option<u32>,

    /// Drop leads already in the local SQLite store
    #[arg(long)]
    pub skip_known: bool,

    /// SQLite path for --skip-known (defaults to config `sqlite_path`)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output JSON file
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, env = "GOOGLE_PLACES_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    #[arg(long, env = "LEADSCOUT_PLACES_BASE_URL", hide = true)]
    pub places_base_url: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CollectArgs {
    #[command(subcommand)]
    pub source: CollectSource,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CollectSource {
    /// Search a subreddit for posts mentioning businesses
    Reddit {
        /// Subreddit name, with or without r/
        #[arg(long)]
        subreddit: String,
        #[arg(long)]
        query: String,
        /// Posts to fetch (1-100)
        #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u16).range(1..=100))]
        limit: u16,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, env = "LEADSCOUT_REDDIT_BASE_URL", hide = true)]
        base_url: Option<String>,
    },
    /// Live events of an Eventbrite organization
    Eventbrite {
        /// Numeric organization id
        #[arg(long)]
        organization: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, env = "EVENTBRITE_TOKEN", hide_env_values = true, default_value = "")]
        token: String,
        #[arg(long, env = "LEADSCOUT_EVENTBRITE_BASE_URL", hide = true)]
        base_url: Option<String>,
    },
    /// Resident Advisor event listings for an area
    Ra {
        /// Area id, or a city slug with a known area (medellin, bogota, cartagena)
        #[arg(long)]
        area: String,
        /// Days ahead to include (1-90)
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=90))]
        days: u32,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, env = "LEADSCOUT_RA_BASE_URL", hide = true)]
        base_url: Option<String>,
    },
    /// Scrape contact details from venue websites
    Website {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MergeArgs {
    /// Lead files to merge, in priority order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Jaro-Winkler similarity for cross-source name matches (0.5-1.0)
    #[arg(long, default_value_t = leadscout_core::DEFAULT_FUZZY_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EnrichArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Concurrent model calls (1-20)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub concurrency: Option<u8>,

    /// Use the heuristic scorer instead of a chat model
    #[arg(long)]
    pub offline: bool,

    /// Re-score leads that already carry an enrichment
    #[arg(long)]
    pub force: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub llm_api_key: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct OutreachArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long, value_parser = parse_kind)]
    pub kind: OutreachKind,

    #[arg(long)]
    pub out_dir: PathBuf,

    /// Minimum opportunity score (1-100)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub min_score: u8,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Use templates instead of a chat model
    #[arg(long)]
    pub offline: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub llm_api_key: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Html,
    Markdown,
    Json,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExportArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long, value_enum)]
    pub format: ExportFormat,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Opportunities listed in the markdown report
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Dashboard title
    #[arg(long, default_value = "Lead dashboard")]
    pub title: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Supabase,
    Sqlite,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SyncArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long, value_enum)]
    pub target: SyncTarget,

    /// SQLite path (defaults to config `sqlite_path`, then leadscout.db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Supabase table (defaults to config `supabase_table`, then businesses)
    #[arg(long)]
    pub table: Option<String>,

    #[arg(long, env = "SUPABASE_URL", default_value = "")]
    pub supabase_url: String,

    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true, default_value = "")]
    pub supabase_service_key: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
}

fn parse_kind(raw: &str) -> Result<OutreachKind, String> {
    raw.parse()
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.5..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside 0.5..=1.0"))
    }
}
