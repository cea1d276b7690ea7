//! Shared User-Agent strings for API and website HTTP clients.
//!
//! Single source for project URL and UA format so API and scraping traffic
//! stay consistent and easy to update.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/leadscout";

/// Default User-Agent for JSON API requests (Places, Reddit, Eventbrite, LLM, Supabase).
#[must_use]
pub(crate) fn default_api_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("leadscout/{version} (lead-research-tool; +{PROJECT_UA_URL})")
}

/// Browser-like User-Agent for venue website scraping.
///
/// Many small-business sites sit behind hosting firewalls that reject
/// non-browser agents outright.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
