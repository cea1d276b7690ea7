//! Shared HTTP client construction policy.
//!
//! Every outbound client (Places, Reddit, Eventbrite, Resident Advisor,
//! website scraper, LLM, Supabase) is built here so timeouts, user-agent,
//! compression and proxy handling stay consistent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Failure to construct an HTTP client.
#[derive(Debug, Error)]
#[error("HTTP client construction failed for {client}: {message}")]
pub struct HttpClientError {
    /// Logical client name (e.g. "places", "reddit").
    pub client: String,
    /// Underlying failure description.
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct HttpTimeouts {
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

static HTTP_TIMEOUTS: RwLock<HttpTimeouts> = RwLock::new(HttpTimeouts {
    connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
    read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
});

/// Configures timeouts used by clients built after this call.
///
/// Intended for CLI startup, before any client is constructed.
pub fn configure_http_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) {
    if let Ok(mut guard) = HTTP_TIMEOUTS.write() {
        *guard = HttpTimeouts {
            connect_timeout_secs,
            read_timeout_secs,
        };
    }
}

fn http_timeouts() -> HttpTimeouts {
    HTTP_TIMEOUTS.read().map(|guard| *guard).unwrap_or_default()
}

/// Builds an HTTP client using the shared project policy.
///
/// `client_name` is only used for error messages and logging.
///
/// # Errors
///
/// Returns [`HttpClientError`] when client construction fails.
pub fn build_http_client(
    client_name: &str,
    user_agent: impl Into<String>,
) -> Result<Client, HttpClientError> {
    let user_agent = user_agent.into();

    match try_build_client(&user_agent, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; the fallback only reads proxy env vars.
            warn!(
                client = client_name,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(&user_agent, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(HttpClientError {
                    client: client_name.to_string(),
                    message: "client construction panicked while reading proxy settings"
                        .to_string(),
                }),
                Err(BuildClientFailure::Build(error)) => Err(HttpClientError {
                    client: client_name.to_string(),
                    message: error.to_string(),
                }),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(HttpClientError {
            client: client_name.to_string(),
            message: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: &str,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String) -> ClientBuilder {
    let timeouts = http_timeouts();
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Replaces the value of sensitive query parameters (`key`, `api_key`, `token`)
/// so URLs can be logged or embedded in error messages.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_sensitive_param(&k) {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return parsed.to_string();
    }
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

fn is_sensitive_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "key" | "api_key" | "apikey" | "token" | "access_token"
    )
}

/// Truncates a response body for inclusion in an error message.
#[must_use]
pub(crate) fn body_excerpt(body: &str) -> String {
    const MAX_EXCERPT_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(MAX_EXCERPT_CHARS).collect();
    excerpt.push('…');
    excerpt
}
