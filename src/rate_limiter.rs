//! Per-host request pacing for third-party APIs and scraped websites.
//!
//! Every outbound call goes through [`RateLimiter::acquire`] first. The first
//! request to a host proceeds immediately; later requests to the same host
//! wait until `min_delay` (plus optional random jitter) has elapsed since the
//! previous one. Different hosts never wait on each other.
//!
//! When a server answers 429 with `Retry-After`, [`RateLimiter::record_rate_limit`]
//! pushes that host's next allowed request time forward.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use leadscout_core::rate_limiter::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_secs(2));
//! limiter.acquire("https://maps.googleapis.com/maps/api/place/textsearch/json").await;
//! limiter.acquire("https://www.reddit.com/r/Medellin/search.json").await; // different host, no wait
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Warn once a single host has cost this much cumulative waiting.
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(120);

/// Upper bound for server-requested Retry-After waits.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(600);

/// Per-host request pacing shared across tasks (wrap in `Arc`).
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    max_jitter: Duration,
    disabled: bool,
    /// State is behind `Arc` so the map shard lock is released before awaiting.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// Earliest instant the next request may start. `None` until the first request.
    next_allowed: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            next_allowed: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}

impl RateLimiter {
    /// Creates a limiter enforcing `min_delay` between requests to one host.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = min_delay.as_millis()))]
    pub fn new(min_delay: Duration) -> Self {
        debug!("creating rate limiter");
        Self {
            min_delay,
            max_jitter: Duration::ZERO,
            disabled: false,
            hosts: DashMap::new(),
        }
    }

    /// Creates a limiter that never waits (`--delay-ms 0`).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Adds up to `max_jitter` of random extra delay to each wait.
    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until a request to `url`'s host is allowed, then reserves the slot.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.disabled {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", host.as_str());

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut next_allowed = state.next_allowed.lock().await;

        if let Some(allowed_at) = *next_allowed {
            let now = Instant::now();
            if allowed_at > now {
                let delay = allowed_at - now;
                let cumulative = state.add_cumulative_delay(delay);
                debug!(
                    host = %host,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "pacing request"
                );
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "long cumulative wait on host; consider fewer queries"
                    );
                }
                tokio::time::sleep(delay).await;
            }
        } else {
            debug!(host = %host, "first request to host");
        }

        *next_allowed = Some(Instant::now() + self.min_delay + self.jitter());
    }

    /// Pushes the host's next allowed request out by a server-mandated delay.
    #[instrument(skip(self), fields(host))]
    pub async fn record_rate_limit(&self, url: &str, delay: Duration) {
        let host = extract_host(url);
        tracing::Span::current().record("host", host.as_str());

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut next_allowed = state.next_allowed.lock().await;
        let candidate = Instant::now() + delay;
        *next_allowed = Some(match *next_allowed {
            Some(existing) if existing > candidate => existing,
            _ => candidate,
        });
        debug!(host = %host, delay_ms = delay.as_millis(), "recorded server rate limit");
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_possible_truncation)]
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Extracts the lowercase host from a URL, `"unknown"` when unparseable.
///
/// ```
/// use leadscout_core::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://Maps.GoogleAPIs.com/x"), "maps.googleapis.com");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a `Retry-After` header (delta-seconds or HTTP-date).
///
/// Values above ten minutes are capped; dates in the past yield zero.
///
/// ```
/// use std::time::Duration;
/// use leadscout_core::rate_limiter::parse_retry_after;
///
/// assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(duration.min(MAX_RETRY_AFTER));
    }

    let datetime = httpdate::parse_http_date(header_value).ok()?;
    match datetime.duration_since(std::time::SystemTime::now()) {
        Ok(duration) => Some(duration.min(MAX_RETRY_AFTER)),
        Err(_) => Some(Duration::ZERO),
    }
}
