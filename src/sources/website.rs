//! Venue website contact scraper.
//!
//! Fetches one page and pulls out whatever contact channels it exposes:
//! `mailto:`/`tel:` links, WhatsApp click-to-chat links, Instagram and
//! Facebook profiles, plus emails and Colombian phone numbers found in the
//! visible text.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http_client::build_http_client;
use crate::normalize::clean_http_url;
use crate::normalize::phone::normalize_colombian_phone;
use crate::rate_limiter::RateLimiter;
use crate::user_agent::BROWSER_USER_AGENT;

use super::{SourceError, send_paced};

/// Pages larger than this are truncated before parsing.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,24}\b").ok()
});

static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:\+?57[\s.-]?)?(?:3\d{2}|60\d)[\s.-]?\d{3}[\s.-]?\d{4}").ok()
});

/// `nombre [at] dominio [dot] com` and the Spanish `arroba` spelling.
static OBFUSCATED_AT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[\[(]\s*(?:at|arroba)\s*[\])]\s*|\s+arroba\s+").ok());
static OBFUSCATED_DOT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[\[(]\s*(?:dot|punto)\s*[\])]\s*").ok());

/// Asset suffixes that look like emails in minified markup (`logo@2x.png`).
const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Instagram paths that are not profiles.
const INSTAGRAM_RESERVED: &[&str] = &["p", "reel", "reels", "explore", "accounts", "stories", "tv"];

/// Contact channels found on a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteContacts {
    /// URL as requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub emails: Vec<String>,
    /// E.164 numbers.
    pub phones: Vec<String>,
    pub whatsapp_links: Vec<String>,
    /// Instagram handle without `@`.
    pub instagram: Option<String>,
    pub facebook: Option<String>,
}

impl WebsiteContacts {
    /// True when no contact channel was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
            && self.phones.is_empty()
            && self.whatsapp_links.is_empty()
            && self.instagram.is_none()
            && self.facebook.is_none()
    }
}

/// Fetches pages with a browser User-Agent; many venue sites block bots.
#[derive(Debug)]
pub struct WebsiteScraper {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
}

impl WebsiteScraper {
    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if the HTTP client cannot be built.
    pub fn new(rate_limiter: Arc<RateLimiter>) -> Result<Self, SourceError> {
        let client = build_http_client("website", BROWSER_USER_AGENT)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Scrapes one page.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidInput`] for non-http URLs and transport
    /// errors for unreachable pages.
    #[instrument(skip(self))]
    pub async fn scrape(&self, url: &str) -> Result<WebsiteContacts, SourceError> {
        let Some(url) = clean_http_url(url) else {
            return Err(SourceError::InvalidInput(format!("'{url}' is not an http(s) URL")));
        };

        let mut response = send_paced(&self.rate_limiter, &url, || {
            self.client
                .get(&url)
                .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
                .header(reqwest::header::ACCEPT_LANGUAGE, "es-CO,es;q=0.9,en;q=0.8")
        })
        .await?;
        let final_url = response.url().to_string();
        if let Some(length) = response.content_length()
            && length > MAX_BODY_BYTES as u64
        {
            debug!(length, "page larger than cap; reading the head only");
        }
        let body = read_capped(&mut response, MAX_BODY_BYTES)
            .await
            .map_err(|e| SourceError::Network {
                url: url.clone(),
                source: e.without_url(),
            })?;
        let html = String::from_utf8_lossy(&body);

        let mut contacts = parse_contacts(&html)?;
        contacts.url = url;
        contacts.final_url = final_url;
        debug!(
            emails = contacts.emails.len(),
            phones = contacts.phones.len(),
            "website scraped"
        );
        Ok(contacts)
    }
}

/// Reads at most `cap` bytes of the body, dropping the connection after that.
async fn read_capped(response: &mut reqwest::Response, cap: usize) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = cap - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Decode {
        url: String::new(),
        message: format!("invalid selector '{css}': {e:?}"),
    })
}

/// Extracts contacts from an HTML document. `url`/`final_url` are left empty.
///
/// # Errors
///
/// Only fails if a built-in selector is invalid.
pub(crate) fn parse_contacts(html: &str) -> Result<WebsiteContacts, SourceError> {
    let document = Html::parse_document(html);
    let title_sel = selector("title")?;
    let description_sel =
        selector(r#"meta[name="description"], meta[property="og:description"]"#)?;
    let link_sel = selector("a[href]")?;
    let body_sel = selector("body")?;

    let mut contacts = WebsiteContacts {
        title: document
            .select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|t| crate::normalize::clean_text(Some(&t), 200)),
        description: document
            .select(&description_sel)
            .find_map(|el| el.value().attr("content"))
            .and_then(|d| crate::normalize::clean_text(Some(d), 500)),
        ..WebsiteContacts::default()
    };

    let mut emails = BTreeSet::new();
    let mut phones = BTreeSet::new();
    let mut whatsapp = BTreeSet::new();

    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };
        let lower = href.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("mailto:") {
            let address = rest.split('?').next().unwrap_or_default();
            let address = urlencoding::decode(address).map_or_else(|_| address.to_string(), |a| a.into_owned());
            if is_plausible_email(&address) {
                emails.insert(address);
            }
        } else if let Some(rest) = lower.strip_prefix("tel:") {
            if let Some(phone) = normalize_colombian_phone(rest) {
                phones.insert(phone);
            }
        } else if lower.contains("wa.me/") || lower.contains("api.whatsapp.com/") {
            if let Some(url) = clean_http_url(href) {
                whatsapp.insert(url);
            }
        } else if contacts.instagram.is_none() && lower.contains("instagram.com/") {
            contacts.instagram = instagram_handle(href);
        } else if contacts.facebook.is_none()
            && (lower.contains("facebook.com/") || lower.contains("fb.com/"))
        {
            contacts.facebook = clean_http_url(href);
        }
    }

    let text: String = document
        .select(&body_sel)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let text = deobfuscate(&text);

    if let Some(re) = EMAIL_RE.as_ref() {
        for m in re.find_iter(&text) {
            let email = m.as_str().to_ascii_lowercase();
            if is_plausible_email(&email) {
                emails.insert(email);
            }
        }
    }
    if let Some(re) = PHONE_RE.as_ref() {
        for m in re.find_iter(&text) {
            if let Some(phone) = normalize_colombian_phone(m.as_str()) {
                phones.insert(phone);
            }
        }
    }

    contacts.emails = emails.into_iter().collect();
    contacts.phones = phones.into_iter().collect();
    contacts.whatsapp_links = whatsapp.into_iter().collect();
    Ok(contacts)
}

fn deobfuscate(text: &str) -> String {
    let step = match OBFUSCATED_AT_RE.as_ref() {
        Some(re) => re.replace_all(text, "@").into_owned(),
        None => text.to_string(),
    };
    match OBFUSCATED_DOT_RE.as_ref() {
        Some(re) => re.replace_all(&step, ".").into_owned(),
        None => step,
    }
}

fn is_plausible_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !IMAGE_SUFFIXES.iter().any(|suffix| candidate.ends_with(suffix))
}

/// `https://instagram.com/envy.rooftop/?hl=es` → `envy.rooftop`.
fn instagram_handle(href: &str) -> Option<String> {
    let parsed = url::Url::parse(href).ok()?;
    let handle = parsed.path_segments()?.find(|s| !s.is_empty())?;
    let handle = handle.trim_start_matches('@');
    let valid = !handle.is_empty()
        && handle.len() <= 30
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        && !INSTAGRAM_RESERVED.contains(&handle.to_ascii_lowercase().as_str());
    valid.then(|| handle.to_string())
}
