//! Per-source mappers into [`BusinessRecord`].

use crate::places::{PlaceDetails, PlaceResult};
use crate::query::SearchQuery;
use crate::query::presets::city_in_text;
use crate::sources::{EventbriteEvent, RaListing, RedditPost, WebsiteContacts};

use super::phone::{is_mobile, normalize_colombian_phone, whatsapp_url};
use super::{BusinessRecord, Category, Source, classify, clean_http_url, clean_text, fold_text};

const DESCRIPTION_MAX_CHARS: usize = 500;

/// Maps a Google text search hit (plus optional details) into a record.
///
/// City and neighborhood come from the query location; the neighborhood is
/// kept only when the formatted address actually mentions it, since Google
/// happily returns places outside the requested area.
#[must_use]
pub fn normalize_place(
    result: &PlaceResult,
    details: Option<&PlaceDetails>,
    query: Option<&SearchQuery>,
    category_hint: Option<Category>,
) -> BusinessRecord {
    let category = classify(&result.types, &result.name, category_hint);
    let mut record = BusinessRecord::new(Source::GooglePlaces, &result.name, category);
    record.external_id = Some(result.place_id.clone());
    record.raw_types.clone_from(&result.types);
    record.address = clean_text(result.formatted_address.as_deref(), 300);
    record.latitude = result.geometry.map(|g| g.location.lat);
    record.longitude = result.geometry.map(|g| g.location.lng);
    record.rating = result.rating;
    record.review_count = result.user_ratings_total;
    record.price_level = result.price_level;
    record.business_status.clone_from(&result.business_status);
    record.maps_url = Some(format!(
        "https://www.google.com/maps/place/?q=place_id:{}",
        result.place_id
    ));

    let folded_address = fold_text(record.address.as_deref().unwrap_or_default());
    match query {
        Some(query) => {
            record.city = Some(query.location.city.clone());
            record.neighborhood = query
                .location
                .neighborhood
                .as_ref()
                .filter(|n| folded_address.contains(&fold_text(n)))
                .cloned();
            record.add_discovered_via(query.text.clone());
        }
        None => {
            record.city = city_in_text(&folded_address).map(|c| c.name.to_string());
        }
    }

    if let Some(details) = details {
        apply_place_details(&mut record, details);
    }
    record
}

/// Fills contact fields from a details response without overwriting.
pub(crate) fn apply_place_details(record: &mut BusinessRecord, details: &PlaceDetails) {
    if record.phone.is_none()
        && let Some(raw) = details
            .international_phone_number
            .as_deref()
            .or(details.formatted_phone_number.as_deref())
    {
        record.set_phone(raw);
    }
    if record.website.is_none()
        && let Some(website) = details.website.as_deref()
    {
        record.set_website(website);
    }
    if let Some(url) = details.url.as_deref().and_then(clean_http_url) {
        record.maps_url = Some(url);
    }
    if record.opening_hours.is_empty()
        && let Some(hours) = details.opening_hours.as_ref()
    {
        record.opening_hours = hours
            .weekday_text
            .iter()
            .filter_map(|line| clean_text(Some(line), 80))
            .collect();
    }
    if record.description.is_none() {
        record.description = clean_text(
            details
                .editorial_summary
                .as_ref()
                .and_then(|s| s.overview.as_deref()),
            DESCRIPTION_MAX_CHARS,
        );
    }
}

/// Maps a Reddit post. The post is the lead signal, so its title names the record.
#[must_use]
pub fn normalize_reddit_post(post: &RedditPost) -> BusinessRecord {
    let name = clean_text(Some(&post.title), 200).unwrap_or_else(|| post.id.clone());
    let category = classify(&[], &post.title, None);
    let mut record = BusinessRecord::new(Source::Reddit, name, category);
    record.external_id = Some(post.id.clone());
    record.website = clean_http_url(&format!("https://www.reddit.com{}", post.permalink));
    record.description = clean_text(Some(&post.selftext), DESCRIPTION_MAX_CHARS);
    record.city = city_in_text(&post.subreddit)
        .or_else(|| city_in_text(&format!("{} {}", post.title, post.selftext)))
        .map(|c| c.name.to_string());
    record.add_tag(format!("r/{}", post.subreddit));
    record.add_discovered_via(format!("reddit:r/{}", post.subreddit));
    record
}

/// Maps an event's venue. Events without a named venue yield `None`.
#[must_use]
pub fn normalize_eventbrite_event(event: &EventbriteEvent) -> Option<BusinessRecord> {
    let venue = event.venue.as_ref()?;
    let name = clean_text(venue.name.as_deref(), 200)?;
    let category = classify(&[], &name, Some(Category::Events));
    let mut record = BusinessRecord::new(Source::Eventbrite, name, category);
    record.external_id = Some(venue.id.clone());

    if let Some(address) = venue.address.as_ref() {
        record.address = clean_text(
            address
                .localized_address_display
                .as_deref()
                .or(address.address_1.as_deref()),
            300,
        );
        record.city = clean_text(address.city.as_deref(), 100);
        record.latitude = address.latitude.as_deref().and_then(|v| v.parse().ok());
        record.longitude = address.longitude.as_deref().and_then(|v| v.parse().ok());
    }

    if let Some(title) = clean_text(event.name.text.as_deref(), 120) {
        record.add_tag(format!("event:{title}"));
    }
    if let Some(url) = event.url.as_deref() {
        record.add_discovered_via(url.to_string());
    }
    Some(record)
}

/// Maps a Resident Advisor listing's venue. Listings without a venue yield `None`.
#[must_use]
pub fn normalize_ra_event(listing: &RaListing, city: Option<&str>) -> Option<BusinessRecord> {
    let venue = listing.event.venue.as_ref()?;
    let name = clean_text(Some(&venue.name), 200)?;
    let category = classify(&[], &name, Some(Category::Nightlife));
    let mut record = BusinessRecord::new(Source::ResidentAdvisor, name, category);
    record.external_id = Some(venue.id.clone());
    record.address = clean_text(venue.address.as_deref(), 300);
    record.city = city
        .map(str::to_string)
        .or_else(|| city_in_text(record.address.as_deref().unwrap_or_default()).map(|c| c.name.to_string()));
    record.website = venue
        .content_url
        .as_deref()
        .and_then(|path| clean_http_url(&format!("https://ra.co{path}")));

    if let Some(title) = clean_text(Some(&listing.event.title), 120) {
        record.add_tag(format!("event:{title}"));
    }
    if let Some(path) = listing.event.content_url.as_deref() {
        record.add_discovered_via(format!("https://ra.co{path}"));
    }
    Some(record)
}

/// Builds a record from a scraped website.
///
/// The name is the first segment of the page title (`"Café Velvet | ..."`),
/// falling back to the host. The host (without `www.`) is the external id.
#[must_use]
pub fn normalize_website(contacts: &WebsiteContacts) -> BusinessRecord {
    let source_url = if contacts.final_url.is_empty() {
        contacts.url.as_str()
    } else {
        contacts.final_url.as_str()
    };
    let host = url::Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()));

    let name = contacts
        .title
        .as_deref()
        .map(title_business_name)
        .and_then(|segment| clean_text(Some(segment), 200))
        .or_else(|| host.clone())
        .unwrap_or_else(|| source_url.to_string());

    let category = classify(&[], &name, None);
    let mut record = BusinessRecord::new(Source::Website, name, category);
    record.external_id = host;
    record.set_website(source_url);
    apply_contacts(&mut record, contacts);
    record.add_discovered_via(contacts.url.clone());
    record
}

/// Leading segment of a page title such as `"Casa-Blanca Hostel | Cartagena"`.
///
/// Bare hyphens belong to names; only a spaced `" - "` separates segments.
fn title_business_name(title: &str) -> &str {
    let head = title
        .split(['|', '\u{2013}', '\u{2014}', '\u{00b7}'])
        .next()
        .unwrap_or(title);
    head.split(" - ").next().unwrap_or(head)
}

/// Fills missing contact fields on `record` from scraped website contacts.
///
/// Existing values always win. Mobile numbers are preferred over landlines
/// so a WhatsApp link can be derived.
pub fn apply_contacts(record: &mut BusinessRecord, contacts: &WebsiteContacts) {
    if record.email.is_none() {
        record.email = contacts.emails.first().cloned();
    }

    if record.phone.is_none() {
        let preferred = contacts
            .phones
            .iter()
            .find(|p| is_mobile(p))
            .or_else(|| contacts.phones.first());
        if let Some(phone) = preferred {
            record.set_phone(phone);
        }
    }

    if record.whatsapp_url.is_none() {
        record.whatsapp_url = contacts
            .whatsapp_links
            .iter()
            .find_map(|link| whatsapp_number(link))
            .and_then(|e164| whatsapp_url(&e164, None));
    }

    if record.instagram.is_none() {
        record.instagram.clone_from(&contacts.instagram);
    }
    if record.description.is_none() {
        record.description.clone_from(&contacts.description);
    }
    if record.website.is_none() && !contacts.final_url.is_empty() {
        record.set_website(&contacts.final_url);
    }
    if !contacts.is_empty() {
        record.add_tag("website_contacts");
    }
}

/// Pulls the number out of `wa.me/57300...` or `api.whatsapp.com/send?phone=57300...`.
fn whatsapp_number(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let raw = parsed
        .query_pairs()
        .find(|(k, _)| k == "phone")
        .map(|(_, v)| v.into_owned())
        .or_else(|| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.find(|s| !s.is_empty()).map(str::to_string))
        })?;
    normalize_colombian_phone(&raw)
}
