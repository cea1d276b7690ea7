//! Self-contained HTML dashboard.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::normalize::BusinessRecord;

use super::{Summary, by_score, category_counts};

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;background:#f6f7f9;color:#1d2330}\
h1{margin-bottom:1rem}.cards{display:flex;gap:1rem;flex-wrap:wrap;margin-bottom:2rem}\
.card{background:#fff;border-radius:8px;padding:1rem 1.5rem;box-shadow:0 1px 3px rgba(0,0,0,.1)}\
.card .value{font-size:1.8rem;font-weight:700}.card .label{color:#667}\
table{border-collapse:collapse;width:100%;background:#fff}\
th,td{padding:.5rem;border-bottom:1px solid #e3e5ea;text-align:left;vertical-align:top}\
th{background:#1d2330;color:#fff}.score{font-weight:700}.high{color:#0a7d32}.mid{color:#b36b00}.low{color:#888}";

fn score_class(score: u8) -> &'static str {
    match score {
        70.. => "high",
        40..70 => "mid",
        _ => "low",
    }
}

fn link(href: &str, text: &str) -> String {
    format!(
        "<a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a>",
        encode_double_quoted_attribute(href),
        encode_text(text)
    )
}

fn card(out: &mut String, value: &str, label: &str) {
    let _ = write!(
        out,
        "<div class=\"card\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>",
        encode_text(value),
        encode_text(label)
    );
}

/// Renders the full page; every interpolated value is escaped.
#[must_use]
pub fn render_dashboard(records: &[BusinessRecord], title: &str) -> String {
    let summary = Summary::of(records);
    let mut out = String::with_capacity(4096 + records.len() * 512);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n",
        title = encode_text(title)
    );

    out.push_str("<section class=\"cards\">");
    card(&mut out, &summary.total.to_string(), "Total leads");
    card(&mut out, &summary.enriched.to_string(), "Enriched");
    card(
        &mut out,
        &summary
            .average_score
            .map_or_else(|| "n/a".to_string(), |avg| format!("{avg:.1}")),
        "Average score",
    );
    card(&mut out, &summary.with_phone.to_string(), "With phone");
    card(&mut out, &summary.without_website.to_string(), "Without website");
    out.push_str("</section>\n");

    out.push_str("<h2>By category</h2>\n<table class=\"categories\"><tr><th>Category</th><th>Leads</th></tr>");
    for (label, count) in category_counts(records) {
        let _ = write!(out, "<tr><td>{}</td><td>{count}</td></tr>", encode_text(label));
    }
    out.push_str("</table>\n");

    out.push_str(
        "<h2>Leads</h2>\n<table class=\"leads\"><tr><th>Score</th><th>Name</th><th>Category</th>\
         <th>Location</th><th>Rating</th><th>Contact</th><th>Summary</th></tr>\n",
    );
    for record in by_score(records) {
        let score = record.opportunity_score().map_or_else(
            || "<td class=\"score low\">-</td>".to_string(),
            |s| format!("<td class=\"score {}\">{s}</td>", score_class(s)),
        );
        let name = match record.maps_url.as_deref() {
            Some(url) => link(url, &record.name),
            None => encode_text(&record.name).into_owned(),
        };
        let location = [record.neighborhood.as_deref(), record.city.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let rating = match (record.rating, record.review_count) {
            (Some(rating), Some(count)) => format!("{rating:.1} ({count})"),
            (Some(rating), None) => format!("{rating:.1}"),
            _ => String::new(),
        };
        let mut contact = Vec::new();
        if let Some(phone) = record.phone.as_deref() {
            contact.push(match record.whatsapp_url.as_deref() {
                Some(wa) => link(wa, phone),
                None => encode_text(phone).into_owned(),
            });
        }
        if let Some(website) = record.website.as_deref() {
            contact.push(link(website, "website"));
        }
        if let Some(instagram) = record.instagram.as_deref() {
            contact.push(link(
                &format!("https://instagram.com/{instagram}"),
                &format!("@{instagram}"),
            ));
        }
        if let Some(email) = record.email.as_deref() {
            contact.push(link(&format!("mailto:{email}"), email));
        }
        let summary = record
            .enrichment
            .as_ref()
            .map(|e| e.summary.as_str())
            .unwrap_or_default();

        let _ = writeln!(
            out,
            "<tr>{score}<td>{name}</td><td>{category}</td><td>{location}</td><td>{rating}</td>\
             <td>{contact}</td><td>{summary}</td></tr>",
            category = encode_text(record.category.label()),
            location = encode_text(&location),
            contact = contact.join("<br>"),
            summary = encode_text(summary),
        );
    }
    out.push_str("</table>\n</body>\n</html>\n");
    out
}
