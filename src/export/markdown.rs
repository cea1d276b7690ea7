//! Markdown opportunity report.

use std::fmt::Write as _;

use crate::normalize::BusinessRecord;

use super::{Summary, by_score, category_counts};

/// Renders the headline, category table and top `top_n` opportunities.
#[must_use]
pub fn render_report(records: &[BusinessRecord], top_n: usize) -> String {
    let summary = Summary::of(records);
    let mut out = String::from("# Lead Opportunity Report\n\n");
    let _ = writeln!(
        out,
        "**{}** leads, **{}** enriched, average score **{}**. {} have a phone, {} have no website.\n",
        summary.total,
        summary.enriched,
        summary
            .average_score
            .map_or_else(|| "n/a".to_string(), |avg| format!("{avg:.1}")),
        summary.with_phone,
        summary.without_website,
    );

    out.push_str("## By category\n\n| Category | Leads |\n|---|---|\n");
    for (label, count) in category_counts(records) {
        let _ = writeln!(out, "| {label} | {count} |");
    }

    let top: Vec<&BusinessRecord> = by_score(records)
        .into_iter()
        .filter(|r| r.enrichment.is_some())
        .take(top_n)
        .collect();
    let _ = writeln!(out, "\n## Top {} opportunities\n", top.len());
    if top.is_empty() {
        out.push_str("*No enriched leads yet. Run `leadscout enrich` first.*\n");
        return out;
    }

    for (rank, record) in top.iter().enumerate() {
        let Some(enrichment) = record.enrichment.as_ref() else {
            continue;
        };
        let _ = writeln!(
            out,
            "### {}. {} (score {})\n",
            rank + 1,
            record.name,
            enrichment.opportunity_score
        );
        let location = [record.neighborhood.as_deref(), record.city.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "- **Category**: {}{}",
            record.category.label(),
            if location.is_empty() {
                String::new()
            } else {
                format!(" in {location}")
            }
        );
        if let Some(phone) = record.phone.as_deref() {
            let _ = writeln!(out, "- **Phone**: {phone}");
        }
        let _ = writeln!(
            out,
            "- **Website**: {}",
            record.website.as_deref().unwrap_or("none")
        );
        let _ = writeln!(out, "- **Digital presence**: {}\n", enrichment.digital_presence);
        let _ = writeln!(out, "{}\n", enrichment.summary);
        if !enrichment.pain_points.is_empty() {
            out.push_str("Pain points:\n");
            for point in &enrichment.pain_points {
                let _ = writeln!(out, "- {point}");
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_records;

    #[test]
    fn test_report_sections() {
        let report = render_report(&sample_records(), 10);
        assert!(report.starts_with("# Lead Opportunity Report"));
        assert!(report.contains("**3** leads, **2** enriched, average score **64.0**"));
        assert!(report.contains("| Cafés | 1 |"));
        assert!(report.contains("## Top 2 opportunities"));
        assert!(report.contains("### 1. Bar <Rojo> (score 88)"));
        assert!(report.contains("- **Category**: Hotels & Hostels in Cartagena"));
        assert!(report.contains("Pain points:\n- "));
    }

    #[test]
    fn test_top_n_limits() {
        let report = render_report(&sample_records(), 1);
        assert!(report.contains("## Top 1 opportunities"));
        assert!(!report.contains("### 2."));
    }

    #[test]
    fn test_no_enriched_leads() {
        let report = render_report(&[], 5);
        assert!(report.contains("No enriched leads yet"));
    }
}
