//! Prompt builders for enrichment and outreach.

use std::fmt::Write as _;

use crate::llm::ChatMessage;
use crate::normalize::BusinessRecord;
use crate::outreach::{OutreachKind, Persona};

const ENRICHMENT_SYSTEM: &str = "You are a senior growth strategist at a digital marketing agency \
in Colombia. You assess local businesses as sales prospects and answer only with JSON.";

/// Renders the facts known about a business as a bullet list.
///
/// Missing fields are stated explicitly; the model reasons better about an
/// absent website when told so than when the line is simply omitted.
fn business_facts(record: &BusinessRecord) -> String {
    let mut facts = String::new();
    let missing = "not found";
    let _ = writeln!(facts, "- Name: {}", record.name);
    let _ = writeln!(facts, "- Category: {}", record.category.label());
    let location = match (record.neighborhood.as_deref(), record.city.as_deref()) {
        (Some(n), Some(c)) => format!("{n}, {c}"),
        (None, Some(c)) => c.to_string(),
        _ => record.address.clone().unwrap_or_else(|| missing.to_string()),
    };
    let _ = writeln!(facts, "- Location: {location}");
    let _ = writeln!(
        facts,
        "- Website: {}",
        record.website.as_deref().unwrap_or(missing)
    );
    let _ = writeln!(
        facts,
        "- Phone: {}",
        record.phone.as_deref().unwrap_or(missing)
    );
    let _ = writeln!(
        facts,
        "- Instagram: {}",
        record.instagram.as_deref().map_or_else(|| missing.to_string(), |h| format!("@{h}"))
    );
    match (record.rating, record.review_count) {
        (Some(rating), Some(count)) => {
            let _ = writeln!(facts, "- Google rating: {rating:.1} from {count} reviews");
        }
        (Some(rating), None) => {
            let _ = writeln!(facts, "- Google rating: {rating:.1}");
        }
        _ => {
            let _ = writeln!(facts, "- Google rating: none");
        }
    }
    if let Some(level) = record.price_level {
        let _ = writeln!(facts, "- Price level: {level}/4");
    }
    if !record.opening_hours.is_empty() {
        let _ = writeln!(facts, "- Opening hours: {}", record.opening_hours.join("; "));
    }
    if let Some(description) = record.description.as_deref() {
        let _ = writeln!(facts, "- Description: {description}");
    }
    if !record.tags.is_empty() {
        let _ = writeln!(facts, "- Signals: {}", record.tags.join(", "));
    }
    facts
}

/// Messages asking for a JSON assessment of one business.
#[must_use]
pub fn enrichment_prompt(record: &BusinessRecord) -> Vec<ChatMessage> {
    let user = format!(
        r#"Assess this business as a prospect for our agency (web design, SEO, social media, paid ads, WhatsApp automation, reputation management).

Business:
{facts}
Output ONLY a JSON object with these exact fields:
{{
  "summary": "2-3 sentences on what the business is and where it stands online",
  "opportunity_score": 1-100 integer, higher means more likely to buy and more to gain,
  "pain_points": ["specific gap", "..."],
  "recommended_services": ["service", "..."],
  "digital_presence": "none" | "weak" | "moderate" | "strong"
}}

Scoring guide: no website or a weak one with strong reviews scores high; a polished brand with everything covered scores low; closed or tiny businesses score low."#,
        facts = business_facts(record)
    );
    vec![ChatMessage::system(ENRICHMENT_SYSTEM), ChatMessage::user(user)]
}

/// Messages asking for one outreach artifact in the persona's voice.
#[must_use]
pub fn outreach_prompt(
    record: &BusinessRecord,
    kind: OutreachKind,
    persona: &Persona,
) -> Vec<ChatMessage> {
    let language = if persona.is_spanish() {
        "Colombian Spanish (tú, warm and direct)"
    } else {
        "English"
    };
    let system = format!(
        "You are {name} from {agency}. You write {tone} sales outreach in {language}. \
         Never invent facts about the business.",
        name = persona.sender_name,
        agency = persona.agency,
        tone = persona.tone,
    );

    let mut insight = String::new();
    if let Some(enrichment) = record.enrichment.as_ref() {
        let _ = writeln!(insight, "Assessment: {}", enrichment.summary);
        if !enrichment.pain_points.is_empty() {
            let _ = writeln!(insight, "Pain points: {}", enrichment.pain_points.join("; "));
        }
        if !enrichment.recommended_services.is_empty() {
            let _ = writeln!(
                insight,
                "Services to pitch: {}",
                enrichment.recommended_services.join(", ")
            );
        }
    }

    let instructions = match kind {
        OutreachKind::Email => {
            "Write a cold email. First line: `Subject: <subject>`. Then a blank line and a body of at most 150 words that names one concrete gap, offers the free item below and ends with a low-friction question."
        }
        OutreachKind::WhatsApp => {
            "Write a WhatsApp opener under 600 characters: greeting with the business name, one observed gap, the offer, a yes/no question. No links, no markdown."
        }
        OutreachKind::Audit => {
            "Write a short digital audit in markdown with sections `## Snapshot`, `## Gaps`, `## Quick wins` and `## Next step`. Be specific to the facts given."
        }
    };

    let user = format!(
        "{instructions}\n\nOffer: {offer}\n\nBusiness:\n{facts}{insight}",
        offer = persona.offer,
        facts = business_facts(record),
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Category, Source};

    fn record() -> BusinessRecord {
        let mut record = BusinessRecord::new(Source::GooglePlaces, "Salón Malportado", Category::Bar);
        record.city = Some("Medellín".to_string());
        record.neighborhood = Some("Provenza".to_string());
        record.rating = Some(4.6);
        record.review_count = Some(812);
        record
    }

    #[test]
    fn test_enrichment_prompt_states_missing_fields() {
        let messages = enrichment_prompt(&record());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        let user = &messages[1].content;
        assert!(user.contains("- Name: Salón Malportado"));
        assert!(user.contains("- Location: Provenza, Medellín"));
        assert!(user.contains("- Website: not found"));
        assert!(user.contains("4.6 from 812 reviews"));
        assert!(user.contains("\"opportunity_score\""));
        assert!(!user.contains("Opening hours"));
    }

    #[test]
    fn test_enrichment_prompt_lists_opening_hours() {
        let mut record = record();
        record.opening_hours = vec!["viernes: 18:00–3:00".to_string(), "sábado: 18:00–3:00".to_string()];
        let messages = enrichment_prompt(&record);
        assert!(messages[1]
            .content
            .contains("- Opening hours: viernes: 18:00–3:00; sábado: 18:00–3:00"));
    }

    #[test]
    fn test_outreach_prompt_uses_persona_language() {
        let mut persona = Persona::default();
        persona.language = "en".to_string();
        let messages = outreach_prompt(&record(), OutreachKind::WhatsApp, &persona);
        assert!(messages[0].content.contains("English"));
        assert!(messages[0].content.contains(&persona.agency));
        assert!(messages[1].content.contains("WhatsApp opener"));
        assert!(messages[1].content.contains(&persona.offer));
    }
}
