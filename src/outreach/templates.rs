//! Deterministic outreach copy used offline and when the model fails.

use std::fmt::Write as _;

use crate::normalize::BusinessRecord;

use super::Persona;

fn first_gap(record: &BusinessRecord, spanish: bool) -> String {
    if let Some(point) = record
        .enrichment
        .as_ref()
        .and_then(|e| e.pain_points.first())
    {
        return point.clone();
    }
    let gap = match (record.website.is_none(), record.instagram.is_none(), spanish) {
        (true, _, true) => "no encontré una página web",
        (true, _, false) => "I couldn't find a website",
        (false, true, true) => "no encontré su Instagram",
        (false, true, false) => "I couldn't find your Instagram",
        (false, false, true) => "hay espacio para convertir más visitas en reservas",
        (false, false, false) => "there is room to turn more visits into bookings",
    };
    gap.to_string()
}

fn social_proof(record: &BusinessRecord, spanish: bool) -> Option<String> {
    let (rating, count) = (record.rating?, record.review_count?);
    Some(if spanish {
        format!("{rating:.1} estrellas con {count} reseñas en Google")
    } else {
        format!("{rating:.1} stars across {count} Google reviews")
    })
}

/// Returns `(subject, body)`.
pub(crate) fn email(record: &BusinessRecord, persona: &Persona) -> (String, String) {
    let spanish = persona.is_spanish();
    let gap = first_gap(record, spanish);
    let name = &record.name;
    let proof = social_proof(record, spanish);

    if spanish {
        let subject = format!("Una idea rápida para {name}");
        let mut body = format!("Hola equipo de {name},\n\n");
        match proof {
            Some(proof) => {
                let _ = write!(body, "Vi que tienen {proof}, ¡felicitaciones! ");
            }
            None => body.push_str("Estuve revisando su presencia en línea. "),
        }
        let _ = write!(
            body,
            "Noté que {gap}. En {agency} ayudamos a negocios como el suyo a convertir esa reputación en más clientes.\n\n\
             {offer}\n\n¿Les parece si les envío los detalles esta semana?\n\n\
             Saludos,\n{sender}\n{agency}",
            agency = persona.agency,
            offer = persona.offer,
            sender = persona.sender_name,
        );
        (subject, body)
    } else {
        let subject = format!("A quick idea for {name}");
        let mut body = format!("Hi {name} team,\n\n");
        match proof {
            Some(proof) => {
                let _ = write!(body, "I saw you have {proof}, congratulations! ");
            }
            None => body.push_str("I was looking at your online presence. "),
        }
        let _ = write!(
            body,
            "I noticed {gap}. At {agency} we help businesses like yours turn that reputation into more customers.\n\n\
             {offer}\n\nWould it be okay if I sent you the details this week?\n\n\
             Best,\n{sender}\n{agency}",
            agency = persona.agency,
            offer = persona.offer,
            sender = persona.sender_name,
        );
        (subject, body)
    }
}

pub(crate) fn whatsapp(record: &BusinessRecord, persona: &Persona) -> String {
    let gap = first_gap(record, persona.is_spanish());
    if persona.is_spanish() {
        format!(
            "¡Hola {name}! Soy {sender} de {agency}. Noté que {gap}. {offer} ¿Te interesa que te cuente más?",
            name = record.name,
            sender = persona.sender_name,
            agency = persona.agency,
            offer = persona.offer,
        )
    } else {
        format!(
            "Hi {name}! I'm {sender} from {agency}. I noticed {gap}. {offer} Would you like to hear more?",
            name = record.name,
            sender = persona.sender_name,
            agency = persona.agency,
            offer = persona.offer,
        )
    }
}

pub(crate) fn audit(record: &BusinessRecord, persona: &Persona) -> String {
    let mut out = String::new();
    let yes_no = |present: bool| if present { "✅" } else { "❌" };
    let _ = writeln!(out, "## Snapshot\n");
    let _ = writeln!(out, "| Channel | Status |\n|---|---|");
    let _ = writeln!(out, "| Website | {} |", yes_no(record.website.is_some()));
    let _ = writeln!(out, "| Phone | {} |", yes_no(record.phone.is_some()));
    let _ = writeln!(out, "| WhatsApp | {} |", yes_no(record.whatsapp_url.is_some()));
    let _ = writeln!(out, "| Instagram | {} |", yes_no(record.instagram.is_some()));
    let _ = writeln!(out, "| Email | {} |", yes_no(record.email.is_some()));
    if let Some(proof) = social_proof(record, false) {
        let _ = writeln!(out, "\nGoogle: {proof}.");
    }

    let _ = writeln!(out, "\n## Gaps\n");
    match record.enrichment.as_ref().filter(|e| !e.pain_points.is_empty()) {
        Some(enrichment) => {
            for point in &enrichment.pain_points {
                let _ = writeln!(out, "- {point}");
            }
        }
        None => {
            let _ = writeln!(out, "- {}", first_gap(record, false));
        }
    }

    let _ = writeln!(out, "\n## Quick wins\n");
    let services = record
        .enrichment
        .as_ref()
        .map(|e| e.recommended_services.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| vec!["Claim and complete the Google Business Profile".to_string()]);
    for service in services {
        let _ = writeln!(out, "- {service}");
    }

    let _ = writeln!(out, "\n## Next step\n");
    let _ = write!(
        out,
        "{offer} Contact {sender} at {agency}.",
        offer = persona.offer,
        sender = persona.sender_name,
        agency = persona.agency,
    );
    out
}
