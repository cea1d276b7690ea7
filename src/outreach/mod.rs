//! Outreach artifacts: cold emails, WhatsApp openers and digital audits.
//!
//! A chat model writes the copy when available; otherwise, or when the model
//! call fails, deterministic templates are used so a run always produces
//! every artifact.

mod templates;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatClient, ChatRequest};
use crate::normalize::phone::whatsapp_url;
use crate::normalize::{BusinessRecord, fold_text};
use crate::prompt::outreach_prompt;

/// WhatsApp messages longer than this are cut at a word boundary.
pub const WHATSAPP_MAX_CHARS: usize = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutreachKind {
    Email,
    WhatsApp,
    Audit,
}

impl OutreachKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::WhatsApp => "whatsapp",
            Self::Audit => "audit",
        }
    }
}

impl fmt::Display for OutreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutreachKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "whatsapp" | "wa" => Ok(Self::WhatsApp),
            "audit" => Ok(Self::Audit),
            other => Err(format!(
                "unknown outreach kind '{other}' (expected email, whatsapp or audit)"
            )),
        }
    }
}

/// Who is writing and what they offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    pub sender_name: String,
    pub agency: String,
    pub tone: String,
    /// `es` or `en`.
    pub language: String,
    pub offer: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            sender_name: "Camila".to_string(),
            agency: "Agencia Paisa Digital".to_string(),
            tone: "friendly, concise and consultative".to_string(),
            language: "es".to_string(),
            offer: "Te preparo una auditoría digital gratuita de 15 minutos con tres mejoras concretas."
                .to_string(),
        }
    }
}

impl Persona {
    #[must_use]
    pub fn is_spanish(&self) -> bool {
        !self.language.trim().eq_ignore_ascii_case("en")
    }
}

/// One generated piece of outreach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachArtifact {
    pub kind: OutreachKind,
    /// Dedup key of the source record.
    pub business_key: String,
    pub business_name: String,
    /// Single-line subject (emails and audits).
    pub subject: Option<String>,
    pub body: String,
    /// Click-to-chat link with the body prefilled; mobile numbers only.
    pub whatsapp_link: Option<String>,
    /// Model id or `template`.
    pub generated_by: String,
}

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Produces artifacts for records.
pub struct OutreachGenerator {
    persona: Persona,
    chat: Option<Arc<dyn ChatClient>>,
}

impl OutreachGenerator {
    #[must_use]
    pub fn new(persona: Persona, chat: Option<Arc<dyn ChatClient>>) -> Self {
        Self { persona, chat }
    }

    #[must_use]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Generates one artifact. Model failures fall back to the template.
    pub async fn generate(&self, record: &BusinessRecord, kind: OutreachKind) -> OutreachArtifact {
        let generated = match self.chat.as_ref() {
            Some(chat) => {
                let request = ChatRequest::new(outreach_prompt(record, kind, &self.persona))
                    .with_temperature(0.7);
                match chat.complete(request).await {
                    Ok(reply) => Some((split_reply(kind, &reply), chat.model().to_string())),
                    Err(error) => {
                        warn!(name = %record.name, kind = %kind, error = %error, "model outreach failed; using template");
                        None
                    }
                }
            }
            None => None,
        };

        let ((subject, body), generated_by) =
            generated.unwrap_or_else(|| (self.template(record, kind), "template".to_string()));
        let subject = match kind {
            OutreachKind::WhatsApp => None,
            _ => subject
                .map(|s| single_line(&s))
                .filter(|s| !s.is_empty())
                .or_else(|| self.template(record, kind).0),
        };
        let body = match kind {
            OutreachKind::WhatsApp => truncate_words(body.trim(), WHATSAPP_MAX_CHARS),
            _ => body.trim().to_string(),
        };
        let whatsapp_link = match kind {
            OutreachKind::WhatsApp => record
                .phone
                .as_deref()
                .and_then(|phone| whatsapp_url(phone, Some(&body))),
            _ => None,
        };

        debug!(name = %record.name, kind = %kind, generated_by = %generated_by, "artifact generated");
        OutreachArtifact {
            kind,
            business_key: record.dedup_key(),
            business_name: record.name.clone(),
            subject,
            body,
            whatsapp_link,
            generated_by,
        }
    }

    fn template(&self, record: &BusinessRecord, kind: OutreachKind) -> (Option<String>, String) {
        match kind {
            OutreachKind::Email => {
                let (subject, body) = templates::email(record, &self.persona);
                (Some(subject), body)
            }
            OutreachKind::WhatsApp => (None, templates::whatsapp(record, &self.persona)),
            OutreachKind::Audit => (
                Some(format!("Digital audit: {}", record.name)),
                templates::audit(record, &self.persona),
            ),
        }
    }
}

/// Splits a model email into subject and body; other kinds pass through.
fn split_reply(kind: OutreachKind, reply: &str) -> (Option<String>, String) {
    if kind != OutreachKind::Email {
        return (None, reply.to_string());
    }
    let trimmed = reply.trim_start();
    let mut lines = trimmed.splitn(2, '\n');
    let first = lines.next().unwrap_or_default();
    let stripped = first
        .trim()
        .trim_start_matches(['*', '#'])
        .trim_start();
    let subject = ["Subject:", "Asunto:", "subject:", "asunto:"]
        .iter()
        .find_map(|prefix| stripped.strip_prefix(prefix))
        .map(|s| s.trim().trim_end_matches('*').trim().to_string());
    match subject {
        Some(subject) => (Some(subject), lines.next().unwrap_or_default().to_string()),
        None => (None, reply.to_string()),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts at the last whitespace before `max_chars`, appending `…`.
fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(position) if position > 0 => cut[..position].trim_end().to_string(),
        _ => cut,
    };
    format!("{cut}…")
}

/// Records scoring at least `min_score`, best first (ties by name).
#[must_use]
pub fn select_targets(
    records: &[BusinessRecord],
    min_score: u8,
    limit: Option<usize>,
) -> Vec<&BusinessRecord> {
    let mut targets: Vec<&BusinessRecord> = records
        .iter()
        .filter(|r| r.opportunity_score().is_some_and(|score| score >= min_score))
        .collect();
    targets.sort_by(|a, b| {
        b.opportunity_score()
            .cmp(&a.opportunity_score())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    if let Some(limit) = limit {
        targets.truncate(limit);
    }
    targets
}

/// `Café Velvet & Co.` → `cafe-velvet-co`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let slug: String = fold_text(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(60)
        .collect();
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "business".to_string()
    } else {
        slug
    }
}

fn render_markdown(artifact: &OutreachArtifact) -> String {
    let mut out = format!("# {} ({})\n\n", artifact.business_name, artifact.kind);
    if let Some(subject) = artifact.subject.as_deref() {
        out.push_str(&format!("**Subject:** {subject}\n\n"));
    }
    out.push_str(&artifact.body);
    out.push('\n');
    if let Some(link) = artifact.whatsapp_link.as_deref() {
        out.push_str(&format!("\n[Open in WhatsApp]({link})\n"));
    }
    out
}

/// Writes one `{slug}-{kind}.md` file per artifact into `dir`.
///
/// Names that collide within the batch get a numeric suffix.
///
/// # Errors
///
/// Returns [`OutreachError::Io`] if the directory or a file cannot be written.
pub fn write_artifacts(
    dir: &Path,
    artifacts: &[OutreachArtifact],
) -> Result<Vec<PathBuf>, OutreachError> {
    std::fs::create_dir_all(dir).map_err(|source| OutreachError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let base = format!("{}-{}", slugify(&artifact.business_name), artifact.kind);
        let mut stem = base.clone();
        let mut counter = 2;
        while !used.insert(stem.clone()) {
            stem = format!("{base}-{counter}");
            counter += 1;
        }
        let path = dir.join(format!("{stem}.md"));
        std::fs::write(&path, render_markdown(artifact)).map_err(|source| OutreachError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enrich::HeuristicEnricher;
    use crate::llm::LlmError;
    use crate::normalize::{Category, Source};
    use async_trait::async_trait;

    struct Reply(Result<&'static str, ()>);

    #[async_trait]
    impl ChatClient for Reply {
        async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
            self.0
                .map(ToString::to_string)
                .map_err(|()| LlmError::EmptyCompletion)
        }

        fn model(&self) -> &str {
            "reply"
        }
    }

    fn record(name: &str, score: Option<u8>) -> BusinessRecord {
        let mut record = BusinessRecord::new(Source::GooglePlaces, name, Category::Bar);
        record.external_id = Some(format!("id-{name}"));
        record.city = Some("Medellín".to_string());
        record.set_phone("3001234567");
        if let Some(score) = score {
            let mut enrichment = HeuristicEnricher::assess(&record);
            enrichment.opportunity_score = score;
            record.enrichment = Some(enrichment);
        }
        record
    }

    #[tokio::test]
    async fn test_template_email_offline() {
        let generator = OutreachGenerator::new(Persona::default(), None);
        let artifact = generator.generate(&record("Bar Central", None), OutreachKind::Email).await;
        assert_eq!(artifact.subject.as_deref(), Some("Una idea rápida para Bar Central"));
        assert!(artifact.body.contains("Camila"));
        assert_eq!(artifact.generated_by, "template");
        assert!(artifact.whatsapp_link.is_none());
        assert_eq!(artifact.business_key, "google_places:id-Bar Central");
    }

    #[tokio::test]
    async fn test_model_email_subject_is_parsed() {
        let chat: Arc<dyn ChatClient> =
            Arc::new(Reply(Ok("**Subject:** More bookings\nfor you\n\nHola, cuerpo del correo.")));
        let generator = OutreachGenerator::new(Persona::default(), Some(chat));
        let artifact = generator.generate(&record("Bar", None), OutreachKind::Email).await;
        assert_eq!(artifact.subject.as_deref(), Some("More bookings"));
        assert!(artifact.body.starts_with("for you"));
        assert_eq!(artifact.generated_by, "reply");
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_template() {
        let chat: Arc<dyn ChatClient> = Arc::new(Reply(Err(())));
        let generator = OutreachGenerator::new(Persona::default(), Some(chat));
        let artifact = generator.generate(&record("Bar", None), OutreachKind::WhatsApp).await;
        assert_eq!(artifact.generated_by, "template");
        assert!(artifact.subject.is_none());
        assert!(artifact
            .whatsapp_link
            .as_deref()
            .unwrap()
            .starts_with("https://wa.me/573001234567?text="));
    }

    #[tokio::test]
    async fn test_whatsapp_body_is_capped() {
        let long: &'static str = Box::leak("palabra ".repeat(200).into_boxed_str());
        let chat: Arc<dyn ChatClient> = Arc::new(Reply(Ok(long)));
        let generator = OutreachGenerator::new(Persona::default(), Some(chat));
        let artifact = generator.generate(&record("Bar", None), OutreachKind::WhatsApp).await;
        assert!(artifact.body.chars().count() <= WHATSAPP_MAX_CHARS);
        assert!(artifact.body.ends_with('…'));
    }

    #[tokio::test]
    async fn test_landline_gets_no_whatsapp_link() {
        let mut landline = record("Hotel", None);
        landline.phone = Some("+576044441234".to_string());
        landline.whatsapp_url = None;
        let generator = OutreachGenerator::new(Persona::default(), None);
        let artifact = generator.generate(&landline, OutreachKind::WhatsApp).await;
        assert!(artifact.whatsapp_link.is_none());
    }

    #[test]
    fn test_select_targets_orders_by_score_then_name() {
        let records = vec![
            record("beta", Some(80)),
            record("Alpha", Some(80)),
            record("Gamma", Some(40)),
            record("Delta", None),
            record("Omega", Some(95)),
        ];
        let names: Vec<&str> = select_targets(&records, 50, None)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Omega", "Alpha", "beta"]);
        assert_eq!(select_targets(&records, 50, Some(1)).len(), 1);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Café Velvet & Co."), "cafe-velvet-co");
        assert_eq!(slugify("¡!"), "business");
    }

    #[test]
    fn test_write_artifacts_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = OutreachArtifact {
            kind: OutreachKind::Email,
            business_key: "k".to_string(),
            business_name: "Bar Central".to_string(),
            subject: Some("Hola".to_string()),
            body: "Cuerpo".to_string(),
            whatsapp_link: None,
            generated_by: "template".to_string(),
        };
        let paths = write_artifacts(dir.path(), &[artifact.clone(), artifact]).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["bar-central-email.md", "bar-central-email-2.md"]);
        let content = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(content.contains("**Subject:** Hola"));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("WhatsApp".parse::<OutreachKind>().unwrap(), OutreachKind::WhatsApp);
        assert!("fax".parse::<OutreachKind>().is_err());
    }
}
