//! Export sinks and the JSON interchange file shared by CLI stages.

pub mod csv;
pub mod html;
pub mod markdown;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::normalize::BusinessRecord;

pub use self::csv::write_csv;
pub use html::render_dashboard;
pub use markdown::render_report;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a lead file: {source}\n  Suggestion: pass the JSON written by `leadscout scan`, `collect`, `merge` or `enrich`")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV export failed: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Loads a JSON array of records.
///
/// # Errors
///
/// Returns [`ExportError::Read`] or [`ExportError::Json`].
pub fn read_records(path: &Path) -> Result<Vec<BusinessRecord>, ExportError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<BusinessRecord> =
        serde_json::from_str(&raw).map_err(|source| ExportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), count = records.len(), "records loaded");
    Ok(records)
}

/// Writes records as a pretty JSON array, creating parent directories.
///
/// # Errors
///
/// Returns [`ExportError::Write`] or [`ExportError::Json`].
pub fn write_records(path: &Path, records: &[BusinessRecord]) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(records).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_text(path, &json)
}

/// Writes text to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ExportError::Write`].
pub fn write_text(path: &Path, content: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "file written");
    Ok(())
}

/// Records ordered by opportunity score (unscored last), ties by name.
pub(crate) fn by_score(records: &[BusinessRecord]) -> Vec<&BusinessRecord> {
    let mut sorted: Vec<&BusinessRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.opportunity_score()
            .cmp(&a.opportunity_score())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    sorted
}

/// Lead count per category label, alphabetical.
pub(crate) fn category_counts(records: &[BusinessRecord]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.category.label()).or_insert(0) += 1;
    }
    counts
}

/// Aggregates shown at the top of the dashboard and report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Summary {
    pub total: usize,
    pub enriched: usize,
    pub average_score: Option<f64>,
    pub with_phone: usize,
    pub without_website: usize,
}

impl Summary {
    pub(crate) fn of(records: &[BusinessRecord]) -> Self {
        let scores: Vec<u8> = records
            .iter()
            .filter_map(BusinessRecord::opportunity_score)
            .collect();
        let average_score = (!scores.is_empty()).then(|| {
            let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
            f64::from(sum) / scores.len() as f64
        });
        Self {
            total: records.len(),
            enriched: scores.len(),
            average_score,
            with_phone: records.iter().filter(|r| r.phone.is_some()).count(),
            without_website: records.iter().filter(|r| r.website.is_none()).count(),
        }
    }
}
