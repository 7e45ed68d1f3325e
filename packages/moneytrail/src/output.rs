//! On-disk money trail document and its writer.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregates, Breakdowns, DateRange};
use crate::error::Result;
use crate::types::{ContributionRecord, Party, SourceStatus};

/// Version stamped into every document.
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tolerance for comparing stored and recomputed floating-point metrics.
const METRIC_EPSILON: f64 = 1e-6;

/// Run-level metadata, stored under `_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub total_amount: f64,
    pub average_amount: f64,
    pub biggest_donation: f64,
    pub total_contributions: usize,
    pub data_source: String,
    pub timestamp: DateTime<Utc>,
    pub data_status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_cycle: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_records: Option<u64>,
    #[serde(default)]
    pub parties_present: Vec<Party>,
    #[serde(default)]
    pub enhanced: bool,
    #[serde(default)]
    pub breakdowns: Breakdowns,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub pipeline_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl DatasetMetadata {
    /// Metadata whose derived fields come straight from `aggregates`.
    #[must_use]
    pub fn from_aggregates(
        aggregates: Aggregates,
        data_status: SourceStatus,
        data_source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            total_amount: aggregates.total_amount,
            average_amount: aggregates.average_amount,
            biggest_donation: aggregates.max_amount,
            total_contributions: aggregates.record_count,
            data_source: data_source.into(),
            timestamp,
            data_status,
            endpoint_used: None,
            election_cycle: None,
            available_records: None,
            enhanced: !aggregates.parties_present.is_empty(),
            parties_present: aggregates.parties_present,
            breakdowns: aggregates.breakdowns,
            date_range: aggregates.date_range,
            pipeline_version: PIPELINE_VERSION.to_string(),
            note: None,
            error: None,
            required_action: None,
            action_url: None,
        }
    }
}

/// The document the site build reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub results: Vec<ContributionRecord>,
    #[serde(rename = "_metadata")]
    pub metadata: DatasetMetadata,
}

impl OutputDocument {
    #[must_use]
    pub fn new(results: Vec<ContributionRecord>, metadata: DatasetMetadata) -> Self {
        Self { results, metadata }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.metadata.data_status == SourceStatus::Live
    }

    /// Check the derived metadata against the records.
    ///
    /// Returns a description of each mismatch; empty when consistent.
    #[must_use]
    pub fn consistency_problems(&self) -> Vec<String> {
        let expected = crate::aggregate::aggregate(&self.results);
        let m = &self.metadata;
        let mut problems = Vec::new();

        if m.total_contributions != self.results.len() {
            problems.push(format!(
                "total_contributions is {} but there are {} results",
                m.total_contributions,
                self.results.len()
            ));
        }

        let metrics = [
            ("total_amount", m.total_amount, expected.total_amount),
            ("average_amount", m.average_amount, expected.average_amount),
            ("biggest_donation", m.biggest_donation, expected.max_amount),
        ];
        for (name, stored, computed) in metrics {
            if (stored - computed).abs() > METRIC_EPSILON {
                problems.push(format!("{name} is {stored} but results sum to {computed}"));
            }
        }

        problems
    }
}

/// Serialize a document as pretty-printed JSON.
pub fn to_json(doc: &OutputDocument) -> Result<String> {
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    Ok(json)
}

/// Write a document to `path`, replacing any previous content.
///
/// Uses atomic write pattern: writes to a hidden temp file next to the target,
/// syncs to disk, then renames. Readers never see a half-written document.
///
/// # Arguments
/// * `doc` - The document to save
/// * `path` - Target file; missing parent directories are created
pub fn write_document(doc: &OutputDocument, path: &Path) -> Result<()> {
    let content = to_json(doc)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_file = temp_path(path)?;

    // Write to temp file first, then sync and rename for atomicity
    let written = write_synced(&temp_file, content.as_bytes())
        .and_then(|()| replace_file(&temp_file, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_file);
        return Err(e.into());
    }

    tracing::info!(
        path = %path.display(),
        records = doc.results.len(),
        status = %doc.metadata.data_status,
        "Wrote money trail document"
    );
    Ok(())
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn replace_file(from: &Path, to: &Path) -> std::io::Result<()> {
    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if to.exists() {
        fs::remove_file(to)?;
    }
    fs::rename(from, to)
}

/// Read a previously written document.
pub fn read_document(path: &Path) -> Result<OutputDocument> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// `dir/.name.tmp` for `dir/name`.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Output path has no file name: {}", path.display()),
        )
    })?;
    Ok(path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
}
