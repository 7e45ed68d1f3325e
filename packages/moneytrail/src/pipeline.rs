//! The sourcing pipeline: probe, normalize, aggregate, write.
//!
//! A run moves through
//! `START -> PROBE_ENDPOINTS -> {NORMALIZE_AND_AGGREGATE | FALLBACK} -> WRITE -> {DONE | FAILED}`.
//! Only `WRITE` can fail; every other problem routes to `FALLBACK`.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::aggregate::aggregate;
use crate::config::{FetchConfig, API_KEY_ENV};
use crate::endpoint::{check_api_key, default_candidates, probe_endpoints, KeyStatus, Selection};
use crate::error::Result;
use crate::fallback::generate_fallback;
use crate::http::{Fetcher, HttpFetcher, RetryPolicy};
use crate::normalize::Normalizer;
use crate::output::{write_document, DatasetMetadata, OutputDocument};
use crate::party::PartyLookup;
use crate::types::SourceStatus;

/// Pipeline state. Each variant carries what the next step needs.
enum Stage {
    Start,
    ProbeEndpoints { api_key: String },
    NormalizeAndAggregate(Selection),
    Fallback(String),
    Write(Box<OutputDocument>),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "START",
            Self::ProbeEndpoints { .. } => "PROBE_ENDPOINTS",
            Self::NormalizeAndAggregate(_) => "NORMALIZE_AND_AGGREGATE",
            Self::Fallback(_) => "FALLBACK",
            Self::Write(_) => "WRITE",
        })
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub status: SourceStatus,
    pub record_count: usize,
    pub total_amount: f64,
    pub max_amount: f64,
    pub endpoint_used: Option<String>,
    pub fallback_reason: Option<String>,
    pub output_path: PathBuf,
}

impl RunReport {
    fn new(doc: &OutputDocument, output_path: PathBuf) -> Self {
        Self {
            status: doc.metadata.data_status,
            record_count: doc.results.len(),
            total_amount: doc.metadata.total_amount,
            max_amount: doc.metadata.biggest_donation,
            endpoint_used: doc.metadata.endpoint_used.clone(),
            fallback_reason: doc.metadata.error.clone(),
            output_path,
        }
    }
}

/// One configured pipeline.
pub struct Pipeline<F: Fetcher> {
    config: FetchConfig,
    fetcher: F,
    normalizer: Normalizer,
}

impl Pipeline<HttpFetcher> {
    /// Build a pipeline that talks to the real API.
    ///
    /// Loads the party table named in the config, or the built-in one.
    pub fn from_config(config: FetchConfig) -> Result<Self> {
        let lookup = match &config.party_table {
            Some(path) => PartyLookup::from_json_file(path)?,
            None => PartyLookup::builtin(),
        };
        let policy = RetryPolicy::new(config.max_attempts, config.retry_base_delay);
        let fetcher = HttpFetcher::new(config.timeout, policy)?;
        Ok(Self::new(config, fetcher, Normalizer::for_today(lookup)))
    }
}

impl<F: Fetcher> Pipeline<F> {
    #[must_use]
    pub fn new(config: FetchConfig, fetcher: F, normalizer: Normalizer) -> Self {
        Self {
            config,
            fetcher,
            normalizer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run to completion and write the output document.
    ///
    /// # Returns
    /// A report of what was written, or the write error.
    pub fn run(&self) -> Result<RunReport> {
        let timestamp = Utc::now();
        let mut stage = Stage::Start;

        loop {
            tracing::debug!(stage = %stage, "Pipeline stage");

            stage = match stage {
                Stage::Start => match &self.config.api_key {
                    Some(api_key) => Stage::ProbeEndpoints {
                        api_key: api_key.clone(),
                    },
                    None => Stage::Fallback(format!("{API_KEY_ENV} is not set")),
                },
                Stage::ProbeEndpoints { api_key } => self.probe(&api_key),
                Stage::NormalizeAndAggregate(selection) => {
                    let doc = self.build_live_document(selection, timestamp);
                    if doc.results.is_empty() {
                        Stage::Fallback("Selected endpoint yielded no usable records".to_string())
                    } else {
                        Stage::Write(Box::new(doc))
                    }
                }
                Stage::Fallback(reason) => {
                    Stage::Write(Box::new(generate_fallback(&reason, timestamp)))
                }
                Stage::Write(doc) => {
                    let path = &self.config.output_path;
                    if let Err(e) = write_document(&doc, path) {
                        tracing::error!(path = %path.display(), error = %e, "Failed to write output");
                        return Err(e);
                    }
                    let report = RunReport::new(&doc, path.clone());
                    tracing::info!(
                        status = %report.status,
                        records = report.record_count,
                        total_amount = report.total_amount,
                        "Pipeline complete"
                    );
                    return Ok(report);
                }
            };
        }
    }

    fn probe(&self, api_key: &str) -> Stage {
        let base_url = &self.config.base_url;

        if self.config.verify_key {
            match check_api_key(&self.fetcher, base_url, api_key) {
                KeyStatus::Valid => tracing::info!("API key accepted"),
                KeyStatus::Rejected(status) => {
                    return Stage::Fallback(format!("API key rejected (HTTP {status})"));
                }
                KeyStatus::Unverified(reason) => {
                    tracing::warn!(reason = %reason, "Could not verify API key, probing anyway");
                }
            }
        }

        let candidates = default_candidates(self.config.cycle, self.config.per_page);
        let report = probe_endpoints(
            &self.fetcher,
            base_url,
            api_key,
            &candidates,
            self.config.probe_pause,
        );

        match report.selection {
            Some(selection) => Stage::NormalizeAndAggregate(selection),
            None => Stage::Fallback(format!(
                "No endpoint returned contribution records ({})",
                report.summary()
            )),
        }
    }

    /// Normalize a selection and attach live metadata.
    pub fn build_live_document(
        &self,
        selection: Selection,
        timestamp: DateTime<Utc>,
    ) -> OutputDocument {
        let records = self.normalizer.normalize(&selection.results);
        let endpoint = selection.endpoint;

        let mut metadata = DatasetMetadata::from_aggregates(
            aggregate(&records),
            SourceStatus::Live,
            format!("FEC API - Schedule A ({})", endpoint.name),
            timestamp,
        );
        metadata.endpoint_used = Some(endpoint.name);
        metadata.election_cycle = endpoint.cycle;
        metadata.available_records = selection.available;

        OutputDocument::new(records, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MoneyTrailError;
    use crate::fallback::fallback_records;
    use crate::http::RawResponse;
    use crate::output::read_document;
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Returns canned responses by URL substring, recording the call order.
    struct CannedFetcher {
        routes: Vec<(&'static str, u16, String)>,
        calls: RefCell<Vec<String>>,
    }

    impl CannedFetcher {
        fn new(routes: Vec<(&'static str, u16, String)>) -> Self {
            Self {
                routes,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetcher for CannedFetcher {
        fn fetch(&self, url: &str) -> Result<RawResponse> {
            self.calls.borrow_mut().push(url.to_string());
            self.routes
                .iter()
                .find(|(needle, _, _)| url.contains(needle))
                .map(|(_, status, body)| RawResponse::new(*status, body.clone()))
                .ok_or_else(|| MoneyTrailError::RetriesExhausted {
                    attempts: 1,
                    message: "connection refused".to_string(),
                })
        }
    }

    fn config(dir: &std::path::Path) -> FetchConfig {
        FetchConfig::new()
            .with_api_key(Some("test-key".to_string()))
            .with_base_url("http://api.test/v1")
            .with_output_path(dir.join("data").join("moneyTrail.json"))
            .with_cycle(2024)
            .with_probe_pause(Duration::ZERO)
    }

    fn normalizer() -> Normalizer {
        Normalizer::for_year(PartyLookup::builtin(), 2024)
    }

    fn three_records() -> String {
        serde_json::json!({
            "results": [
                {"contributor_name": "MELLON, TIMOTHY", "contribution_receipt_amount": 5000000, "contributor_state": "WY"},
                {"contributor_name": "DOE, JANE", "contribution_receipt_amount": 250, "contributor_employer": "ACME"},
                {"contributor_name": "ROE, RICHARD", "contribution_receipt_amount": "1000.50"}
            ],
            "pagination": {"count": 3}
        })
        .to_string()
    }

    #[test]
    fn test_missing_key_falls_back_without_network() {
        let dir = tempdir().unwrap();
        let config = config(dir.path()).with_api_key(None);
        let pipeline = Pipeline::new(config, CannedFetcher::new(vec![]), normalizer());

        let report = pipeline.run().unwrap();

        assert_eq!(report.status, SourceStatus::EducationalFallback);
        assert!(pipeline.fetcher().calls.borrow().is_empty());
        assert!(report.fallback_reason.unwrap().contains("FEC_API_KEY"));
    }

    #[test]
    fn test_rejected_key_falls_back_without_probing() {
        let dir = tempdir().unwrap();
        let fetcher = CannedFetcher::new(vec![("candidates", 403, String::new())]);
        let pipeline = Pipeline::new(config(dir.path()), fetcher, normalizer());

        let report = pipeline.run().unwrap();

        assert_eq!(report.status, SourceStatus::EducationalFallback);
        assert_eq!(pipeline.fetcher().calls.borrow().len(), 1);
    }

    #[test]
    fn test_live_run_writes_normalized_records() {
        let dir = tempdir().unwrap();
        let fetcher = CannedFetcher::new(vec![
            ("candidates", 200, "{}".to_string()),
            ("min_amount", 200, r#"{"results": []}"#.to_string()),
            ("two_year_transaction_period=2024", 200, three_records()),
        ]);
        let pipeline = Pipeline::new(config(dir.path()), fetcher, normalizer());

        let report = pipeline.run().unwrap();

        assert_eq!(report.status, SourceStatus::Live);
        assert_eq!(report.record_count, 3);
        assert_eq!(report.endpoint_used.as_deref(), Some("2024 cycle"));

        let doc = read_document(&report.output_path).unwrap();
        assert!(doc.consistency_problems().is_empty());
        assert_eq!(doc.metadata.total_amount, 5_001_250.5);
        assert_eq!(doc.metadata.election_cycle, Some(2024));
        assert_eq!(doc.metadata.available_records, Some(3));
        assert_eq!(doc.results[1].employer, "ACME");
        assert_eq!(doc.results[2].employer, "Not Disclosed");

        let calls = pipeline.fetcher().calls.borrow();
        assert!(calls[0].contains("candidates"));
        assert!(calls[1].contains("min_amount"));
        assert!(calls[2].contains("two_year_transaction_period=2024"));
    }

    #[test]
    fn test_all_server_errors_fall_back() {
        let dir = tempdir().unwrap();
        let fetcher = CannedFetcher::new(vec![("api.test", 500, "boom".to_string())]);
        let pipeline = Pipeline::new(config(dir.path()), fetcher, normalizer());

        let report = pipeline.run().unwrap();
        let doc = read_document(&report.output_path).unwrap();

        assert_eq!(doc.metadata.data_status, SourceStatus::EducationalFallback);
        assert_eq!(doc.results, fallback_records());
        // key check + four candidates
        assert_eq!(pipeline.fetcher().calls.borrow().len(), 5);
    }

    #[test]
    fn test_network_failure_falls_back() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::new(config(dir.path()), CannedFetcher::new(vec![]), normalizer());

        let report = pipeline.run().unwrap();
        assert_eq!(report.status, SourceStatus::EducationalFallback);
    }

    #[test]
    fn test_write_failure_is_the_only_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let config = config(dir.path())
            .with_api_key(None)
            .with_output_path(blocker.join("moneyTrail.json"));
        let pipeline = Pipeline::new(config, CannedFetcher::new(vec![]), normalizer());

        let err = pipeline.run().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_runs_are_idempotent() {
        let dir = tempdir().unwrap();
        let routes = || {
            vec![
                ("candidates", 200, "{}".to_string()),
                ("schedule_a", 200, three_records()),
            ]
        };

        let first = Pipeline::new(config(dir.path()), CannedFetcher::new(routes()), normalizer());
        let path = first.run().unwrap().output_path;
        let first_doc = read_document(&path).unwrap();

        let second = Pipeline::new(config(dir.path()), CannedFetcher::new(routes()), normalizer());
        second.run().unwrap();
        let second_doc = read_document(&path).unwrap();

        assert_eq!(
            serde_json::to_string(&first_doc.results).unwrap(),
            serde_json::to_string(&second_doc.results).unwrap()
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Start.to_string(), "START");
        assert_eq!(Stage::Fallback(String::new()).to_string(), "FALLBACK");
    }
}
