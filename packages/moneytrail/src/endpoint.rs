//! Endpoint candidates and the probe that picks the first one with data.
//!
//! Not every filter combination of the Schedule A API has data at any given
//! time, so candidates are tried in priority order until one returns a
//! non-empty `results` array. Running out of candidates is a signal for the
//! caller to fall back, not an error.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{MoneyTrailError, Result};
use crate::http::Fetcher;

/// Path of itemized receipts, relative to the API base.
pub const SCHEDULE_A_PATH: &str = "schedules/schedule_a/";

/// Path used to check that a key is accepted at all.
pub const CANDIDATES_PATH: &str = "candidates/";

/// Default ordering: newest receipts first.
pub const SORT_BY_DATE: &str = "-contribution_receipt_date";

/// Largest receipts first.
pub const SORT_BY_AMOUNT: &str = "-contribution_receipt_amount";

/// Threshold for the "large donations" candidate.
pub const LARGE_DONATION_MIN: u32 = 100_000;

/// One parameterization of the Schedule A query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub name: String,
    pub cycle: Option<u16>,
    pub per_page: u32,
    pub sort: String,
    pub filters: Vec<(String, String)>,
}

impl EndpointSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, per_page: u32) -> Self {
        Self {
            name: name.into(),
            cycle: None,
            per_page,
            sort: SORT_BY_DATE.to_string(),
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cycle(mut self, cycle: u16) -> Self {
        self.cycle = Some(cycle);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Full request URL including the key.
    ///
    /// # Examples
    /// ```
    /// use mega_moneytrail::endpoint::EndpointSpec;
    ///
    /// let spec = EndpointSpec::new("2024 cycle", 100).with_cycle(2024);
    /// assert_eq!(
    ///     spec.url("https://api.open.fec.gov/v1", "KEY").unwrap(),
    ///     "https://api.open.fec.gov/v1/schedules/schedule_a/?api_key=KEY&per_page=100\
    ///      &sort=-contribution_receipt_date&two_year_transaction_period=2024"
    /// );
    /// ```
    pub fn url(&self, base_url: &str, api_key: &str) -> Result<String> {
        let mut url = api_url(base_url, SCHEDULE_A_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("api_key", api_key)
                .append_pair("per_page", &self.per_page.to_string())
                .append_pair("sort", &self.sort);
            if let Some(cycle) = self.cycle {
                query.append_pair("two_year_transaction_period", &cycle.to_string());
            }
            for (key, value) in &self.filters {
                query.append_pair(key, value);
            }
        }
        Ok(url.into())
    }
}

/// Candidates in priority order for a given cycle.
///
/// Large individual donations in the cycle, then the whole cycle, then the
/// previous cycle, then no cycle filter at all.
#[must_use]
pub fn default_candidates(cycle: u16, per_page: u32) -> Vec<EndpointSpec> {
    let previous = cycle.saturating_sub(2);
    vec![
        EndpointSpec::new(format!("{cycle} cycle, large individual donations"), per_page)
            .with_cycle(cycle)
            .with_sort(SORT_BY_AMOUNT)
            .with_filter("contributor_type", "individual")
            .with_filter("min_amount", LARGE_DONATION_MIN.to_string()),
        EndpointSpec::new(format!("{cycle} cycle"), per_page).with_cycle(cycle),
        EndpointSpec::new(format!("{previous} cycle"), per_page).with_cycle(previous),
        EndpointSpec::new("no cycle filter", per_page),
    ]
}

/// Join a path onto the API base URL, tolerating a missing trailing slash.
pub fn api_url(base_url: &str, path: &str) -> Result<Url> {
    let invalid = |reason: String| MoneyTrailError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base".to_string()));
    }
    base.join(path).map_err(|e| invalid(e.to_string()))
}

/// The candidate that produced data, with its raw records.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub endpoint: EndpointSpec,
    pub results: Vec<Value>,
    /// Total matching records reported by the API's pagination block.
    pub available: Option<u64>,
}

/// What happened when one candidate was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found(usize),
    Empty,
    Status(u16),
    Malformed(String),
    Failed(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(n) => write!(f, "{n} records"),
            Self::Empty => f.write_str("no records"),
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Malformed(reason) => write!(f, "unreadable response ({reason})"),
            Self::Failed(reason) => write!(f, "request failed ({reason})"),
        }
    }
}

/// One probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub endpoint: String,
    pub outcome: ProbeOutcome,
}

/// Everything the probe did, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub attempts: Vec<ProbeAttempt>,
    pub selection: Option<Selection>,
}

impl ProbeReport {
    /// One-line account of the attempts, e.g. for the fallback reason.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no endpoint candidates configured".to_string();
        }
        self.attempts
            .iter()
            .map(|a| format!("{}: {}", a.endpoint, a.outcome))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Deserialize)]
struct ScheduleAPage {
    #[serde(default)]
    results: Option<Vec<Value>>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    count: Option<u64>,
}

/// Try each candidate in order, stopping at the first one with records.
///
/// Never fails; every problem is recorded in the report and the next
/// candidate is tried. `pause` is slept between candidates.
pub fn probe_endpoints<F: Fetcher + ?Sized>(
    fetcher: &F,
    base_url: &str,
    api_key: &str,
    candidates: &[EndpointSpec],
    pause: Duration,
) -> ProbeReport {
    let mut report = ProbeReport::default();

    for (index, candidate) in candidates.iter().enumerate() {
        if index > 0 && !pause.is_zero() {
            thread::sleep(pause);
        }

        tracing::info!(endpoint = %candidate.name, "Trying endpoint");
        let (outcome, selection) = probe_one(fetcher, base_url, api_key, candidate);

        match &outcome {
            ProbeOutcome::Found(n) => {
                tracing::info!(endpoint = %candidate.name, records = n, "Endpoint returned data")
            }
            other => {
                tracing::warn!(endpoint = %candidate.name, outcome = %other, "Endpoint skipped")
            }
        }

        report.attempts.push(ProbeAttempt {
            endpoint: candidate.name.clone(),
            outcome,
        });

        if selection.is_some() {
            report.selection = selection;
            break;
        }
    }

    report
}

/// Try each candidate in order; `None` when every one came up empty.
pub fn select_first_non_empty<F: Fetcher + ?Sized>(
    fetcher: &F,
    base_url: &str,
    api_key: &str,
    candidates: &[EndpointSpec],
    pause: Duration,
) -> Option<Selection> {
    probe_endpoints(fetcher, base_url, api_key, candidates, pause).selection
}

fn probe_one<F: Fetcher + ?Sized>(
    fetcher: &F,
    base_url: &str,
    api_key: &str,
    candidate: &EndpointSpec,
) -> (ProbeOutcome, Option<Selection>) {
    let url = match candidate.url(base_url, api_key) {
        Ok(url) => url,
        Err(e) => return (ProbeOutcome::Failed(e.to_string()), None),
    };

    let response = match fetcher.fetch(&url) {
        Ok(response) => response,
        Err(e) => return (ProbeOutcome::Failed(e.to_string()), None),
    };

    if !response.is_success() {
        tracing::debug!(
            status = response.status,
            body = %truncate(&response.body, 200),
            "Endpoint returned an error status"
        );
        return (ProbeOutcome::Status(response.status), None);
    }

    let page: ScheduleAPage = match serde_json::from_str(&response.body) {
        Ok(page) => page,
        Err(e) => return (ProbeOutcome::Malformed(e.to_string()), None),
    };

    match page.results {
        Some(results) if !results.is_empty() => {
            let selection = Selection {
                endpoint: candidate.clone(),
                available: page.pagination.and_then(|p| p.count),
                results,
            };
            (ProbeOutcome::Found(selection.results.len()), Some(selection))
        }
        _ => (ProbeOutcome::Empty, None),
    }
}

/// Result of the API key preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// The API answered a trivial query with 2xx.
    Valid,
    /// The API refused the key (401/403). Probing Schedule A is pointless.
    Rejected(u16),
    /// Could not tell; probing proceeds anyway.
    Unverified(String),
}

/// Check that the API accepts a key with a one-record candidates query.
pub fn check_api_key<F: Fetcher + ?Sized>(fetcher: &F, base_url: &str, api_key: &str) -> KeyStatus {
    let mut url = match api_url(base_url, CANDIDATES_PATH) {
        Ok(url) => url,
        Err(e) => return KeyStatus::Unverified(e.to_string()),
    };
    url.query_pairs_mut()
        .append_pair("api_key", api_key)
        .append_pair("per_page", "1");

    match fetcher.fetch(url.as_str()) {
        Ok(response) if response.is_success() => KeyStatus::Valid,
        Ok(response) if response.status == 401 || response.status == 403 => {
            KeyStatus::Rejected(response.status)
        }
        Ok(response) => KeyStatus::Unverified(format!("HTTP {}", response.status)),
        Err(e) => KeyStatus::Unverified(e.to_string()),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RawResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Answers by matching a substring of the URL, recording every request.
    struct ScriptedFetcher {
        routes: Vec<(&'static str, Result<RawResponse>)>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(routes: Vec<(&'static str, Result<RawResponse>)>) -> Self {
            Self {
                routes,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, url: &str) -> Result<RawResponse> {
            self.calls.borrow_mut().push(url.to_string());
            for (needle, response) in &self.routes {
                if url.contains(needle) {
                    return match response {
                        Ok(r) => Ok(r.clone()),
                        Err(e) => Err(MoneyTrailError::RetriesExhausted {
                            attempts: 3,
                            message: e.to_string(),
                        }),
                    };
                }
            }
            Ok(RawResponse::new(404, "not found"))
        }
    }

    fn page(count: usize) -> RawResponse {
        let results: Vec<Value> = (0..count)
            .map(|i| serde_json::json!({"contributor_name": format!("DONOR {i}"), "contribution_receipt_amount": 100}))
            .collect();
        RawResponse::new(
            200,
            serde_json::json!({"results": results, "pagination": {"count": 1234}}).to_string(),
        )
    }

    fn params(url: &str) -> HashMap<String, String> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    #[test]
    fn test_default_candidates_order() {
        let candidates = default_candidates(2024, 100);
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "2024 cycle, large individual donations",
                "2024 cycle",
                "2022 cycle",
                "no cycle filter"
            ]
        );
        assert_eq!(candidates[0].sort, SORT_BY_AMOUNT);
        assert!(candidates[3].cycle.is_none());
    }

    #[test]
    fn test_url_parameters() {
        let spec = &default_candidates(2024, 50)[0];
        let url = spec.url("https://api.open.fec.gov/v1/", "abc").unwrap();
        let query = params(&url);

        assert!(url.starts_with("https://api.open.fec.gov/v1/schedules/schedule_a/?"));
        assert_eq!(query["api_key"], "abc");
        assert_eq!(query["per_page"], "50");
        assert_eq!(query["sort"], "-contribution_receipt_amount");
        assert_eq!(query["two_year_transaction_period"], "2024");
        assert_eq!(query["contributor_type"], "individual");
        assert_eq!(query["min_amount"], "100000");
    }

    #[test]
    fn test_url_without_cycle() {
        let spec = EndpointSpec::new("no cycle filter", 100);
        let query = params(&spec.url("http://localhost:9999/v1", "k").unwrap());
        assert!(!query.contains_key("two_year_transaction_period"));
    }

    #[test]
    fn test_api_url_rejects_garbage() {
        assert!(matches!(
            api_url("not a url", SCHEDULE_A_PATH),
            Err(MoneyTrailError::InvalidBaseUrl { .. })
        ));
        assert!(api_url("mailto:someone@example.com", SCHEDULE_A_PATH).is_err());
    }

    #[test]
    fn test_first_empty_second_has_data() {
        let candidates = vec![
            EndpointSpec::new("A", 100).with_cycle(2024),
            EndpointSpec::new("B", 100).with_cycle(2022),
        ];
        let fetcher = ScriptedFetcher::new(vec![
            (
                "two_year_transaction_period=2024",
                Ok(RawResponse::new(200, r#"{"results": []}"#)),
            ),
            ("two_year_transaction_period=2022", Ok(page(3))),
        ]);

        let report = probe_endpoints(&fetcher, "http://api.test/v1", "k", &candidates, Duration::ZERO);

        let calls = fetcher.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("two_year_transaction_period=2024"));
        assert!(calls[1].contains("two_year_transaction_period=2022"));

        let selection = report.selection.unwrap();
        assert_eq!(selection.endpoint.name, "B");
        assert_eq!(selection.results.len(), 3);
        assert_eq!(selection.available, Some(1234));
        assert_eq!(report.attempts[0].outcome, ProbeOutcome::Empty);
        assert_eq!(report.attempts[1].outcome, ProbeOutcome::Found(3));
    }

    #[test]
    fn test_stops_at_first_success() {
        let candidates = default_candidates(2024, 100);
        let fetcher = ScriptedFetcher::new(vec![("schedule_a", Ok(page(1)))]);

        let selection =
            select_first_non_empty(&fetcher, "http://api.test/v1", "k", &candidates, Duration::ZERO);

        assert!(selection.is_some());
        assert_eq!(fetcher.calls.borrow().len(), 1);
    }

    #[test]
    fn test_all_failures_yield_none() {
        let candidates = default_candidates(2024, 100);
        let fetcher = ScriptedFetcher::new(vec![
            ("min_amount", Ok(RawResponse::new(500, "oops"))),
            (
                "two_year_transaction_period=2024",
                Ok(RawResponse::new(422, r#"{"errors": ["bad"]}"#)),
            ),
            ("two_year_transaction_period=2022", Ok(RawResponse::new(200, "<html>"))),
            (
                "schedule_a",
                Err(MoneyTrailError::Config("connection refused".to_string())),
            ),
        ]);

        let report = probe_endpoints(&fetcher, "http://api.test/v1", "k", &candidates, Duration::ZERO);

        assert!(report.selection.is_none());
        assert_eq!(report.attempts.len(), 4);
        assert_eq!(report.attempts[0].outcome, ProbeOutcome::Status(500));
        assert_eq!(report.attempts[1].outcome, ProbeOutcome::Status(422));
        assert!(matches!(report.attempts[2].outcome, ProbeOutcome::Malformed(_)));
        assert!(matches!(report.attempts[3].outcome, ProbeOutcome::Failed(_)));
        assert!(report.summary().contains("2024 cycle: HTTP 422"));
    }

    #[test]
    fn test_missing_results_field_is_empty() {
        let candidates = vec![EndpointSpec::new("only", 100)];
        let fetcher = ScriptedFetcher::new(vec![(
            "schedule_a",
            Ok(RawResponse::new(200, r#"{"api_version": "1.0"}"#)),
        )]);

        let report = probe_endpoints(&fetcher, "http://api.test/v1", "k", &candidates, Duration::ZERO);
        assert_eq!(report.attempts[0].outcome, ProbeOutcome::Empty);
    }

    #[test]
    fn test_check_api_key() {
        let ok = ScriptedFetcher::new(vec![("candidates", Ok(RawResponse::new(200, "{}")))]);
        assert_eq!(check_api_key(&ok, "http://api.test/v1", "k"), KeyStatus::Valid);
        assert!(ok.calls.borrow()[0].contains("per_page=1"));

        let forbidden = ScriptedFetcher::new(vec![("candidates", Ok(RawResponse::new(403, "")))]);
        assert_eq!(
            check_api_key(&forbidden, "http://api.test/v1", "k"),
            KeyStatus::Rejected(403)
        );

        let missing = ScriptedFetcher::new(vec![]);
        assert!(matches!(
            check_api_key(&missing, "http://api.test/v1", "k"),
            KeyStatus::Unverified(_)
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
    }
}
