//! HTTP client wrapper for the OpenFEC API.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::{redact_api_key, DEFAULT_MAX_ATTEMPTS, RETRY_BASE_DELAY_MS};
use crate::error::{MoneyTrailError, Result};

/// User agent string identifying this pipeline.
const USER_AGENT: &str = concat!("mega-moneytrail/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// How often and how patiently to retry a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the `retry`-th retry (1-based): `base_delay * retry`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(RETRY_BASE_DELAY_MS),
        )
    }
}

/// Something that can GET a URL, enabling mocking in tests.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<RawResponse>;
}

/// [`Fetcher`] backed by a blocking reqwest client with retries.
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: create_client(timeout)?,
            policy,
        })
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<RawResponse> {
        fetch_with_retry(&self.client, url, &self.policy)
    }
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` with the given per-request timeout and user agent.
pub fn create_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// GET a URL, retrying transient failures.
///
/// Connection errors, timeouts, broken bodies and 5xx responses are retried,
/// waiting `base_delay * n` before the n-th retry. 2xx and 4xx responses are
/// returned as-is; a 4xx will not get better by asking again.
///
/// # Arguments
/// * `client` - HTTP client to use
/// * `url` - URL to fetch
/// * `policy` - attempt budget and backoff base
///
/// # Returns
/// The final response, or `RetriesExhausted` carrying the last failure.
pub fn fetch_with_retry(client: &Client, url: &str, policy: &RetryPolicy) -> Result<RawResponse> {
    let logged_url = redact_api_key(url);
    let mut last_error: Option<String> = None;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            let delay = policy.delay_for(attempt - 1);
            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Retrying after delay"
            );
            thread::sleep(delay);
        }

        match client.get(url).send() {
            Ok(response) => {
                let status = response.status();

                if status.is_server_error() {
                    tracing::warn!(
                        status = %status,
                        attempt,
                        max_attempts = policy.max_attempts,
                        url = %logged_url,
                        "Server error, will retry"
                    );
                    last_error = Some(format!("Server error: {status}"));
                    continue;
                }

                match response.text() {
                    Ok(body) => {
                        tracing::debug!(status = status.as_u16(), url = %logged_url, "Request completed");
                        return Ok(RawResponse::new(status.as_u16(), body));
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            attempt,
                            max_attempts = policy.max_attempts,
                            "Failed to read response body, will retry"
                        );
                        last_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                // Malformed requests fail the same way every time
                if e.is_builder() {
                    return Err(MoneyTrailError::Http(e));
                }
                tracing::warn!(
                    error = %e,
                    timeout = e.is_timeout(),
                    attempt,
                    max_attempts = policy.max_attempts,
                    url = %logged_url,
                    "Request failed, will retry"
                );
                last_error = Some(redact_api_key(&e.to_string()));
            }
        }
    }

    Err(MoneyTrailError::RetriesExhausted {
        attempts: policy.max_attempts,
        message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
    })
}
