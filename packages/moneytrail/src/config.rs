//! Configuration constants, environment loading and validation.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Datelike;
use regex::Regex;

use crate::error::{MoneyTrailError, Result};

/// Base URL for the OpenFEC API.
pub const FEC_API_BASE_URL: &str = "https://api.open.fec.gov/v1";

/// Environment variable holding the api.data.gov key.
pub const API_KEY_ENV: &str = "FEC_API_KEY";

/// Environment variable overriding [`FEC_API_BASE_URL`].
pub const BASE_URL_ENV: &str = "FEC_API_BASE_URL";

/// Environment variable overriding [`DEFAULT_OUTPUT_PATH`].
pub const OUTPUT_PATH_ENV: &str = "MEGA_OUTPUT_PATH";

/// Where the site build expects the money trail document.
pub const DEFAULT_OUTPUT_PATH: &str = "src/data/moneyTrail.json";

/// Per-request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// Attempts per request before giving up on an endpoint.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for the retry backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Pause between endpoint candidates (milliseconds).
pub const PROBE_PAUSE_MS: u64 = 800;

/// Records requested per endpoint. The API caps `per_page` at 100.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Upper bound accepted by the API for `per_page`.
pub const MAX_PER_PAGE: u32 = 100;

/// Where to request a key with Schedule A access.
pub const API_KEY_SIGNUP_URL: &str = "https://api.data.gov/signup/";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CYCLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static API_KEY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"api_key=[^&]*").expect("valid regex"));

/// Validate an election cycle (two-year transaction period).
///
/// FEC periods are identified by their closing, even-numbered year.
///
/// # Examples
/// ```
/// use mega_moneytrail::config::validate_cycle;
///
/// assert_eq!(validate_cycle("2024").unwrap(), 2024);
/// assert!(validate_cycle("2023").is_err());
/// assert!(validate_cycle("24").is_err());
/// ```
pub fn validate_cycle(cycle: &str) -> Result<u16> {
    if !CYCLE_PATTERN.is_match(cycle) {
        return Err(MoneyTrailError::InvalidCycle(cycle.to_string()));
    }

    let year: u16 = cycle
        .parse()
        .map_err(|_| MoneyTrailError::InvalidCycle(cycle.to_string()))?;

    if year % 2 != 0 || !(1980..=2100).contains(&year) {
        return Err(MoneyTrailError::InvalidCycle(cycle.to_string()));
    }

    Ok(year)
}

/// Validate the page size requested from the API.
pub fn validate_per_page(per_page: u32) -> Result<u32> {
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(MoneyTrailError::Config(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}, got {per_page}"
        )));
    }
    Ok(per_page)
}

/// The two-year period containing `year`.
///
/// # Examples
/// ```
/// use mega_moneytrail::config::cycle_for_year;
///
/// assert_eq!(cycle_for_year(2024), 2024);
/// assert_eq!(cycle_for_year(2025), 2026);
/// ```
#[must_use]
pub fn cycle_for_year(year: i32) -> u16 {
    let even = if year % 2 == 0 { year } else { year + 1 };
    u16::try_from(even).unwrap_or(u16::MAX - 1)
}

/// The two-year period containing today.
#[must_use]
pub fn current_cycle() -> u16 {
    cycle_for_year(chrono::Utc::now().year())
}

/// Replace the `api_key` query value in a URL for logging.
///
/// # Examples
/// ```
/// use mega_moneytrail::config::redact_api_key;
///
/// assert_eq!(
///     redact_api_key("https://x/v1/?api_key=SECRET&per_page=1"),
///     "https://x/v1/?api_key=REDACTED&per_page=1"
/// );
/// ```
#[must_use]
pub fn redact_api_key(url: &str) -> String {
    API_KEY_PARAM.replace_all(url, "api_key=REDACTED").into_owned()
}

/// Mask a key for display, keeping a short prefix and suffix.
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..8].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

/// Settings for one pipeline run.
///
/// NOTE: `Debug` is implemented by hand so the API key never reaches logs.
#[derive(Clone)]
pub struct FetchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub output_path: PathBuf,
    pub cycle: u16,
    pub per_page: u32,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub probe_pause: Duration,
    pub party_table: Option<PathBuf>,
    pub verify_key: bool,
}

impl FetchConfig {
    /// Defaults for everything, with no API key.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: FEC_API_BASE_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            cycle: current_cycle(),
            per_page: DEFAULT_PER_PAGE,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            probe_pause: Duration::from_millis(PROBE_PAUSE_MS),
            party_table: None,
            verify_key: true,
        }
    }

    /// Read the API key, base URL and output path from the environment.
    ///
    /// A blank key counts as missing.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| FEC_API_BASE_URL.to_string());

        let output_path = std::env::var(OUTPUT_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string())
            .into();

        Self {
            api_key,
            base_url,
            output_path,
            ..Self::new()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    pub fn with_cycle(mut self, cycle: u16) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_probe_pause(mut self, pause: Duration) -> Self {
        self.probe_pause = pause;
        self
    }

    pub fn with_party_table(mut self, path: Option<PathBuf>) -> Self {
        self.party_table = path;
        self
    }

    pub fn with_verify_key(mut self, verify_key: bool) -> Self {
        self.verify_key = verify_key;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("base_url", &self.base_url)
            .field("output_path", &self.output_path)
            .field("cycle", &self.cycle)
            .field("per_page", &self.per_page)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("probe_pause", &self.probe_pause)
            .field("party_table", &self.party_table)
            .field("verify_key", &self.verify_key)
            .finish()
    }
}
