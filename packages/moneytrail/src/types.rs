//! Core data types for the money trail document.
//!
//! Records are serialized in camelCase; the site build reads them directly.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder for fields the API left empty.
pub const NOT_DISCLOSED: &str = "Not Disclosed";

/// Placeholder for a missing contributor name.
pub const ANONYMOUS: &str = "Anonymous";

/// Placeholder for a missing committee name.
pub const UNKNOWN_COMMITTEE: &str = "Unknown Committee";

/// Placeholder for missing location parts.
pub const UNKNOWN: &str = "Unknown";

/// Best-effort party attribution. Advisory, never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    #[serde(alias = "republican", alias = "REP", alias = "R")]
    Republican,

    #[serde(alias = "democrat", alias = "DEM", alias = "D")]
    Democrat,

    #[serde(alias = "independent", alias = "IND", alias = "I")]
    Independent,

    #[serde(alias = "unknown")]
    Unknown,
}

impl Party {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Republican => "Republican",
            Self::Democrat => "Democrat",
            Self::Independent => "Independent",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of contributor behind a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributorType {
    Individual,
    Corporate,
    Unknown,
}

impl ContributorType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Corporate => "corporate",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an FEC `entity_type` code or a free-form type label.
    ///
    /// # Examples
    /// ```
    /// use mega_moneytrail::types::ContributorType;
    ///
    /// assert_eq!(ContributorType::from_code("IND"), ContributorType::Individual);
    /// assert_eq!(ContributorType::from_code("org"), ContributorType::Corporate);
    /// assert_eq!(ContributorType::from_code("PAC"), ContributorType::Unknown);
    /// ```
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "ind" | "individual" => Self::Individual,
            "org" | "corp" | "corporation" | "corporate" => Self::Corporate,
            _ => Self::Unknown,
        }
    }
}

/// Where a contributor lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Location {
    #[must_use]
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

/// One normalized campaign contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRecord {
    pub id: String,
    pub contributor_name: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub employer: String,
    pub occupation: String,
    pub location: Location,
    pub committee_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_name: Option<String>,
    pub contributor_type: ContributorType,
    pub party: Party,
    pub sector: String,
}

/// Provenance of a dataset. Consumers must check this before treating totals as real.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Live,
    EducationalFallback,
}

impl SourceStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::EducationalFallback => "EDUCATIONAL_FALLBACK",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
