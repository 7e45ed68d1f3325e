//! Raw API record to [`ContributionRecord`] normalization.
//!
//! Raw Schedule A rows are loosely typed: fields go missing, amounts arrive as
//! strings, dates carry time components. Every field gets an explicit default
//! here so nothing downstream ever sees a null.

use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value};

use crate::party::PartyLookup;
use crate::sector::classify_sector;
use crate::types::{
    ContributionRecord, ContributorType, Location, ANONYMOUS, NOT_DISCLOSED, UNKNOWN,
    UNKNOWN_COMMITTEE,
};

/// Field names tried in order for each canonical field.
const CONTRIBUTOR_KEYS: &[&str] = &["contributor_name", "contributor"];
const AMOUNT_KEYS: &[&str] = &["contribution_receipt_amount", "amount"];
const DATE_KEYS: &[&str] = &["contribution_receipt_date", "date"];
const EMPLOYER_KEYS: &[&str] = &["contributor_employer", "employer"];
const OCCUPATION_KEYS: &[&str] = &["contributor_occupation", "occupation"];
const CITY_KEYS: &[&str] = &["contributor_city", "city"];
const STATE_KEYS: &[&str] = &["contributor_state", "state"];
const COMMITTEE_KEYS: &[&str] = &["committee_name", "committee"];
const CANDIDATE_KEYS: &[&str] = &["candidate_name", "candidate"];
const TYPE_KEYS: &[&str] = &["entity_type", "contributor_type", "type"];

/// Maps raw records into the canonical shape.
#[derive(Debug, Clone)]
pub struct Normalizer {
    lookup: PartyLookup,
    default_date: NaiveDate,
}

impl Normalizer {
    /// Create a normalizer with an explicit placeholder date.
    #[must_use]
    pub fn new(lookup: PartyLookup, default_date: NaiveDate) -> Self {
        Self {
            lookup,
            default_date,
        }
    }

    /// Create a normalizer whose placeholder date is January 1st of `year`.
    #[must_use]
    pub fn for_year(lookup: PartyLookup, year: i32) -> Self {
        let default_date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        Self::new(lookup, default_date)
    }

    /// Create a normalizer for the current year.
    #[must_use]
    pub fn for_today(lookup: PartyLookup) -> Self {
        Self::for_year(lookup, chrono::Utc::now().year())
    }

    #[must_use]
    pub fn default_date(&self) -> NaiveDate {
        self.default_date
    }

    /// Normalize a batch of raw records, keeping input order.
    pub fn normalize(&self, raw: &[Value]) -> Vec<ContributionRecord> {
        let records: Vec<ContributionRecord> = raw
            .iter()
            .enumerate()
            .map(|(index, value)| self.normalize_record(index, value))
            .collect();

        tracing::debug!(count = records.len(), "Normalized records");
        records
    }

    /// Normalize one raw record. Non-object values yield an all-default record.
    pub fn normalize_record(&self, index: usize, raw: &Value) -> ContributionRecord {
        let empty = Map::new();
        let obj = match raw.as_object() {
            Some(obj) => obj,
            None => {
                tracing::warn!(index, "Raw record is not an object, using defaults");
                &empty
            }
        };

        let contributor_name =
            string_field(obj, CONTRIBUTOR_KEYS).unwrap_or_else(|| ANONYMOUS.to_string());
        let committee_name =
            committee_name(obj).unwrap_or_else(|| UNKNOWN_COMMITTEE.to_string());
        let employer = string_field(obj, EMPLOYER_KEYS).unwrap_or_else(|| NOT_DISCLOSED.to_string());
        let occupation =
            string_field(obj, OCCUPATION_KEYS).unwrap_or_else(|| NOT_DISCLOSED.to_string());

        let amount = match first_present(obj, AMOUNT_KEYS).map(parse_amount) {
            Some(Some(amount)) => amount,
            Some(None) => {
                tracing::warn!(index, "Malformed amount, using 0");
                0.0
            }
            None => 0.0,
        };

        let date = string_field(obj, DATE_KEYS)
            .and_then(|d| parse_date(&d))
            .unwrap_or(self.default_date);

        let contributor_type = string_field(obj, TYPE_KEYS)
            .map(|t| ContributorType::from_code(&t))
            .unwrap_or(ContributorType::Unknown);

        let location = Location::new(
            string_field(obj, CITY_KEYS).unwrap_or_else(|| UNKNOWN.to_string()),
            string_field(obj, STATE_KEYS).unwrap_or_else(|| UNKNOWN.to_string()),
        );

        let party = self.lookup.attribute(&contributor_name, &committee_name);
        let sector = classify_sector(&occupation, &employer).to_string();

        ContributionRecord {
            id: format!("contribution-{index}"),
            contributor_name,
            amount,
            date,
            employer,
            occupation,
            location,
            committee_name,
            candidate_name: string_field(obj, CANDIDATE_KEYS),
            contributor_type,
            party,
            sector,
        }
    }
}

/// First key that is present and not null.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// First key holding a non-blank string (numbers are stringified).
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| {
        let text = match v {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

/// Committee name, either flat or nested as `committee.name`.
fn committee_name(obj: &Map<String, Value>) -> Option<String> {
    obj.get("committee")
        .and_then(Value::as_object)
        .and_then(|c| string_field(c, &["name"]))
        .or_else(|| string_field(obj, COMMITTEE_KEYS))
}

/// Parse an amount from a JSON number or numeric string.
///
/// Returns `None` for anything unusable. Negative amounts (refunds) clamp to 0.
///
/// # Examples
/// ```
/// use mega_moneytrail::normalize::parse_amount;
/// use serde_json::json;
///
/// assert_eq!(parse_amount(&json!(2800)), Some(2800.0));
/// assert_eq!(parse_amount(&json!("$1,250.50")), Some(1250.5));
/// assert_eq!(parse_amount(&json!(-500)), Some(0.0));
/// assert_eq!(parse_amount(&json!("lots")), None);
/// ```
#[must_use]
pub fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != '$' && *c != ',')
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };

    if !amount.is_finite() {
        return None;
    }
    Some(amount.max(0.0))
}

/// Parse `YYYY-MM-DD`, ignoring any time component that follows.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
