//! Educational fallback dataset.
//!
//! Substituted whenever live data cannot be obtained. Every name carries an
//! `Example:` prefix and the metadata is tagged `EDUCATIONAL_FALLBACK`, so a
//! consumer cannot mistake it for real contributions.

use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregate::aggregate;
use crate::config::API_KEY_SIGNUP_URL;
use crate::output::{DatasetMetadata, OutputDocument};
use crate::sector::classify_sector;
use crate::types::{ContributionRecord, ContributorType, Location, Party, SourceStatus};

/// `data_source` value of fallback documents.
pub const FALLBACK_DATA_SOURCE: &str = "Educational Dataset";

const FALLBACK_NOTE: &str =
    "Real FEC API data unavailable. These example records only demonstrate the data structure.";

const FALLBACK_ACTION: &str = "Obtain an FEC API key with /schedules/schedule_a/ access";

struct Sample {
    id: &'static str,
    contributor: &'static str,
    amount: f64,
    date: (i32, u32, u32),
    employer: &'static str,
    occupation: &'static str,
    city: &'static str,
    state: &'static str,
    committee: &'static str,
    candidate: Option<&'static str>,
    contributor_type: ContributorType,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "edu-1",
        contributor: "Example: Transparency Advocate A",
        amount: 2800.0,
        date: (2024, 3, 15),
        employer: "Civic Tech Inc",
        occupation: "Software Engineer",
        city: "New York",
        state: "NY",
        committee: "Example: Accountability PAC",
        candidate: None,
        contributor_type: ContributorType::Individual,
    },
    Sample {
        id: "edu-2",
        contributor: "Example: Civic Engagement B",
        amount: 5000.0,
        date: (2024, 2, 28),
        employer: "Public Service Co",
        occupation: "Teacher",
        city: "Los Angeles",
        state: "CA",
        committee: "Example: Democracy Fund",
        candidate: None,
        contributor_type: ContributorType::Individual,
    },
    Sample {
        id: "edu-3",
        contributor: "Example: Open Government C",
        amount: 1200.0,
        date: (2024, 1, 10),
        employer: "Nonprofit Org",
        occupation: "Attorney",
        city: "Washington",
        state: "DC",
        committee: "Example: Transparency Initiative",
        candidate: None,
        contributor_type: ContributorType::Individual,
    },
    Sample {
        id: "edu-4",
        contributor: "Example: Major Corporation LLC",
        amount: 5_000_000.0,
        date: (2024, 3, 15),
        employer: "Finance Industry",
        occupation: "Not Disclosed",
        city: "New York",
        state: "NY",
        committee: "Example: Victory PAC",
        candidate: Some("Example Candidate A"),
        contributor_type: ContributorType::Corporate,
    },
    Sample {
        id: "edu-5",
        contributor: "Example: Tech Executive",
        amount: 2_500_000.0,
        date: (2024, 2, 28),
        employer: "Silicon Valley Corp",
        occupation: "Executive",
        city: "San Francisco",
        state: "CA",
        committee: "Example: Future Fund",
        candidate: Some("Example Candidate B"),
        contributor_type: ContributorType::Individual,
    },
];

/// The fixed synthetic records, in a stable order.
#[must_use]
pub fn fallback_records() -> Vec<ContributionRecord> {
    SAMPLES
        .iter()
        .map(|s| {
            let (y, m, d) = s.date;
            ContributionRecord {
                id: s.id.to_string(),
                contributor_name: s.contributor.to_string(),
                amount: s.amount,
                date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN),
                employer: s.employer.to_string(),
                occupation: s.occupation.to_string(),
                location: Location::new(s.city, s.state),
                committee_name: s.committee.to_string(),
                candidate_name: s.candidate.map(String::from),
                contributor_type: s.contributor_type,
                party: Party::Unknown,
                sector: classify_sector(s.occupation, s.employer).to_string(),
            }
        })
        .collect()
}

/// Build the fallback document.
///
/// # Arguments
/// * `reason` - why live data was unavailable; stored as `_metadata.error`
/// * `timestamp` - when this run happened
pub fn generate_fallback(reason: &str, timestamp: DateTime<Utc>) -> OutputDocument {
    tracing::warn!(reason, "Using educational fallback dataset");

    let records = fallback_records();
    let mut metadata = DatasetMetadata::from_aggregates(
        aggregate(&records),
        SourceStatus::EducationalFallback,
        FALLBACK_DATA_SOURCE,
        timestamp,
    );
    metadata.note = Some(FALLBACK_NOTE.to_string());
    metadata.error = Some(reason.to_string());
    metadata.required_action = Some(FALLBACK_ACTION.to_string());
    metadata.action_url = Some(API_KEY_SIGNUP_URL.to_string());

    OutputDocument::new(records, metadata)
}
