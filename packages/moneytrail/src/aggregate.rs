//! Aggregate metrics over normalized records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{ContributionRecord, Party, ANONYMOUS, UNKNOWN_COMMITTEE};

/// Busiest days kept in `peak_days`.
pub const PEAK_DAY_LIMIT: usize = 5;

/// Hubs kept in `network_hubs`.
pub const NETWORK_HUB_LIMIT: usize = 10;

/// Sum, count and mean for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub total: f64,
    pub count: usize,
    #[serde(default)]
    pub average: f64,
}

impl Breakdown {
    fn add(&mut self, amount: f64) {
        self.total += amount;
        self.count += 1;
        self.average = self.total / self.count as f64;
    }
}

/// Contribution activity on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakDay {
    pub date: String,
    pub count: usize,
    pub total: f64,
}

/// A contributor giving to more than one committee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkHub {
    pub contributor: String,
    pub committees: Vec<String>,
    pub total: f64,
    pub count: usize,
}

/// Group-by reductions and pattern summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdowns {
    pub by_party: BTreeMap<String, Breakdown>,
    pub by_state: BTreeMap<String, Breakdown>,
    pub by_committee: BTreeMap<String, Breakdown>,
    pub by_sector: BTreeMap<String, Breakdown>,
    /// Keyed by `YYYY-MM-DD`.
    #[serde(default)]
    pub by_date: BTreeMap<String, Breakdown>,
    #[serde(default)]
    pub peak_days: Vec<PeakDay>,
    /// Contributions per distinct day.
    #[serde(default)]
    pub daily_average: f64,
    #[serde(default)]
    pub unique_contributors: usize,
    #[serde(default)]
    pub network_hubs: Vec<NetworkHub>,
}

/// Earliest and latest contribution date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Everything derived from a record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub total_amount: f64,
    pub average_amount: f64,
    pub max_amount: f64,
    pub record_count: usize,
    pub breakdowns: Breakdowns,
    pub parties_present: Vec<Party>,
    pub date_range: Option<DateRange>,
}

impl Aggregates {
    /// The `n` largest groups of a breakdown by total, ties broken by name.
    #[must_use]
    pub fn top(breakdown: &BTreeMap<String, Breakdown>, n: usize) -> Vec<(&str, Breakdown)> {
        let mut groups: Vec<(&str, Breakdown)> =
            breakdown.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        groups.sort_by(|a, b| b.1.total.total_cmp(&a.1.total).then_with(|| a.0.cmp(b.0)));
        groups.truncate(n);
        groups
    }
}

/// The `n` days with the most contributions, ties broken by date.
///
/// # Examples
/// ```
/// use mega_moneytrail::aggregate::{aggregate, peak_days};
///
/// assert!(peak_days(&aggregate(&[]).breakdowns.by_date, 5).is_empty());
/// ```
#[must_use]
pub fn peak_days(by_date: &BTreeMap<String, Breakdown>, n: usize) -> Vec<PeakDay> {
    let mut days: Vec<PeakDay> = by_date
        .iter()
        .map(|(date, group)| PeakDay {
            date: date.clone(),
            count: group.count,
            total: group.total,
        })
        .collect();
    days.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.date.cmp(&b.date)));
    days.truncate(n);
    days
}

#[derive(Default)]
struct ContributorTally<'a> {
    committees: BTreeSet<&'a str>,
    total: f64,
    count: usize,
}

/// Per-contributor reduction: distinct named contributors and the top hubs.
///
/// Anonymous contributors and unknown committees are left out.
fn contributor_network(records: &[ContributionRecord], n: usize) -> (usize, Vec<NetworkHub>) {
    let mut tallies: BTreeMap<&str, ContributorTally<'_>> = BTreeMap::new();

    for record in records.iter().filter(|r| r.contributor_name != ANONYMOUS) {
        let tally = tallies.entry(record.contributor_name.as_str()).or_default();
        tally.total += usable_amount(record.amount);
        tally.count += 1;
        if record.committee_name != UNKNOWN_COMMITTEE {
            tally.committees.insert(record.committee_name.as_str());
        }
    }

    let unique_contributors = tallies.len();
    let mut hubs: Vec<NetworkHub> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.committees.len() > 1)
        .map(|(name, tally)| NetworkHub {
            contributor: name.to_string(),
            committees: tally.committees.into_iter().map(String::from).collect(),
            total: tally.total,
            count: tally.count,
        })
        .collect();
    hubs.sort_by(|a, b| {
        b.committees
            .len()
            .cmp(&a.committees.len())
            .then_with(|| b.total.total_cmp(&a.total))
            .then_with(|| a.contributor.cmp(&b.contributor))
    });
    hubs.truncate(n);

    (unique_contributors, hubs)
}

/// Amounts that cannot be summed count as zero.
fn usable_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Compute totals, average, maximum and breakdowns.
///
/// An empty record set yields zeros, never NaN.
///
/// # Examples
/// ```
/// use mega_moneytrail::aggregate::aggregate;
///
/// let empty = aggregate(&[]);
/// assert_eq!(empty.average_amount, 0.0);
/// assert_eq!(empty.max_amount, 0.0);
/// ```
#[must_use]
pub fn aggregate(records: &[ContributionRecord]) -> Aggregates {
    let mut total_amount = 0.0;
    let mut max_amount: f64 = 0.0;
    let mut breakdowns = Breakdowns::default();
    let mut parties = BTreeSet::new();
    let mut date_range: Option<DateRange> = None;

    for record in records {
        let amount = usable_amount(record.amount);
        if amount != record.amount {
            tracing::warn!(id = %record.id, amount = record.amount, "Unusable amount counted as 0");
        }

        total_amount += amount;
        max_amount = max_amount.max(amount);

        breakdowns
            .by_party
            .entry(record.party.as_str().to_string())
            .or_default()
            .add(amount);
        breakdowns
            .by_state
            .entry(record.location.state.clone())
            .or_default()
            .add(amount);
        breakdowns
            .by_committee
            .entry(record.committee_name.clone())
            .or_default()
            .add(amount);
        breakdowns
            .by_sector
            .entry(record.sector.clone())
            .or_default()
            .add(amount);
        breakdowns
            .by_date
            .entry(record.date.to_string())
            .or_default()
            .add(amount);

        if record.party != Party::Unknown {
            parties.insert(record.party);
        }

        date_range = Some(match date_range {
            None => DateRange {
                start: record.date,
                end: record.date,
            },
            Some(range) => DateRange {
                start: range.start.min(record.date),
                end: range.end.max(record.date),
            },
        });
    }

    let record_count = records.len();
    let average_amount = if record_count == 0 {
        0.0
    } else {
        total_amount / record_count as f64
    };

    breakdowns.peak_days = peak_days(&breakdowns.by_date, PEAK_DAY_LIMIT);
    breakdowns.daily_average = if breakdowns.by_date.is_empty() {
        0.0
    } else {
        record_count as f64 / breakdowns.by_date.len() as f64
    };
    let (unique_contributors, network_hubs) = contributor_network(records, NETWORK_HUB_LIMIT);
    breakdowns.unique_contributors = unique_contributors;
    breakdowns.network_hubs = network_hubs;

    Aggregates {
        total_amount,
        average_amount,
        max_amount,
        record_count,
        breakdowns,
        parties_present: parties.into_iter().collect(),
        date_range,
    }
}
