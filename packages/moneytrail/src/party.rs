//! Donor to party lookup table.
//!
//! Attribution is a case-insensitive substring match of the contributor name,
//! then the committee name, against an ordered pattern list. The first match
//! wins. This is an enrichment heuristic: a consumer should present the result
//! as advisory, never as ground truth.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MoneyTrailError, Result};
use crate::types::Party;

/// Built-in patterns. Donor names use the FEC "LAST, FIRST" form.
const BUILTIN_PATTERNS: &[(&str, Party)] = &[
    // Individual donors
    ("MELLON, TIMOTHY", Party::Republican),
    ("MUSK, ELON", Party::Republican),
    ("GRIFFIN, KENNETH", Party::Republican),
    ("ADELSON, MIRIAM", Party::Republican),
    ("UIHLEIN, RICHARD", Party::Republican),
    ("UIHLEIN, ELIZABETH", Party::Republican),
    ("YASS, JEFFREY", Party::Republican),
    ("SCHWARZMAN, STEPHEN", Party::Republican),
    ("THIEL, PETER", Party::Republican),
    ("SOROS, GEORGE", Party::Democrat),
    ("SOROS, ALEXANDER", Party::Democrat),
    ("BLOOMBERG, MICHAEL", Party::Democrat),
    ("HOFFMAN, REID", Party::Democrat),
    ("MOSKOVITZ, DUSTIN", Party::Democrat),
    ("SIMONS, JAMES", Party::Democrat),
    ("PRITZKER, J", Party::Democrat),
    ("STEYER, THOMAS", Party::Democrat),
    ("SUSSMAN, DONALD", Party::Democrat),
    // Committees and conduits
    ("WINRED", Party::Republican),
    ("MAGA INC", Party::Republican),
    ("SENATE LEADERSHIP FUND", Party::Republican),
    ("CONGRESSIONAL LEADERSHIP FUND", Party::Republican),
    ("NRCC", Party::Republican),
    ("NRSC", Party::Republican),
    ("REPUBLICAN", Party::Republican),
    ("ACTBLUE", Party::Democrat),
    ("FUTURE FORWARD", Party::Democrat),
    ("SENATE MAJORITY PAC", Party::Democrat),
    ("HOUSE MAJORITY PAC", Party::Democrat),
    ("DCCC", Party::Democrat),
    ("DSCC", Party::Democrat),
    ("DEMOCRATIC", Party::Democrat),
    ("FRIENDS OF BERNIE SANDERS", Party::Independent),
    ("BERNIE 2020", Party::Independent),
    ("ANGUS KING FOR", Party::Independent),
];

/// One pattern in a lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPattern {
    pub pattern: String,
    pub party: Party,
}

/// Ordered pattern table used to attribute a party to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyLookup {
    entries: Vec<PartyPattern>,
}

impl PartyLookup {
    /// Build a table from patterns, in priority order.
    ///
    /// Patterns are upper-cased and blank patterns dropped.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = PartyPattern>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|e| {
                let pattern = e.pattern.trim().to_uppercase();
                (!pattern.is_empty()).then_some(PartyPattern {
                    pattern,
                    party: e.party,
                })
            })
            .collect();
        Self { entries }
    }

    /// The built-in donor and committee table.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_PATTERNS.iter().map(|(pattern, party)| PartyPattern {
            pattern: (*pattern).to_string(),
            party: *party,
        }))
    }

    /// Parse a JSON array of `{"pattern": ..., "party": ...}` objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<PartyPattern> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a table from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| MoneyTrailError::PartyTable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let lookup = Self::from_json_str(&content).map_err(|e| MoneyTrailError::PartyTable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), patterns = lookup.len(), "Loaded party table");
        Ok(lookup)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the party for a single name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Party> {
        let name = name.to_uppercase();
        self.entries
            .iter()
            .find(|e| name.contains(e.pattern.as_str()))
            .map(|e| e.party)
    }

    /// Attribute a party, preferring the contributor over the committee.
    ///
    /// # Examples
    /// ```
    /// use mega_moneytrail::party::PartyLookup;
    /// use mega_moneytrail::types::Party;
    ///
    /// let lookup = PartyLookup::builtin();
    /// assert_eq!(lookup.attribute("MELLON, TIMOTHY", "Unknown Committee"), Party::Republican);
    /// assert_eq!(lookup.attribute("DOE, JANE", "ACTBLUE"), Party::Democrat);
    /// assert_eq!(lookup.attribute("DOE, JANE", "LOCAL PAC"), Party::Unknown);
    /// ```
    #[must_use]
    pub fn attribute(&self, contributor: &str, committee: &str) -> Party {
        self.lookup(contributor)
            .or_else(|| self.lookup(committee))
            .unwrap_or(Party::Unknown)
    }
}

impl Default for PartyLookup {
    fn default() -> Self {
        Self::builtin()
    }
}
