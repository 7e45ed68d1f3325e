//! M.E.G.A. money trail - Fetch and normalize FEC campaign contributions.
//!
//! This crate probes the FEC Schedule A API for recent itemized
//! contributions, normalizes them into a fixed record shape, computes
//! aggregate metrics, and writes a single JSON document for the static
//! site build. When live data is unavailable it writes a clearly marked
//! educational dataset instead.
//!
//! # Example
//!
//! ```
//! use mega_moneytrail::fallback::generate_fallback;
//! use mega_moneytrail::types::SourceStatus;
//!
//! let doc = generate_fallback("no API key", chrono::Utc::now());
//! assert_eq!(doc.metadata.data_status, SourceStatus::EducationalFallback);
//! assert!(doc.consistency_problems().is_empty());
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, environment and validation
//! - [`types`]: Core data types (ContributionRecord, Party, etc.)
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP fetching with retry
//! - [`endpoint`]: Endpoint candidates, probing and key preflight
//! - [`party`]: Party attribution table
//! - [`sector`]: Occupation/employer sector classification
//! - [`normalize`]: Raw API rows to contribution records
//! - [`aggregate`]: Totals and breakdowns
//! - [`fallback`]: Educational fallback dataset
//! - [`output`]: Output document and atomic writer
//! - [`pipeline`]: The fetch/fallback/write state machine
//! - [`cli`]: Command-line interface

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fallback;
pub mod http;
pub mod normalize;
pub mod output;
pub mod party;
pub mod pipeline;
pub mod sector;
pub mod types;

// Re-export main entry points
pub use pipeline::{Pipeline, RunReport};

// Re-export commonly used items
pub use config::FetchConfig;
pub use error::{MoneyTrailError, Result};
pub use output::{write_document, OutputDocument};
pub use types::{ContributionRecord, Party, SourceStatus};
