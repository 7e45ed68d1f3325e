//! Command-line interface for the money trail pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::aggregate::{Aggregates, Breakdown};
use crate::config::{
    mask_api_key, validate_cycle, validate_per_page, FetchConfig, API_KEY_ENV, API_KEY_SIGNUP_URL,
};
use crate::endpoint::{check_api_key, KeyStatus};
use crate::error::{MoneyTrailError, Result};
use crate::http::{HttpFetcher, RetryPolicy};
use crate::output::read_document;
use crate::pipeline::Pipeline;
use crate::types::SourceStatus;

/// M.E.G.A. money trail - Fetch FEC contributions into the site's data file.
#[derive(Parser)]
#[command(name = "mega-moneytrail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `fetch` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch contributions and write the money trail document.
    Fetch(FetchArgs),

    /// Check whether the configured API key is accepted.
    CheckKey {
        /// API base URL (default: $FEC_API_BASE_URL or the public FEC API)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Summarize a previously written document.
    Summary {
        /// Document to read (default: $MEGA_OUTPUT_PATH or src/data/moneyTrail.json)
        path: Option<PathBuf>,

        /// Number of groups to show per breakdown
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

#[derive(Args, Default)]
pub struct FetchArgs {
    /// Output file (default: $MEGA_OUTPUT_PATH or src/data/moneyTrail.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Election cycle, an even year such as 2024 (default: current cycle)
    #[arg(short, long)]
    pub cycle: Option<String>,

    /// Records requested per endpoint (1-100)
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Attempts per request before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// API base URL (default: $FEC_API_BASE_URL or the public FEC API)
    #[arg(long)]
    pub base_url: Option<String>,

    /// JSON party attribution table replacing the built-in one
    #[arg(long)]
    pub party_table: Option<PathBuf>,

    /// Skip the API key check before probing endpoints
    #[arg(long)]
    pub no_verify_key: bool,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = FetchConfig::from_env();

    match cli.command {
        None => fetch_command(FetchArgs::default(), config),
        Some(Commands::Fetch(args)) => fetch_command(args, config),
        Some(Commands::CheckKey { base_url }) => check_key_command(base_url, config),
        Some(Commands::Summary { path, top }) => {
            let path = path.unwrap_or_else(|| config.output_path.clone());
            summary_command(&path, top)
        }
    }
}

/// Apply command-line overrides on top of the environment.
pub fn apply_fetch_args(args: FetchArgs, mut config: FetchConfig) -> Result<FetchConfig> {
    // Validate inputs before making HTTP requests
    if let Some(cycle) = args.cycle.as_deref() {
        config = config.with_cycle(validate_cycle(cycle)?);
    }
    if let Some(per_page) = args.per_page {
        config = config.with_per_page(validate_per_page(per_page)?);
    }
    if let Some(output) = args.output {
        config = config.with_output_path(output);
    }
    if let Some(max_attempts) = args.max_attempts {
        config = config.with_max_attempts(max_attempts);
    }
    if let Some(secs) = args.timeout_secs {
        if secs == 0 {
            return Err(MoneyTrailError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    if args.party_table.is_some() {
        config = config.with_party_table(args.party_table);
    }
    if args.no_verify_key {
        config = config.with_verify_key(false);
    }
    Ok(config)
}

/// Execute the fetch command.
fn fetch_command(args: FetchArgs, config: FetchConfig) -> Result<()> {
    let config = apply_fetch_args(args, config)?;

    println!(
        "{} contributions for the {} cycle",
        style("Fetching").bold(),
        style(config.cycle).cyan()
    );
    match &config.api_key {
        Some(key) => println!("  API key: {}", style(mask_api_key(key)).dim()),
        None => println!(
            "  {} {API_KEY_ENV} is not set, using educational fallback",
            style("!").yellow().bold()
        ),
    }
    println!();

    let pipeline = Pipeline::from_config(config)?;

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Probing FEC endpoints...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let report = match pipeline.run() {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    let status = match report.status {
        SourceStatus::Live => style(report.status.as_str()).green().bold(),
        SourceStatus::EducationalFallback => style(report.status.as_str()).yellow().bold(),
    };
    println!("  Status: {status}");
    if let Some(endpoint) = &report.endpoint_used {
        println!("  Endpoint: {}", style(endpoint).cyan());
    }
    if let Some(reason) = &report.fallback_reason {
        println!("  Reason: {}", style(reason).yellow());
        println!("  Get a key at {API_KEY_SIGNUP_URL}");
    }
    println!("  Records: {}", report.record_count);
    println!("  Total: {}", format_amount(report.total_amount));
    println!("  Largest: {}", format_amount(report.max_amount));

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        report.output_path.display()
    );

    Ok(())
}

/// Execute the check-key command.
fn check_key_command(base_url: Option<String>, config: FetchConfig) -> Result<()> {
    let config = match base_url {
        Some(url) => config.with_base_url(url),
        None => config,
    };
    let Some(api_key) = config.api_key.as_deref() else {
        return Err(MoneyTrailError::Config(format!(
            "{API_KEY_ENV} is not set. Get a key at {API_KEY_SIGNUP_URL}"
        )));
    };

    let policy = RetryPolicy::new(config.max_attempts, config.retry_base_delay);
    let fetcher = HttpFetcher::new(config.timeout, policy)?;

    match check_api_key(&fetcher, &config.base_url, api_key) {
        KeyStatus::Valid => {
            println!(
                "{} {} accepted",
                style("OK").green().bold(),
                mask_api_key(api_key)
            );
            Ok(())
        }
        KeyStatus::Rejected(status) => Err(MoneyTrailError::Config(format!(
            "API key {} rejected (HTTP {status})",
            mask_api_key(api_key)
        ))),
        KeyStatus::Unverified(reason) => {
            println!("{} could not verify key: {reason}", style("?").yellow().bold());
            Ok(())
        }
    }
}

/// Execute the summary command.
fn summary_command(path: &Path, top: usize) -> Result<()> {
    let doc = read_document(path)?;
    let m = &doc.metadata;

    println!("{} {}", style("Document").bold(), path.display());
    println!("  Status: {}", m.data_status);
    println!("  Source: {}", m.data_source);
    println!("  Written: {}", m.timestamp.to_rfc3339());
    if let Some(cycle) = m.election_cycle {
        println!("  Cycle: {cycle}");
    }
    println!("  Records: {}", m.total_contributions);
    println!("  Total: {}", format_amount(m.total_amount));
    println!("  Average: {}", format_amount(m.average_amount));
    println!("  Largest: {}", format_amount(m.biggest_donation));

    print_breakdown("States", &Aggregates::top(&m.breakdowns.by_state, top));
    print_breakdown("Parties", &Aggregates::top(&m.breakdowns.by_party, top));
    print_breakdown("Sectors", &Aggregates::top(&m.breakdowns.by_sector, top));
    print_breakdown("Committees", &Aggregates::top(&m.breakdowns.by_committee, top));

    let peaks = &m.breakdowns.peak_days;
    if !peaks.is_empty() {
        println!();
        println!(
            "  {} ({:.1} contributions per day)",
            style("Peak days").bold(),
            m.breakdowns.daily_average
        );
        for day in peaks.iter().take(top) {
            println!("    {:<32} {:>16} ({})", day.date, format_amount(day.total), day.count);
        }
    }

    println!();
    println!(
        "  {} {} unique, {} giving to several committees",
        style("Contributors").bold(),
        m.breakdowns.unique_contributors,
        m.breakdowns.network_hubs.len()
    );
    for hub in m.breakdowns.network_hubs.iter().take(top) {
        println!(
            "    {:<32} {:>16} -> {}",
            hub.contributor,
            format_amount(hub.total),
            hub.committees.join(", ")
        );
    }

    let problems = doc.consistency_problems();
    if problems.is_empty() {
        return Ok(());
    }

    println!();
    for problem in &problems {
        println!("  {} {problem}", style("x").red().bold());
    }
    Err(MoneyTrailError::Config(format!(
        "{} metadata inconsistencies in {}",
        problems.len(),
        path.display()
    )))
}

fn print_breakdown(title: &str, groups: &[(&str, Breakdown)]) {
    if groups.is_empty() {
        return;
    }
    println!();
    println!("  {}", style(title).bold());
    for (name, group) in groups {
        println!(
            "    {:<32} {:>16} ({}, avg {})",
            name,
            format_amount(group.total),
            group.count,
            format_amount(group.average)
        );
    }
}

/// Format a dollar amount with thousands separators.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_OUTPUT_PATH;

    #[test]
    fn test_cli_parse_no_subcommand() {
        let cli = Cli::parse_from(["mega-moneytrail"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_fetch() {
        let cli = Cli::parse_from([
            "mega-moneytrail",
            "fetch",
            "--cycle",
            "2022",
            "--output",
            "out/trail.json",
            "--no-verify-key",
        ]);

        let Some(Commands::Fetch(args)) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.cycle.as_deref(), Some("2022"));
        assert_eq!(args.output, Some(PathBuf::from("out/trail.json")));
        assert!(args.no_verify_key);
        assert!(args.per_page.is_none());
    }

    #[test]
    fn test_cli_parse_summary() {
        let cli = Cli::parse_from(["mega-moneytrail", "summary", "trail.json", "--top", "3"]);

        let Some(Commands::Summary { path, top }) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(path, Some(PathBuf::from("trail.json")));
        assert_eq!(top, 3);
    }

    #[test]
    fn test_apply_fetch_args() {
        let args = FetchArgs {
            cycle: Some("2020".to_string()),
            per_page: Some(25),
            max_attempts: Some(0),
            base_url: Some("http://localhost:9/v1".to_string()),
            no_verify_key: true,
            ..FetchArgs::default()
        };
        let config = apply_fetch_args(args, FetchConfig::new()).unwrap();

        assert_eq!(config.cycle, 2020);
        assert_eq!(config.per_page, 25);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.base_url, "http://localhost:9/v1");
        assert!(!config.verify_key);
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }

    #[test]
    fn test_apply_fetch_args_rejects_bad_input() {
        let odd_cycle = FetchArgs {
            cycle: Some("2023".to_string()),
            ..FetchArgs::default()
        };
        assert!(matches!(
            apply_fetch_args(odd_cycle, FetchConfig::new()),
            Err(MoneyTrailError::InvalidCycle(_))
        ));

        let huge_page = FetchArgs {
            per_page: Some(500),
            ..FetchArgs::default()
        };
        assert!(apply_fetch_args(huge_page, FetchConfig::new()).is_err());

        let no_timeout = FetchArgs {
            timeout_secs: Some(0),
            ..FetchArgs::default()
        };
        assert!(apply_fetch_args(no_timeout, FetchConfig::new()).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "$0.00");
        assert_eq!(format_amount(250.5), "$250.50");
        assert_eq!(format_amount(5_001_250.5), "$5,001,250.50");
        assert_eq!(format_amount(999.999), "$1,000.00");
        assert_eq!(format_amount(-1234.0), "-$1,234.00");
    }
}
