//! Command-line parsing for the price tracker.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Every option can also be supplied through the environment (or a
//! `.env` file), which is how scheduled jobs usually configure it.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{
    CivilOffset, DEFAULT_PRICE_SELECTOR, DEFAULT_SOURCE_URL, DEFAULT_USER_AGENT, StorageFormat,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pricewatch",
    version,
    about = "Daily price tracker: observe, record, summarize, report"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Observe today's price, record it, and mail the report.
    Run(RunArgs),
    /// Print window statistics for the stored series (read-only).
    Stats(StoreArgs),
    /// Render the report for the latest stored observation without observing.
    Render(RenderArgs),
}

/// Store, date policy, windows and report labels.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Record store file. Relative paths resolve against `--workspace`.
    #[arg(long, env = "PRICEWATCH_STORE", default_value = "motorin_fiyatlari.csv")]
    pub store: PathBuf,

    /// Store representation (`auto` picks JSON for `.json`, CSV otherwise).
    #[arg(long, value_enum, env = "PRICEWATCH_FORMAT", default_value_t = StorageFormat::Auto)]
    pub format: StorageFormat,

    /// Base directory for relative paths.
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// UTC offset defining the civil date (`utc`, `+03:00`, ...).
    #[arg(long, env = "PRICEWATCH_OFFSET", default_value = "+03:00", allow_hyphen_values = true)]
    pub offset: CivilOffset,

    /// Observations in the short statistics window.
    #[arg(long, env = "PRICEWATCH_SHORT_WINDOW", default_value = "7")]
    pub short_window: NonZeroUsize,

    /// Observations in the long statistics window.
    #[arg(long, env = "PRICEWATCH_LONG_WINDOW", default_value = "30")]
    pub long_window: NonZeroUsize,

    /// Report title.
    #[arg(long, env = "PRICEWATCH_TITLE", default_value = "Shell Diesel Price Report")]
    pub title: String,

    /// Location shown under the report title.
    #[arg(long, env = "PRICEWATCH_LOCATION", default_value = "Istanbul / Tuzla")]
    pub location: String,

    /// Currency symbol.
    #[arg(long, env = "PRICEWATCH_CURRENCY", default_value = "₺")]
    pub currency: String,

    /// Unit of volume the price refers to.
    #[arg(long, env = "PRICEWATCH_UNIT", default_value = "L")]
    pub unit: String,
}

/// Options for a full ingestion run.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Page holding the price.
    #[arg(long, env = "PRICEWATCH_URL", default_value = DEFAULT_SOURCE_URL)]
    pub url: String,

    /// CSS selector matching the candidate price cells.
    #[arg(long, env = "PRICEWATCH_SELECTOR", default_value = DEFAULT_PRICE_SELECTOR)]
    pub selector: String,

    /// Which selector match (0-based) holds the price.
    #[arg(long, env = "PRICEWATCH_INDEX", default_value_t = 1)]
    pub index: usize,

    /// Seconds to wait for the page before giving up.
    #[arg(long, env = "PRICEWATCH_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// User agent sent with the page request.
    #[arg(long, env = "PRICEWATCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Age after which a leftover lock file is considered abandoned.
    #[arg(long, env = "PRICEWATCH_LOCK_STALE_SECS", default_value_t = 3600)]
    pub lock_stale_secs: u64,

    /// Where to save the fetched page when the price cannot be extracted.
    #[arg(long, env = "PRICEWATCH_SNAPSHOT_DIR", default_value = "debug")]
    pub snapshot_dir: PathBuf,

    /// Do not save page snapshots.
    #[arg(long)]
    pub no_snapshot: bool,

    /// Record the price but print the report instead of mailing it.
    #[arg(long)]
    pub dry_run: bool,

    /// With `--dry-run`, write the report here instead of stdout.
    #[arg(long, value_name = "HTML", requires = "dry_run")]
    pub output: Option<PathBuf>,
}

/// Options for rendering from stored history.
#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Write the report here instead of stdout.
    #[arg(long, value_name = "HTML")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_deployment() {
        let cli = Cli::try_parse_from(["pricewatch", "run"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.index, 1);
        assert_eq!(args.timeout_secs, 30);
        assert_eq!(args.store.short_window.get(), 7);
        assert_eq!(args.store.long_window.get(), 30);
        assert_eq!(args.store.offset, CivilOffset::default());
        assert!(!args.dry_run);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(Cli::try_parse_from(["pricewatch", "stats", "--short-window", "0"]).is_err());
    }

    #[test]
    fn negative_offset_parses() {
        let cli = Cli::try_parse_from(["pricewatch", "stats", "--offset", "-05:00"]).unwrap();
        let Command::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(args.offset.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn output_requires_dry_run() {
        assert!(Cli::try_parse_from(["pricewatch", "run", "--output", "r.html"]).is_err());
        assert!(
            Cli::try_parse_from(["pricewatch", "run", "--dry-run", "--output", "r.html"]).is_ok()
        );
    }
}
