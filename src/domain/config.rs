//! Run configuration.
//!
//! `TrackerConfig` is the one place where storage, date policy, windowing and
//! source settings come together. It is built from CLI arguments (with `.env`
//! / environment fallbacks) in `app::config_from_run_args`.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::ValueEnum;

pub const DEFAULT_SOURCE_URL: &str = "https://www.doviz.com/akaryakit-fiyatlari/istanbul-anadolu/tuzla/shell";
pub const DEFAULT_PRICE_SELECTOR: &str = "td.text-bold.p-12.text-center";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const DEFAULT_SHORT_WINDOW: NonZeroUsize = NonZeroUsize::new(7).unwrap();
const DEFAULT_LONG_WINDOW: NonZeroUsize = NonZeroUsize::new(30).unwrap();

/// On-disk representation of the record store.
///
/// `Auto` means: `.json` files use the keyed form, anything else is CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageFormat {
    Auto,
    /// Rows of `date,price`, unique by date, sorted ascending.
    Csv,
    /// Object mapping ISO date strings to prices.
    Json,
}

impl StorageFormat {
    /// Resolve `Auto` against the store path. Concrete formats pass through.
    pub fn resolve(self, path: &Path) -> StorageFormat {
        match self {
            StorageFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => StorageFormat::Json,
                _ => StorageFormat::Csv,
            },
            other => other,
        }
    }
}

/// Fixed UTC offset that defines the civil date used as the series key.
///
/// Parsed from `utc`, `z`, `+03:00`, `+0300`, `+3` or `-05:30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilOffset(FixedOffset);

impl CivilOffset {
    pub fn utc() -> Self {
        Self(FixedOffset::east_opt(0).expect("zero offset is in range"))
    }

    pub fn from_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(Self)
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Wall-clock time at this offset for a UTC instant.
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.0)
    }

    /// Civil date at this offset for a UTC instant.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date_naive()
    }
}

impl Default for CivilOffset {
    fn default() -> Self {
        Self::from_hours(3).expect("+03:00 is in range")
    }
}

impl fmt::Display for CivilOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CivilOffset {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
            return Ok(Self::utc());
        }

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(format!("Invalid offset '{raw}'. Expected `utc` or `+HH:MM`.")),
        };

        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 => rest.split_at(2),
            None => (rest, "0"),
        };

        let hours: i32 = hours
            .parse()
            .map_err(|_| format!("Invalid offset hours in '{raw}'."))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| format!("Invalid offset minutes in '{raw}'."))?;
        if !(0..60).contains(&minutes) {
            return Err(format!("Invalid offset minutes in '{raw}'."));
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self)
            .ok_or_else(|| format!("Offset '{raw}' is out of range."))
    }
}

/// Where and how to read the price.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub url: String,
    /// CSS selector matching the candidate price cells.
    pub selector: String,
    /// Which match (0-based) holds the tracked price.
    pub index: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            selector: DEFAULT_PRICE_SELECTOR.to_string(),
            index: 1,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Human-facing labels used by the report renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLabels {
    pub title: String,
    pub location: String,
    pub currency: String,
    pub unit: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            title: "Shell Diesel Price Report".to_string(),
            location: "Istanbul / Tuzla".to_string(),
            currency: "₺".to_string(),
            unit: "L".to_string(),
        }
    }
}

/// Complete configuration for one tracker run.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub store_path: PathBuf,
    pub storage_format: StorageFormat,
    pub civil_offset: CivilOffset,
    pub short_window: NonZeroUsize,
    pub long_window: NonZeroUsize,
    pub source: SourceConfig,
    pub labels: ReportLabels,
    /// Lock files older than this are treated as abandoned.
    pub lock_stale_after: Duration,
    /// Directory for page snapshots on extraction failure (`None` disables).
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("motorin_fiyatlari.csv"),
            storage_format: StorageFormat::Auto,
            civil_offset: CivilOffset::default(),
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
            source: SourceConfig::default(),
            labels: ReportLabels::default(),
            lock_stale_after: Duration::from_secs(3600),
            snapshot_dir: Some(PathBuf::from("debug")),
        }
    }
}
