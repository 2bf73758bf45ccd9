//! Durable record store for the price series.
//!
//! Two on-disk forms are supported, one per file:
//!
//! - CSV: `date,price` header, one row per date, ascending
//! - JSON: `{ "2024-01-01": 44.56, ... }`, keys ascending
//!
//! `load` never fails: a missing file is an empty history, and an unreadable
//! one is logged and also treated as empty. `persist` replaces the whole file
//! atomically (temp file in the same directory, then rename).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{PriceSeries, StorageFormat, is_valid_price};
use crate::error::AppError;
use crate::io::lock::StoreLock;

/// File-backed price series.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    path: PathBuf,
    format: StorageFormat,
}

impl SeriesStore {
    /// `StorageFormat::Auto` is resolved here from the file extension.
    pub fn new(path: impl Into<PathBuf>, format: StorageFormat) -> Self {
        let path = path.into();
        let format = format.resolve(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// Take the cooperative lock guarding load → upsert → persist.
    pub fn lock(&self, stale_after: Duration) -> Result<StoreLock, AppError> {
        StoreLock::acquire(lock_path_for(&self.path), stale_after)
    }

    /// Read the stored series, degrading to empty on any read failure.
    pub fn load(&self) -> PriceSeries {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no store on disk; starting from empty history");
            return PriceSeries::new();
        }

        let result = match self.format {
            StorageFormat::Json => read_json(&self.path),
            StorageFormat::Csv | StorageFormat::Auto => read_csv(&self.path),
        };

        match result {
            Ok(series) => {
                debug!(path = %self.path.display(), entries = series.len(), "store loaded");
                series
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "store is unreadable; continuing with empty history"
                );
                PriceSeries::new()
            }
        }
    }

    /// Replace the stored series with `series`.
    ///
    /// On failure the previous file content is left untouched.
    pub fn persist(&self, series: &PriceSeries) -> Result<(), AppError> {
        let tmp_path = temp_path_for(&self.path);

        let written = write_to(&tmp_path, series, self.format)
            .and_then(|()| fs::rename(&tmp_path, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(AppError::storage(format!(
                "Failed to persist store '{}': {e}",
                self.path.display()
            )));
        }

        debug!(path = %self.path.display(), entries = series.len(), "store persisted");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

fn lock_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".lock")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn write_to(path: &Path, series: &PriceSeries, format: StorageFormat) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    match format {
        StorageFormat::Json => {
            serde_json::to_writer_pretty(&mut out, series).map_err(io::Error::other)?;
            out.write_all(b"\n")?;
        }
        StorageFormat::Csv | StorageFormat::Auto => {
            let mut writer = csv::Writer::from_writer(&mut out);
            writer.write_record(["date", "price"]).map_err(io::Error::other)?;
            for obs in series.iter() {
                writer
                    .write_record([obs.date.to_string(), obs.price.to_string()])
                    .map_err(io::Error::other)?;
            }
            writer.flush()?;
        }
    }

    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn read_csv(path: &Path) -> Result<PriceSeries, String> {
    let file = File::open(path).map_err(|e| format!("open failed: {e}"))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1, records are 1-based.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "skipping unparseable store row");
                continue;
            }
        };

        match parse_entry(record.get(0).unwrap_or(""), record.get(1).unwrap_or("")) {
            Ok(entry) => rows.push(entry),
            Err(e) => warn!(line, error = %e, "skipping invalid store row"),
        }
    }

    Ok(collect_entries(rows))
}

fn read_json(path: &Path) -> Result<PriceSeries, String> {
    let file = File::open(path).map_err(|e| format!("open failed: {e}"))?;
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_reader(io::BufReader::new(file))
        .map_err(|e| format!("invalid JSON: {e}"))?;

    let mut rows = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let price = match value.as_f64() {
            Some(p) => p.to_string(),
            None => value.to_string(),
        };
        match parse_entry(&key, &price) {
            Ok(entry) => rows.push(entry),
            Err(e) => warn!(key = %key, error = %e, "skipping invalid store entry"),
        }
    }

    Ok(collect_entries(rows))
}

fn parse_entry(date: &str, price: &str) -> Result<(NaiveDate, f64), String> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{date}': {e}"))?;
    let price: f64 = price
        .parse()
        .map_err(|_| format!("invalid price '{price}'"))?;
    if !is_valid_price(price) {
        return Err(format!("price {price} is not positive and finite"));
    }
    Ok((date, price))
}

/// Duplicate dates keep the last row.
fn collect_entries(rows: Vec<(NaiveDate, f64)>) -> PriceSeries {
    let total = rows.len();
    let series: PriceSeries = rows.into_iter().collect();
    if series.len() < total {
        warn!(
            duplicates = total - series.len(),
            "store contained duplicate dates; kept the last value for each"
        );
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> PriceSeries {
        PriceSeries::new()
            .upsert(d(2), 12.0)
            .upsert(d(1), 10.0)
            .upsert(d(3), 44.567)
    }

    #[test]
    fn csv_round_trip_and_sorted_rows() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path().join("prices.csv"), StorageFormat::Auto);
        assert_eq!(store.format(), StorageFormat::Csv);

        store.persist(&sample()).unwrap();
        assert_eq!(store.load(), sample());

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "date,price\n2024-01-01,10\n2024-01-02,12\n2024-01-03,44.567\n");
    }

    #[test]
    fn json_round_trip_uses_keyed_form() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path().join("prices.json"), StorageFormat::Auto);
        assert_eq!(store.format(), StorageFormat::Json);

        store.persist(&sample()).unwrap();
        assert_eq!(store.load(), sample());

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["2024-01-02"], serde_json::json!(12.0));
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path().join("absent.csv"), StorageFormat::Csv);
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_json_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prices.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(SeriesStore::new(path, StorageFormat::Json).load().is_empty());
    }

    #[test]
    fn csv_skips_bad_rows_and_keeps_last_duplicate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prices.csv");
        fs::write(
            &path,
            "date,price\n2024-01-01,10\nyesterday,11\n2024-01-02,-3\n2024-01-03,abc\n2024-01-01,10.5\n",
        )
        .unwrap();

        let series = SeriesStore::new(path, StorageFormat::Csv).load();
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(d(1)), Some(10.5));
    }

    #[test]
    fn persist_into_missing_directory_fails_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("prices.csv");
        let store = SeriesStore::new(&path, StorageFormat::Csv);

        let err = store.persist(&sample()).unwrap_err();
        assert!(matches!(err, AppError::StorageFailed(_)));
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn failed_persist_keeps_previous_state() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path().join("prices.csv"), StorageFormat::Csv);
        let before = PriceSeries::new().upsert(d(1), 10.0);
        store.persist(&before).unwrap();

        // A directory in the temp file's place makes the write fail.
        fs::create_dir(temp_path_for(store.path())).unwrap();

        let err = store.persist(&before.clone().upsert(d(2), 11.0)).unwrap_err();
        assert!(matches!(err, AppError::StorageFailed(_)));
        assert_eq!(store.load(), before);
    }

    #[test]
    fn persist_replaces_previous_content_wholesale() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path().join("prices.csv"), StorageFormat::Csv);

        store.persist(&sample()).unwrap();
        let smaller = PriceSeries::new().upsert(d(9), 1.25);
        store.persist(&smaller).unwrap();

        assert_eq!(store.load(), smaller);
        assert!(!temp_path_for(store.path()).exists());
    }

    #[test]
    fn sibling_paths_keep_the_full_file_name() {
        let path = Path::new("/data/motorin_fiyatlari.csv");
        assert_eq!(temp_path_for(path), PathBuf::from("/data/motorin_fiyatlari.csv.tmp"));
        assert_eq!(lock_path_for(path), PathBuf::from("/data/motorin_fiyatlari.csv.lock"));
    }

    fn arb_series() -> impl Strategy<Value = PriceSeries> {
        prop::collection::btree_map(0u32..3000, 0.001f64..10_000.0, 0..40).prop_map(|m| {
            let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            m.into_iter()
                .map(|(offset, price)| (base + chrono::Days::new(offset as u64), price))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn load_after_persist_is_identity(series in arb_series(), json in any::<bool>()) {
            let tmp = TempDir::new().unwrap();
            let name = if json { "s.json" } else { "s.csv" };
            let store = SeriesStore::new(tmp.path().join(name), StorageFormat::Auto);
            store.persist(&series).unwrap();
            prop_assert_eq!(store.load(), series);
        }

        #[test]
        fn upsert_is_idempotent_per_date(
            series in arb_series(),
            offset in 0u32..3000,
            p1 in 0.01f64..1000.0,
            p2 in 0.01f64..1000.0,
        ) {
            let date =
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(offset as u64);
            let twice = series.clone().upsert(date, p1).upsert(date, p2);
            let once = series.upsert(date, p2);
            prop_assert_eq!(twice, once);
        }
    }
}
