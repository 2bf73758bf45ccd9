//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built up in memory during a run
//! - written to the record store (`PriceSeries` serializes as a keyed map)
//! - handed to the report renderer unchanged

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// Prices must be positive and finite to enter the series.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// One day's recorded price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub price: f64,
}

/// Date-keyed price history.
///
/// Keys are unique and iteration is always ascending by date, so consumers
/// never have to sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    entries: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the price for `date`, producing the next state.
    ///
    /// Re-ingesting a date keeps exactly one entry holding the latest value.
    #[must_use]
    pub fn upsert(mut self, date: NaiveDate, price: f64) -> Self {
        self.entries.insert(date, price);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.entries.get(&date).copied()
    }

    /// Most recent observation by date.
    pub fn latest(&self) -> Option<Observation> {
        self.entries
            .last_key_value()
            .map(|(date, price)| Observation { date: *date, price: *price })
    }

    /// Observations in ascending date order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Observation> + ExactSizeIterator + '_ {
        self.entries
            .iter()
            .map(|(date, price)| Observation { date: *date, price: *price })
    }
}

impl FromIterator<(NaiveDate, f64)> for PriceSeries {
    /// Later pairs win on duplicate dates.
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Aggregates over the most recent `sample_count` observations.
///
/// `average`, `max` and `min` are already rounded to 2 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub sample_count: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

impl Summary {
    /// Summary of a lone observation: every aggregate equals `price`.
    pub fn single_point(observation: Observation) -> Self {
        let price = crate::stats::round2(observation.price);
        Self {
            average: price,
            max: price,
            min: price,
            sample_count: 1,
            window_start: observation.date,
            window_end: observation.date,
        }
    }

    /// Distance between the window's high and low.
    pub fn span(&self) -> f64 {
        crate::stats::round2(self.max - self.min)
    }

    /// Signed difference of `price` from the window average.
    pub fn delta_from_average(&self, price: f64) -> f64 {
        crate::stats::round2(price - self.average)
    }
}
