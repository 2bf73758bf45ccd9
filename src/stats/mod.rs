//! Windowed statistics over the price series.
//!
//! Rounding policy: aggregates are rounded to 2 fractional digits with
//! round-half-away-from-zero (`10.125 -> 10.13`). Prices are taken at their
//! shortest decimal form and the mean is computed in `Decimal`, so a flat
//! window always yields `average == max == min`.

use std::num::NonZeroUsize;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{Observation, PriceSeries, Summary};

/// Summarize the most recent `window` observations.
///
/// Returns `None` when the series is empty. Otherwise the sample holds
/// `min(window, series.len())` observations, ending at the latest date.
pub fn summarize(series: &PriceSeries, window: NonZeroUsize) -> Option<Summary> {
    let skip = series.len().saturating_sub(window.get());
    let sample: Vec<Observation> = series.iter().skip(skip).collect();

    let first = *sample.first()?;
    let last = *sample.last()?;
    let max = round2(sample.iter().map(|o| o.price).fold(f64::MIN, f64::max));
    let min = round2(sample.iter().map(|o| o.price).fold(f64::MAX, f64::min));

    let average = match decimal_mean(&sample) {
        Some(mean) => from_decimal(round_decimal(mean)),
        // Only reachable for prices outside `Decimal`'s range.
        None => {
            let sum: f64 = sample.iter().map(|o| o.price).sum();
            round2(sum / sample.len() as f64).clamp(min, max)
        }
    };

    Some(Summary {
        average,
        max,
        min,
        sample_count: sample.len(),
        window_start: first.date,
        window_end: last.date,
    })
}

/// Round to 2 fractional digits, halves away from zero.
pub fn round2(value: f64) -> f64 {
    match to_decimal(value) {
        Some(d) => from_decimal(round_decimal(d)),
        None => (value * 100.0).round() / 100.0,
    }
}

fn decimal_mean(sample: &[Observation]) -> Option<Decimal> {
    let mut sum = Decimal::ZERO;
    for obs in sample {
        sum = sum.checked_add(to_decimal(obs.price)?)?;
    }
    sum.checked_div(Decimal::from(sample.len()))
}

/// `f64` to `Decimal` through its shortest round-trip representation.
fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    value.to_string().parse().ok()
}

fn round_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Exact for values already rounded to 2 digits: both operands are integral
/// `f64`s, so the division is correctly rounded.
fn from_decimal(value: Decimal) -> f64 {
    value.mantissa() as f64 / 10f64.powi(value.scale() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn w(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn three_days() -> PriceSeries {
        PriceSeries::new()
            .upsert(d(1), 10.0)
            .upsert(d(2), 12.0)
            .upsert(d(3), 11.0)
    }

    #[test]
    fn summarize_scenario_three_days_week_window() {
        let s = summarize(&three_days(), w(7)).unwrap();
        assert_eq!(s.average, 11.0);
        assert_eq!(s.max, 12.0);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.sample_count, 3);
        assert_eq!(s.window_start, d(1));
        assert_eq!(s.window_end, d(3));
    }

    #[test]
    fn summarize_takes_most_recent_entries() {
        let s = summarize(&three_days(), w(2)).unwrap();
        assert_eq!(s.sample_count, 2);
        assert_eq!(s.window_start, d(2));
        assert_eq!(s.window_end, d(3));
        assert_eq!(s.average, 11.5);
        assert_eq!(s.min, 11.0);
    }

    #[test]
    fn summarize_empty_is_no_data() {
        assert!(summarize(&PriceSeries::new(), w(7)).is_none());
    }

    #[test]
    fn round2_halves_go_away_from_zero() {
        assert_eq!(round2(10.125), 10.13);
        assert_eq!(round2(-10.125), -10.13);
        assert_eq!(round2(10.375), 10.38);
        assert_eq!(round2(44.5625), 44.56);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn average_is_rounded_after_the_mean() {
        let series = PriceSeries::new()
            .upsert(d(1), 10.0)
            .upsert(d(2), 10.0)
            .upsert(d(3), 10.01);
        // 30.01 / 3 = 10.00333..
        assert_eq!(summarize(&series, w(30)).unwrap().average, 10.0);
    }

    fn flat(days: usize, price: f64) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..days)
            .map(|i| (base + chrono::Days::new(i as u64), price))
            .collect()
    }

    #[test]
    fn flat_window_on_half_cent_boundary_stays_flat() {
        for (days, price, expected) in [
            (7, 40.015, 40.02),
            (7, 40.035, 40.04),
            (30, 40.045, 40.05),
            (10, 1.015, 1.02),
        ] {
            let s = summarize(&flat(days, price), w(30)).unwrap();
            assert_eq!(s.average, expected, "{days} x {price}");
            assert_eq!(s.max, expected, "{days} x {price}");
            assert_eq!(s.min, expected, "{days} x {price}");
        }
    }

    #[test]
    fn round2_uses_the_written_decimal_value() {
        // 1.015 and 40.015 sit just below the half in binary.
        assert_eq!(round2(1.015), 1.02);
        assert_eq!(round2(40.015), 40.02);
        assert_eq!(round2(2.675), 2.68);
    }

    fn arb_series() -> impl Strategy<Value = PriceSeries> {
        prop::collection::btree_map(0u32..400, 0.01f64..500.0, 1..60).prop_map(|m| {
            let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
            m.into_iter()
                .map(|(offset, price)| (base + chrono::Days::new(offset as u64), price))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn sample_count_is_bounded_by_window(series in arb_series(), n in 1usize..90) {
            let s = summarize(&series, w(n)).unwrap();
            prop_assert_eq!(s.sample_count, n.min(series.len()));
            prop_assert!(s.window_start <= s.window_end);
            prop_assert_eq!(s.window_end, series.latest().unwrap().date);
        }

        #[test]
        fn aggregates_are_ordered(series in arb_series(), n in 1usize..90) {
            let s = summarize(&series, w(n)).unwrap();
            prop_assert!(s.min <= s.average);
            prop_assert!(s.average <= s.max);
        }

        #[test]
        fn flat_prices_collapse_aggregates(days in 1usize..40, price in 0.01f64..500.0) {
            let s = summarize(&flat(days, price), w(30)).unwrap();
            prop_assert_eq!(s.min, s.max);
            prop_assert_eq!(s.average, s.max);
        }
    }
}
