//! Plain-text formatting for terminal output.
//!
//! We keep formatting code in one place so the pipeline and the store stay free
//! of presentation details.

use crate::domain::{Observation, ReportLabels, Summary};
use crate::report::{Report, Trend};

/// Format the stored-series overview printed by `pricewatch stats`.
pub fn format_series_overview(
    latest: Option<Observation>,
    short: Option<&Summary>,
    long: Option<&Summary>,
    total_days: usize,
    labels: &ReportLabels,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", labels.title));
    out.push_str(&format!("Tracked days: {total_days}\n"));

    let Some(latest) = latest else {
        out.push_str("No observations recorded yet.\n");
        return out;
    };

    out.push_str(&format!(
        "Latest: {:.2} {} ({})\n\n",
        latest.price, labels.currency, latest.date
    ));

    out.push_str(&format_table_header());
    for summary in [short, long].into_iter().flatten() {
        out.push_str(&format_table_row(summary, latest.price));
    }

    out
}

/// One-paragraph completion summary for a finished run.
pub fn format_run_summary(report: &Report, labels: &ReportLabels, notified: bool) -> String {
    format!(
        "price={:.2} {} | tracked_days={} | short_avg={:.2} | long_avg={:.2} | notification={}",
        report.price,
        labels.currency,
        report.total_days,
        report.short.average,
        report.long.average,
        if notified { "sent" } else { "skipped" },
    )
}

fn format_table_header() -> String {
    let mut out = format!(
        "{:<8} {:<23} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
        "window", "dates", "average", "high", "low", "span", "delta"
    );
    out.push_str(&format!(
        "{:-<8} {:-<23} {:-<9} {:-<9} {:-<9} {:-<9} {:-<9}\n",
        "", "", "", "", "", "", ""
    ));
    out
}

fn format_table_row(summary: &Summary, price: f64) -> String {
    format!(
        "{:<8} {:<23} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>8.2}{}\n",
        format!("{}d", summary.sample_count),
        format!("{}..{}", summary.window_start, summary.window_end),
        summary.average,
        summary.max,
        summary.min,
        summary.span(),
        summary.delta_from_average(price),
        match Trend::of(price, summary) {
            Trend::Above => "+",
            Trend::AtOrBelow => " ",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary() -> Summary {
        Summary {
            average: 11.0,
            max: 12.0,
            min: 10.0,
            sample_count: 3,
            window_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            window_end: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        }
    }

    #[test]
    fn overview_of_empty_series() {
        let text = format_series_overview(None, None, None, 0, &ReportLabels::default());
        assert!(text.contains("Tracked days: 0"));
        assert!(text.contains("No observations recorded yet."));
    }

    #[test]
    fn overview_lists_each_window() {
        let s = summary();
        let latest = Observation {
            date: s.window_end,
            price: 11.0,
        };
        let text =
            format_series_overview(Some(latest), Some(&s), Some(&s), 3, &ReportLabels::default());
        assert!(text.contains("Latest: 11.00 ₺ (2024-01-03)"));
        assert_eq!(text.matches("2024-01-01..2024-01-03").count(), 2);
        assert!(text.contains("2.00"));
    }
}
