//! HTML mail body.

use std::fmt::Write;

use crate::domain::{ReportLabels, Summary};
use crate::report::{Report, Trend};

const ACCENT: &str = "#DD1D21";
const UP: &str = "#d32f2f";
const DOWN: &str = "#388e3c";

/// Mail subject for a report.
pub fn subject_line(report: &Report, labels: &ReportLabels) -> String {
    format!(
        "🔔 {} - {}",
        labels.title,
        report.generated_at.format("%d.%m.%Y %H:%M:%S")
    )
}

/// Render the full HTML document.
pub fn render_html(report: &Report, labels: &ReportLabels) -> String {
    let currency = escape(&labels.currency);
    let mut out = String::new();

    out.push_str("<html>\n<body style=\"font-family: Arial, sans-serif;\">\n");

    let _ = write!(
        out,
        "<div style=\"background-color: {ACCENT}; color: white; padding: 20px; border-radius: 5px;\">\n\
         <h1 style=\"margin: 0;\">🔔 {}</h1>\n\
         <p style=\"margin: 10px 0 0 0;\">{} - {}</p>\n\
         </div>\n",
        escape(&labels.title),
        escape(&labels.location),
        report.generated_at.format("%d.%m.%Y %H:%M:%S"),
    );

    out.push_str("<div style=\"padding: 20px;\">\n");
    let _ = write!(
        out,
        "<h2 style=\"color: #333;\">Current price</h2>\n\
         <div style=\"font-size: 48px; font-weight: bold; color: {ACCENT}; margin: 20px 0;\">{:.2} {currency}/{}</div>\n",
        report.price,
        escape(&labels.unit),
    );

    window_section(&mut out, report.price, &report.short, &currency);
    window_section(&mut out, report.price, &report.long, &currency);

    let _ = write!(
        out,
        "<div style=\"margin-top: 40px; padding: 15px; background-color: #f9f9f9; border-left: 4px solid {ACCENT}; border-radius: 4px;\">\n\
         <p style=\"margin: 0; color: #666; font-size: 13px;\">📅 Tracked for <strong>{}</strong> day(s)</p>\n\
         </div>\n",
        report.total_days,
    );

    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn window_section(out: &mut String, price: f64, summary: &Summary, currency: &str) {
    let trend = Trend::of(price, summary);
    let color = match trend {
        Trend::Above => UP,
        Trend::AtOrBelow => DOWN,
    };
    let delta = summary.delta_from_average(price);

    let _ = write!(
        out,
        "<h2 style=\"color: #333; margin-top: 40px;\">📊 Last {n} day(s)</h2>\n\
         <p style=\"color: #666; margin-top: -15px; font-size: 14px;\">{start} - {end}</p>\n\
         <div style=\"background: linear-gradient(to right, #f5f5f5, #e8e8e8); padding: 20px; border-radius: 8px; margin: 15px 0;\">\n\
         <table style=\"width: 100%; border-collapse: collapse;\">\n\
         <tr><td style=\"padding: 8px; font-weight: bold;\">Average:</td><td style=\"padding: 8px; text-align: right;\">{avg:.2} {currency}</td></tr>\n\
         <tr><td style=\"padding: 8px; font-weight: bold;\">High:</td><td style=\"padding: 8px; text-align: right; color: {UP};\">{max:.2} {currency}</td></tr>\n\
         <tr><td style=\"padding: 8px; font-weight: bold;\">Low:</td><td style=\"padding: 8px; text-align: right; color: {DOWN};\">{min:.2} {currency}</td></tr>\n\
         </table>\n\
         <p style=\"margin: 15px 0 0 0; padding-top: 15px; border-top: 1px solid #ddd; color: #666; font-size: 14px;\">\
         {marker} Today's price vs. the {n}-day average: <strong style=\"color: {color};\">{delta:+.2} {currency}</strong></p>\n\
         </div>\n",
        n = summary.sample_count,
        start = summary.window_start.format("%d.%m.%Y"),
        end = summary.window_end.format("%d.%m.%Y"),
        avg = summary.average,
        max = summary.max,
        min = summary.min,
        marker = trend.marker(),
    );
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
