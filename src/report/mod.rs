//! Report rendering: the HTML document that gets mailed, plus terminal output.
//!
//! Renderers are pure functions of a `Report`; nothing here touches the store
//! or the network.

pub mod format;
pub mod html;

pub use format::*;
pub use html::*;

use chrono::{DateTime, FixedOffset};

use crate::domain::Summary;

/// Everything a rendered report shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub price: f64,
    pub short: Summary,
    pub long: Summary,
    /// Number of days in the whole series.
    pub total_days: usize,
    /// Civil time of the run.
    pub generated_at: DateTime<FixedOffset>,
}

/// Direction of today's price relative to a window average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Above,
    AtOrBelow,
}

impl Trend {
    pub fn of(price: f64, summary: &Summary) -> Self {
        if price > summary.average { Trend::Above } else { Trend::AtOrBelow }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Trend::Above => "📈",
            Trend::AtOrBelow => "📉",
        }
    }
}
