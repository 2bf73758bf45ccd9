//! The ingestion pipeline shared by `pricewatch run` and its dry-run mode.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! observe -> upsert + persist -> summarize (short/long windows) -> render -> notify
//!
//! The run is a straight line through `Stage`s. Any failure ends it in the
//! `FAILED` state, reported as a `PipelineFailure` carrying the stage it
//! happened in. Nothing is retried here; the scheduler is the retry mechanism.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn};

use crate::data::{PriceSource, validate_price};
use crate::domain::{Observation, PriceSeries, Summary, TrackerConfig};
use crate::error::AppError;
use crate::io::SeriesStore;
use crate::notify::Notifier;
use crate::report::{Report, render_html, subject_line};
use crate::stats::summarize;

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Observing,
    Persisting,
    Summarizing,
    Reporting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "START",
            Stage::Observing => "OBSERVING",
            Stage::Persisting => "PERSISTING",
            Stage::Summarizing => "SUMMARIZING",
            Stage::Reporting => "REPORTING",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Terminal `FAILED` state: the stage that failed and why.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: AppError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FAILED during {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PipelineFailure> for AppError {
    fn from(failure: PipelineFailure) -> Self {
        failure.error
    }
}

/// All computed outputs of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observation: Observation,
    /// Series state after the upsert, as persisted.
    pub series: PriceSeries,
    pub report: Report,
    /// Rendered HTML document.
    pub document: String,
    /// Whether the document was handed to a notifier.
    pub notified: bool,
}

/// Execute one full ingestion run.
///
/// `notifier = None` renders the report without dispatching it (dry run).
/// `now` fixes the civil date and report timestamp for the whole run.
pub fn run_ingestion(
    config: &TrackerConfig,
    store: &SeriesStore,
    source: &dyn PriceSource,
    notifier: Option<&dyn Notifier>,
    now: DateTime<Utc>,
) -> Result<RunOutput, PipelineFailure> {
    let today = config.civil_offset.date_of(now);
    let span = info_span!("ingest", %today, offset = %config.civil_offset);
    let _entered = span.enter();

    enter(Stage::Start);

    // 1) Observe today's price.
    enter(Stage::Observing);
    let price = source
        .observe()
        .and_then(validate_price)
        .map_err(|e| fail(Stage::Observing, as_observation_failure(e)))?;
    let observation = Observation { date: today, price };

    // 2) Upsert + persist under the store lock.
    enter(Stage::Persisting);
    let series = ingest(config, store, observation).map_err(|e| fail(Stage::Persisting, e))?;

    // 3) Short/long window statistics.
    enter(Stage::Summarizing);
    let report = build_report(&series, observation, config, now);

    // 4) Render + dispatch.
    enter(Stage::Reporting);
    let document = render_html(&report, &config.labels);
    let notified = match notifier {
        Some(notifier) => {
            let subject = subject_line(&report, &config.labels);
            notifier
                .send(&subject, &document)
                .map_err(|e| fail(Stage::Reporting, e))?;
            true
        }
        None => {
            info!("dry run: notification skipped");
            false
        }
    };

    enter(Stage::Done);
    Ok(RunOutput {
        observation,
        series,
        report,
        document,
        notified,
    })
}

/// Both window summaries for a series; `None` when the series is empty.
pub fn window_summaries(
    series: &PriceSeries,
    config: &TrackerConfig,
) -> (Option<Summary>, Option<Summary>) {
    (
        summarize(series, config.short_window),
        summarize(series, config.long_window),
    )
}

/// Assemble the report for `observation` against `series`.
///
/// An empty series (cannot happen after an upsert, but the renderer never
/// receives "no data") falls back to a single-point summary of `observation`.
pub fn build_report(
    series: &PriceSeries,
    observation: Observation,
    config: &TrackerConfig,
    now: DateTime<Utc>,
) -> Report {
    let (short, long) = window_summaries(series, config);
    let fallback = Summary::single_point(observation);

    Report {
        price: observation.price,
        short: short.unwrap_or(fallback),
        long: long.unwrap_or(fallback),
        total_days: series.len().max(1),
        generated_at: config.civil_offset.localize(now),
    }
}

fn ingest(
    config: &TrackerConfig,
    store: &SeriesStore,
    observation: Observation,
) -> Result<PriceSeries, AppError> {
    let _lock = store.lock(config.lock_stale_after)?;

    let before = store.load();
    if let Some(previous) = before.get(observation.date) {
        warn!(
            date = %observation.date,
            previous,
            price = observation.price,
            "date already recorded; replacing its price"
        );
    }

    let series = before.upsert(observation.date, observation.price);
    store.persist(&series)?;

    info!(
        date = %observation.date,
        price = observation.price,
        total_days = series.len(),
        path = %store.path().display(),
        "observation stored"
    );
    Ok(series)
}

fn as_observation_failure(e: AppError) -> AppError {
    match e {
        AppError::ObservationFailed(_) => e,
        other => AppError::observation(other.to_string()),
    }
}

fn enter(stage: Stage) {
    info!(%stage, "pipeline stage");
}

fn fail(stage: Stage, error: AppError) -> PipelineFailure {
    tracing::error!(%stage, %error, "pipeline failed");
    PipelineFailure { stage, error }
}
