//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging
//! - resolves the run configuration
//! - wires the page source, record store and notifier into the pipeline
//! - prints statistics or rendered reports for the read-only subcommands

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use crate::cli::{Command, RenderArgs, RunArgs, StoreArgs};
use crate::data::PageSource;
use crate::domain::{ReportLabels, SourceConfig, TrackerConfig};
use crate::error::AppError;
use crate::io::SeriesStore;
use crate::notify::{MailSettings, Notifier, SmtpNotifier};

pub mod pipeline;

/// Entry point for the `pricewatch` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // Scheduled jobs invoke plain `pricewatch`; make that mean `pricewatch run`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Stats(args) => handle_stats(args),
        Command::Render(args) => handle_render(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = config_from_run_args(&args);

    // Mail settings are checked before anything is observed or written.
    let notifier = if args.dry_run {
        None
    } else {
        Some(SmtpNotifier::new(MailSettings::from_env()?)?)
    };

    let source = PageSource::new(config.source.clone(), config.snapshot_dir.clone())?;
    let store = SeriesStore::new(&config.store_path, config.storage_format);

    info!(
        url = %config.source.url,
        store = %store.path().display(),
        format = ?store.format(),
        "starting price run"
    );

    let out = pipeline::run_ingestion(
        &config,
        &store,
        &source,
        notifier.as_ref().map(|n| n as &dyn Notifier),
        Utc::now(),
    )?;

    if args.dry_run {
        write_document(args.output.as_deref(), &out.document)?;
    }

    info!(
        "run complete: {}",
        crate::report::format_run_summary(&out.report, &config.labels, out.notified)
    );
    Ok(())
}

fn handle_stats(args: StoreArgs) -> Result<(), AppError> {
    let config = config_from_store_args(&args);
    let store = SeriesStore::new(&config.store_path, config.storage_format);
    let series = store.load();

    let (short, long) = pipeline::window_summaries(&series, &config);
    println!(
        "{}",
        crate::report::format_series_overview(
            series.latest(),
            short.as_ref(),
            long.as_ref(),
            series.len(),
            &config.labels,
        )
    );
    Ok(())
}

fn handle_render(args: RenderArgs) -> Result<(), AppError> {
    let config = config_from_store_args(&args.store);
    let store = SeriesStore::new(&config.store_path, config.storage_format);
    let series = store.load();

    let latest = series.latest().ok_or_else(|| {
        AppError::storage(format!(
            "No observations in '{}'; nothing to render.",
            store.path().display()
        ))
    })?;

    let report = pipeline::build_report(&series, latest, &config, Utc::now());
    let document = crate::report::render_html(&report, &config.labels);
    write_document(args.output.as_deref(), &document)
}

fn write_document(output: Option<&Path>, document: &str) -> Result<(), AppError> {
    match output {
        Some(path) => {
            fs::write(path, document).map_err(|e| {
                AppError::storage(format!("Failed to write report '{}': {e}", path.display()))
            })?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{document}"),
    }
    Ok(())
}

pub fn config_from_store_args(args: &StoreArgs) -> TrackerConfig {
    TrackerConfig {
        store_path: resolve_path(args.workspace.as_deref(), &args.store),
        storage_format: args.format,
        civil_offset: args.offset,
        short_window: args.short_window,
        long_window: args.long_window,
        labels: ReportLabels {
            title: args.title.clone(),
            location: args.location.clone(),
            currency: args.currency.clone(),
            unit: args.unit.clone(),
        },
        ..TrackerConfig::default()
    }
}

pub fn config_from_run_args(args: &RunArgs) -> TrackerConfig {
    let base = config_from_store_args(&args.store);
    let snapshot_dir = (!args.no_snapshot)
        .then(|| resolve_path(args.store.workspace.as_deref(), &args.snapshot_dir));

    TrackerConfig {
        source: SourceConfig {
            url: args.url.clone(),
            selector: args.selector.clone(),
            index: args.index,
            timeout: Duration::from_secs(args.timeout_secs),
            user_agent: args.user_agent.clone(),
        },
        lock_stale_after: Duration::from_secs(args.lock_stale_secs),
        snapshot_dir,
        ..base
    }
}

fn resolve_path(workspace: Option<&Path>, path: &Path) -> PathBuf {
    match workspace {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// Rewrite argv so `pricewatch` defaults to `pricewatch run`.
///
/// Rules:
/// - `pricewatch`                      -> `pricewatch run`
/// - `pricewatch --dry-run ...`        -> `pricewatch run --dry-run ...`
/// - `pricewatch --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "stats" | "render");
    if is_subcommand {
        return argv;
    }

    // A leading flag is treated as a `run` flag.
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::StorageFormat;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_means_run() {
        assert_eq!(rewrite_args(args(&["pricewatch"])), args(&["pricewatch", "run"]));
        assert_eq!(
            rewrite_args(args(&["pricewatch", "--dry-run"])),
            args(&["pricewatch", "run", "--dry-run"])
        );
        assert_eq!(
            rewrite_args(args(&["pricewatch", "stats"])),
            args(&["pricewatch", "stats"])
        );
        assert_eq!(
            rewrite_args(args(&["pricewatch", "--help"])),
            args(&["pricewatch", "--help"])
        );
    }

    #[test]
    fn run_args_resolve_into_config() {
        let cli = Cli::try_parse_from([
            "pricewatch",
            "run",
            "--workspace",
            "/work",
            "--store",
            "data/prices.json",
            "--offset",
            "utc",
            "--long-window",
            "14",
            "--no-snapshot",
            "--timeout-secs",
            "5",
        ])
        .unwrap();
        let Command::Run(run_args) = cli.command else {
            panic!("expected run");
        };

        let config = config_from_run_args(&run_args);
        assert_eq!(config.store_path, PathBuf::from("/work/data/prices.json"));
        assert_eq!(config.storage_format, StorageFormat::Auto);
        assert_eq!(config.civil_offset, crate::domain::CivilOffset::utc());
        assert_eq!(config.long_window.get(), 14);
        assert_eq!(config.short_window.get(), 7);
        assert_eq!(config.source.timeout, Duration::from_secs(5));
        assert!(config.snapshot_dir.is_none());
    }

    #[test]
    fn absolute_store_ignores_workspace() {
        assert_eq!(
            resolve_path(Some(Path::new("/work")), Path::new("/var/prices.csv")),
            PathBuf::from("/var/prices.csv")
        );
        assert_eq!(
            resolve_path(None, Path::new("prices.csv")),
            PathBuf::from("prices.csv")
        );
    }
}
