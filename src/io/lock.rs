//! Cooperative lock file around the store's critical section.
//!
//! Two overlapping runs would otherwise both load the pre-today state and the
//! second `persist` would clobber the first. The lock is a sibling file created
//! with `create_new`; it is removed when the guard drops.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::AppError;

/// Held lock on a record store. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Create the lock file at `path`.
    ///
    /// An existing lock older than `stale_after` is assumed to belong to a
    /// crashed run; it is broken and acquisition is retried once.
    pub fn acquire(path: PathBuf, stale_after: Duration) -> Result<Self, AppError> {
        match try_create(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let observed = fs::read_to_string(&path).unwrap_or_default();
                match lock_age(&path) {
                    Some(age) if age > stale_after => {
                        warn!(
                            path = %path.display(),
                            age_secs = age.as_secs(),
                            "breaking stale store lock"
                        );
                        break_stale(&path, &observed)?;
                        try_create(&path).map_err(|e| match e.kind() {
                            io::ErrorKind::AlreadyExists => held_error(&path),
                            _ => lock_error(&path, e),
                        })?;
                    }
                    _ => return Err(held_error(&path)),
                }
            }
            Err(e) => return Err(lock_error(&path, e)),
        }

        debug!(path = %path.display(), "store lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

fn try_create(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "pid={} acquired={}", std::process::id(), Utc::now().to_rfc3339())?;
    Ok(())
}

/// Move the stale lock aside, then make sure it is the one judged stale.
///
/// Another run may have broken the same lock and taken a fresh one in the
/// meantime; that fresh lock is linked back in place and left alone.
fn break_stale(path: &Path, observed: &str) -> Result<(), AppError> {
    let mut aside = path.as_os_str().to_os_string();
    aside.push(format!(".stale.{}", std::process::id()));
    let aside = PathBuf::from(aside);

    match fs::rename(path, &aside) {
        Ok(()) => {}
        // Someone else already broke it.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(AppError::storage(format!(
                "Failed to break stale lock '{}': {e}",
                path.display()
            )));
        }
    }

    let moved = fs::read_to_string(&aside).unwrap_or_default();
    if moved != observed {
        let _ = fs::hard_link(&aside, path);
        let _ = fs::remove_file(&aside);
        return Err(held_error(path));
    }

    fs::remove_file(&aside).map_err(|e| {
        AppError::storage(format!("Failed to remove stale lock '{}': {e}", aside.display()))
    })
}

fn lock_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

fn held_error(path: &Path) -> AppError {
    AppError::storage(format!(
        "Store is locked by another run ('{}' exists).",
        path.display()
    ))
}

fn lock_error(path: &Path, e: io::Error) -> AppError {
    AppError::storage(format!("Failed to create lock '{}': {e}", path.display()))
}
