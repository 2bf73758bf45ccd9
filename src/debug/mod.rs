//! Debug artifacts for inspecting failed observations.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::AppError;

/// Write the fetched page to `<dir>/page_snapshot_<timestamp>.html`.
pub fn write_page_snapshot(dir: &Path, body: &str) -> Result<PathBuf, AppError> {
    create_dir_all(dir)
        .map_err(|e| {
            AppError::storage(format!(
                "Failed to create snapshot dir '{}': {e}",
                dir.display()
            ))
        })?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("page_snapshot_{ts}.html"));

    let mut file = File::create(&path)
        .map_err(|e| AppError::storage(format!("Failed to create snapshot file: {e}")))?;
    file.write_all(body.as_bytes())
        .map_err(|e| AppError::storage(format!("Failed to write snapshot: {e}")))?;

    Ok(path)
}
