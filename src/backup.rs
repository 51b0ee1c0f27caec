use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// File name for a backup taken at `taken_at`: `messages_<yyyyMMdd_HHmmss>.json`.
pub fn backup_file_name(taken_at: DateTime<Utc>) -> String {
    format!("messages_{}.json", taken_at.format("%Y%m%d_%H%M%S"))
}

/// Copies `data_file` into `backup_dir` and returns the copy's path.
///
/// Nothing to back up is not an error: returns `Ok(None)` when the data file does not exist.
pub fn backup_data_file(
    data_file: &Path,
    backup_dir: &Path,
    taken_at: DateTime<Utc>,
) -> io::Result<Option<PathBuf>> {
    if !data_file.is_file() {
        tracing::info!(path = %data_file.display(), "no data file yet, skipping backup");
        return Ok(None);
    }
    fs::create_dir_all(backup_dir)?;
    let target = backup_dir.join(backup_file_name(taken_at));
    fs::copy(data_file, &target)?;
    tracing::info!(from = %data_file.display(), to = %target.display(), "backed up data file");
    Ok(Some(target))
}
