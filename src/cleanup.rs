//! Stale file sweeping for the upload and output directories.
//!
//! Uploads and converted files are transient. [`sweep`] walks a directory
//! bottom-up, deletes files whose modification time is older than the cutoff,
//! then removes directories the sweep left empty. The root itself is kept.
//!
//! Errors on individual entries are logged and skipped so one unreadable file
//! never blocks the rest of the sweep.

use serde::Serialize;
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub files_removed: u64,
    pub dirs_removed: u64,
    pub bytes_freed: u64,
}

impl CleanupStats {
    fn add(&mut self, other: CleanupStats) {
        self.files_removed += other.files_removed;
        self.dirs_removed += other.dirs_removed;
        self.bytes_freed += other.bytes_freed;
    }
}

pub fn max_age_from_hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// Remove files under `dir` older than `max_age`, then empty directories.
pub fn sweep(dir: &Path, max_age: Duration) -> CleanupStats {
    sweep_at(dir, max_age, SystemTime::now())
}

/// Sweep several roots, summing their stats.
pub fn sweep_all<'a>(dirs: impl IntoIterator<Item = &'a Path>, max_age: Duration) -> CleanupStats {
    let now = SystemTime::now();
    let mut total = CleanupStats::default();
    for dir in dirs {
        total.add(sweep_at(dir, max_age, now));
    }
    total
}

fn sweep_at(dir: &Path, max_age: Duration, now: SystemTime) -> CleanupStats {
    let mut stats = CleanupStats::default();
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "cleanup directory does not exist");
        return stats;
    }
    let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
    tracing::info!(dir = %dir.display(), "cleanup started");

    for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(error = %e, "cannot read directory entry");
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            if is_empty_dir(path) {
                match std::fs::remove_dir(path) {
                    Ok(()) => {
                        stats.dirs_removed += 1;
                        tracing::info!(dir = %path.display(), "removed empty directory");
                    }
                    Err(e) => {
                        tracing::error!(dir = %path.display(), error = %e, "cannot remove directory")
                    }
                }
            }
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot stat file");
                continue;
            }
        };
        let stale = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
        if !stale {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                stats.files_removed += 1;
                stats.bytes_freed += metadata.len();
                tracing::info!(path = %path.display(), "removed stale file");
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "cannot remove file"),
        }
    }

    tracing::info!(
        dir = %dir.display(),
        files = stats.files_removed,
        dirs = stats.dirs_removed,
        mb_freed = %format!("{:.2}", stats.bytes_freed as f64 / (1024.0 * 1024.0)),
        "cleanup finished"
    );
    stats
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
