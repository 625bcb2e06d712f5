//! Janitor for the bot's temp directory.
//!
//! Every workflow writes its intermediate files under one directory with a
//! known prefix and deletes them on its own exit paths; the sweep is the
//! backstop for files orphaned by crashes or abandoned sessions.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time;

/// Prefixes of files this bot owns. Anything else in the directory is left
/// alone.
const SWEEP_PREFIXES: &[&str] = &[
    "text_", "img_", "ocr_", "doc_", "merge_", "split_", "protect_", "enhance_",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub bytes_freed: u64,
}

fn is_bot_artifact(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    SWEEP_PREFIXES.iter().any(|p| name.starts_with(p)) || name.ends_with(".tmp")
}

/// Delete bot-owned files older than `max_age`. Returns how many files were
/// removed and how many bytes that freed.
pub fn sweep_temp_files(dir: &Path, max_age: Duration) -> CleanupReport {
    let mut report = CleanupReport::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cleanup: cannot read {}: {}", dir.display(), e);
            return report;
        }
    };

    let now = SystemTime::now();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_bot_artifact(&path) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                report.deleted += 1;
                report.bytes_freed += metadata.len();
                log::info!("cleanup: deleted {}", path.display());
            }
            Err(e) => log::warn!("cleanup: failed to delete {}: {}", path.display(), e),
        }
    }

    log::info!(
        "cleanup completed: {} files deleted, {} bytes freed",
        report.deleted,
        report.bytes_freed
    );
    report
}

/// Count and size of bot-owned temp files, for the master stats panel.
pub fn temp_stats(dir: &Path) -> (usize, u64) {
    let mut files = 0;
    let mut bytes = 0;
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && is_bot_artifact(&path) {
                files += 1;
                bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }
    (files, bytes)
}

/// Best-effort delete used on workflow exit paths.
pub fn remove_file_quiet(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Background sweep, spawned from main.
pub async fn sweep_task(dir: PathBuf, interval_hours: u64, max_age_hours: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_hours.max(1) * 3600));
    let max_age = Duration::from_secs(max_age_hours * 3600);
    loop {
        interval.tick().await;
        sweep_temp_files(&dir, max_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeps_only_aged_bot_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("split_old.pdf"), b"0123456789").unwrap();
        std::fs::write(dir.path().join("merge_old.pdf"), b"01234").unwrap();
        std::fs::write(dir.path().join("user_data.pdf"), b"keep me").unwrap();

        // Everything is younger than an hour, so an aged sweep removes nothing.
        let report = sweep_temp_files(dir.path(), Duration::from_secs(3600));
        assert_eq!(report, CleanupReport::default());

        // A zero cutoff removes the bot's files but not the foreign one.
        let report = sweep_temp_files(dir.path(), Duration::ZERO);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.bytes_freed, 15);
        assert!(dir.path().join("user_data.pdf").exists());
    }

    #[test]
    fn stats_count_bot_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ocr_1.jpg"), b"abc").unwrap();
        std::fs::write(dir.path().join("scratch.tmp"), b"defg").unwrap();
        std::fs::write(dir.path().join("other.bin"), b"xyz").unwrap();

        let (files, bytes) = temp_stats(dir.path());
        assert_eq!(files, 2);
        assert_eq!(bytes, 7);
    }

    #[test]
    fn quiet_removal_swallows_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_quiet(&dir.path().join("never_existed.pdf"));
    }
}
