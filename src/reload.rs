//! Live rule reloading.
//!
//! Watches the rules document's modification time on a coarse, fixed
//! interval (independent of the file-poll cadence) and swaps the rule
//! table when the document changes. A reload failure keeps the previous
//! table in force; the broken document is retried only once it is
//! modified again.

use crate::rules::{RuleError, RuleTable};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// How often the rules document is checked for changes.
pub const RELOAD_CHECK_INTERVAL: Duration = Duration::from_secs(5);

pub struct ReloadWatcher {
    source: PathBuf,
    interval: Duration,
    last_check: Instant,
    last_modified: Option<SystemTime>,
}

impl ReloadWatcher {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self::with_interval(source, RELOAD_CHECK_INTERVAL)
    }

    /// Watcher with a custom check interval, for wrappers that drive
    /// their own cadence.
    pub fn with_interval(source: impl Into<PathBuf>, interval: Duration) -> Self {
        let source = source.into();
        let last_modified = modified_time(&source);
        Self {
            source,
            interval,
            last_check: Instant::now(),
            last_modified,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Reload `rules` if the document changed since the last check.
    ///
    /// Returns `None` when the interval has not elapsed, the document is
    /// missing, or it is unchanged; otherwise the reload result, carrying
    /// the new rule count on success. On failure `rules` is untouched.
    pub fn check(&mut self, rules: &mut RuleTable) -> Option<Result<usize, RuleError>> {
        if self.last_check.elapsed() < self.interval {
            return None;
        }
        self.last_check = Instant::now();

        let modified = modified_time(&self.source)?;
        if Some(modified) == self.last_modified {
            return None;
        }
        self.last_modified = Some(modified);

        Some(rules.reload(&self.source).map(|()| rules.rule_count()))
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn write_rules(path: &Path, folder: &str) {
        fs::write(
            path,
            format!(r#"{{ "file_extensions": {{ "docs": {{ ".pdf": "{}" }} }} }}"#, folder),
        )
        .unwrap();
    }

    fn setup() -> (TempDir, PathBuf, RuleTable) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("file_rules.json");
        write_rules(&path, "Documents");
        let table = RuleTable::load(&path).unwrap();
        (temp_dir, path, table)
    }

    #[test]
    fn test_unchanged_document_triggers_nothing() {
        let (_guard, path, mut table) = setup();
        let mut watcher = ReloadWatcher::with_interval(&path, Duration::ZERO);

        assert!(watcher.check(&mut table).is_none());
        assert!(watcher.check(&mut table).is_none());
    }

    #[test]
    fn test_interval_gates_checks() {
        let (_guard, path, mut table) = setup();
        let mut watcher = ReloadWatcher::with_interval(&path, Duration::from_secs(3600));

        thread::sleep(Duration::from_millis(50));
        write_rules(&path, "Paperwork");

        // Interval has not elapsed, so the change is not seen yet.
        assert!(watcher.check(&mut table).is_none());
        assert_eq!(table.lookup(".pdf"), "Documents");
    }

    #[test]
    fn test_modified_document_is_reloaded() {
        let (_guard, path, mut table) = setup();
        let mut watcher = ReloadWatcher::with_interval(&path, Duration::ZERO);

        thread::sleep(Duration::from_millis(50));
        write_rules(&path, "Paperwork");

        let result = watcher.check(&mut table);
        assert!(matches!(result, Some(Ok(1))));
        assert_eq!(table.lookup(".pdf"), "Paperwork");

        // No further change, no further reload.
        assert!(watcher.check(&mut table).is_none());
    }

    #[test]
    fn test_failed_reload_keeps_previous_table() {
        let (_guard, path, mut table) = setup();
        let mut watcher = ReloadWatcher::with_interval(&path, Duration::ZERO);

        thread::sleep(Duration::from_millis(50));
        fs::write(&path, "{ not valid json").unwrap();

        let result = watcher.check(&mut table);
        assert!(matches!(result, Some(Err(_))));
        assert_eq!(table.lookup(".pdf"), "Documents");

        // The broken document is not retried until it changes again.
        assert!(watcher.check(&mut table).is_none());
    }

    #[test]
    fn test_missing_document_is_ignored() {
        let (_guard, path, mut table) = setup();
        let mut watcher = ReloadWatcher::with_interval(&path, Duration::ZERO);

        fs::remove_file(&path).unwrap();

        assert!(watcher.check(&mut table).is_none());
        assert_eq!(table.lookup(".pdf"), "Documents");
    }
}
