use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File name of the browsable entry point inside each report directory.
pub const REPORT_INDEX_FILE: &str = "index.html";

/// Best-effort lookup of the most recent report under a reports root.
///
/// Every run of the load-test tool writes its report into a fresh subdirectory of the root. The
/// locator has no way to tie a report to a particular run, so it simply picks the subdirectory
/// modified most recently.
#[derive(Debug, Clone)]
pub struct ReportLocator {
    reports_root: PathBuf,
}

impl ReportLocator {
    pub fn new(reports_root: impl Into<PathBuf>) -> Self {
        Self {
            reports_root: reports_root.into(),
        }
    }

    pub fn reports_root(&self) -> &Path {
        &self.reports_root
    }

    /// Path to the index file of the most recently modified report directory.
    ///
    /// Returns [None] if the root cannot be listed or has no subdirectories. Entries whose
    /// metadata cannot be read are skipped. When several directories share the newest
    /// modification time, the one listed first by the filesystem is returned, so the choice
    /// between them is not deterministic.
    pub fn find_latest(&self) -> Option<PathBuf> {
        let entries = match fs::read_dir(&self.reports_root) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!(
                    "Cannot list reports directory '{}': {e}",
                    self.reports_root.display()
                );
                return None;
            }
        };

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            let is_newer = latest
                .as_ref()
                .map_or(true, |(latest_modified, _)| modified > *latest_modified);
            if is_newer {
                latest = Some((modified, entry.path()));
            }
        }

        latest.map(|(_, dir)| dir.join(REPORT_INDEX_FILE))
    }
}
