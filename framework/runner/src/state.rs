use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The single slot describing the current, or most recent, run.
///
/// Serialises to the JSON shape served by the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    #[serde(rename = "isRunning")]
    pub running: bool,

    /// Last count parsed from the run's output. Reset to zero when a run starts or ends.
    pub active_users: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_class: Option<String>,

    /// Meaningful while running, kept until the next run overwrites it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Index of the newest report found when the last run finished.
    ///
    /// This is not necessarily the report written by that run: the lookup only picks the most
    /// recently modified report directory. Left untouched while a new run is in progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}
