use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracker readiness is `None` when that tracker is not configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemHealth {
    pub media_server_online: bool,
    pub show_tracker_ready: Option<bool>,
    pub movie_tracker_ready: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Stats {
    pub total_reports: usize,
    pub last_run: Option<DateTime<Utc>>,
    pub total_items_flagged: usize,
    pub total_space_flagged_gb: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CleanupSummary {
    pub reports: usize,
    pub backups: usize,
}
