use reclaimarr::LifecycleEngine;
use shared::system::{CleanupSummary, Stats, SystemHealth};
use tracing::info;

use crate::error::Result;

pub async fn get_stats(engine: &LifecycleEngine) -> Result<Stats> {
    Ok(engine.stats().await?)
}

pub async fn get_system_health(engine: &LifecycleEngine) -> SystemHealth {
    engine.health().await
}

/// Keep the newest `keep` decision sets on disk.
pub async fn cleanup_reports(engine: &LifecycleEngine, keep: usize) -> Result<CleanupSummary> {
    let summary = engine.cleanup_reports(keep).await?;
    info!(
        "Cleanup removed {} reports and {} backup logs",
        summary.reports, summary.backups
    );
    Ok(summary)
}
