use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::OptionFuture;
use shared::{
    decision::{DecisionSet, DecisionSetVersion},
    deletion::{DeletionRequest, DeletionResult},
    system::{CleanupSummary, Stats, SystemHealth},
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backup::BackupLog;
use crate::decision_set::DecisionSetBuilder;
use crate::error::{bounded, LifecycleError, Result};
use crate::executor::DeletionExecutor;
use crate::gate::{OperationGate, OperationKind};
use crate::inventory;
use crate::plex::DEFAULT_TIMEOUT_SECS;
use crate::protection::ProtectionGuard;
use crate::report::ReportStore;
use crate::rules::{PolicyConfig, RuleTable};
use crate::services::Services;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_BACKUP_RETENTION: usize = 10;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub timeout_secs: u64,
    pub history_limit: usize,
    /// Where published sets are persisted. `None` keeps them in memory only.
    pub reports_dir: Option<PathBuf>,
    pub backup_dir: PathBuf,
    pub backup_retention: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            reports_dir: None,
            backup_dir: PathBuf::from("backups"),
            backup_retention: DEFAULT_BACKUP_RETENTION,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed(Arc<DecisionSet>),
    /// Another operation held the gate; nothing was done.
    Skipped { running: OperationKind },
}

impl AnalysisOutcome {
    pub fn decision_set(&self) -> Option<&Arc<DecisionSet>> {
        match self {
            AnalysisOutcome::Completed(set) => Some(set),
            AnalysisOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AnalysisOutcome::Skipped { .. })
    }
}

#[derive(Debug, Default)]
struct Registry {
    history: VecDeque<Arc<DecisionSet>>,
    consumed: HashSet<DecisionSetVersion>,
    last_version: u64,
}

impl Registry {
    fn latest(&self) -> Option<&Arc<DecisionSet>> {
        self.history.back()
    }

    fn publish(&mut self, set: Arc<DecisionSet>, limit: usize) {
        self.last_version = self.last_version.max(set.version.0);
        self.history.push_back(set);
        while self.history.len() > limit.max(1) {
            if let Some(old) = self.history.pop_front() {
                self.consumed.remove(&old.version);
            }
        }
    }
}

/// Drives analysis runs and deletion batches over one set of collaborators.
pub struct LifecycleEngine {
    services: Services,
    policy: PolicyConfig,
    settings: EngineSettings,
    gate: OperationGate,
    registry: RwLock<Registry>,
    reports: Option<ReportStore>,
    backups: BackupLog,
}

impl LifecycleEngine {
    pub fn new(services: Services, policy: PolicyConfig, settings: EngineSettings) -> Self {
        let reports = settings.reports_dir.clone().map(ReportStore::new);
        let backups = BackupLog::new(settings.backup_dir.clone());
        Self {
            services,
            policy,
            settings,
            gate: OperationGate::new(),
            registry: RwLock::new(Registry::default()),
            reports,
            backups,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn gate(&self) -> &OperationGate {
        &self.gate
    }

    /// Load the newest persisted set as the latest one, so a new process
    /// can execute against an analysis made by an earlier one.
    pub async fn restore(&self) -> Result<Option<DecisionSetVersion>> {
        let Some(store) = &self.reports else {
            return Ok(None);
        };
        let Some(set) = store.load_latest().await? else {
            return Ok(None);
        };
        let version = set.version;
        let consumed = store.is_consumed(version).await;
        let mut registry = self.registry.write().await;
        if consumed {
            registry.consumed.insert(version);
        }
        registry.publish(Arc::new(set), self.settings.history_limit);
        info!(
            "Restored decision set {}{}",
            version,
            if consumed { " (already executed)" } else { "" }
        );
        Ok(Some(version))
    }

    pub async fn run_analysis(&self) -> Result<AnalysisOutcome> {
        self.run_analysis_at(Utc::now()).await
    }

    /// Analyse the collection as of `now`. Skipped without side effects
    /// when another operation is running.
    pub async fn run_analysis_at(&self, now: DateTime<Utc>) -> Result<AnalysisOutcome> {
        let _guard = match self.gate.try_acquire(OperationKind::Analysis) {
            Ok(guard) => guard,
            Err(running) => {
                info!("Analysis skipped: {} in progress", running);
                return Ok(AnalysisOutcome::Skipped { running });
            }
        };
        info!("Starting analysis run");

        let server = self.services.media_server();
        let libraries = bounded(
            server.id(),
            self.settings.timeout_secs,
            server.list_libraries(),
        )
        .await?;
        let table = RuleTable::resolve(&self.policy, &libraries)?;
        if table.is_empty() {
            warn!("No libraries are bound to a rule set");
        }

        let items = inventory::scan(server, &table).await?;
        info!("Inventory holds {} items", items.len());

        let builder =
            DecisionSetBuilder::new().evaluate(&items, &table, &self.policy.duplicates, now);
        let version = DecisionSetVersion(self.registry.read().await.last_version + 1);
        let guard = ProtectionGuard::new(self.services.show_tracker(), self.settings.timeout_secs);
        let set = builder.build(version, now, &guard).await?;

        if let Some(store) = &self.reports {
            store.save(&set).await?;
        }
        let set = Arc::new(set);
        self.registry
            .write()
            .await
            .publish(Arc::clone(&set), self.settings.history_limit);
        info!("Published decision set {}", version);
        Ok(AnalysisOutcome::Completed(set))
    }

    /// Execute an approved subset of the latest decision set.
    pub async fn execute_deletion(&self, request: &DeletionRequest) -> Result<DeletionResult> {
        let _guard = self
            .gate
            .try_acquire(OperationKind::Deletion)
            .map_err(|running| LifecycleError::Busy {
                requested: OperationKind::Deletion,
                running,
            })?;

        let set = {
            let registry = self.registry.read().await;
            let latest = registry.latest().ok_or_else(|| {
                LifecycleError::RequestRejected("no decision set has been published".into())
            })?;
            if request.decision_set_version != latest.version {
                return Err(LifecycleError::RequestRejected(format!(
                    "decision set {} is not the latest ({})",
                    request.decision_set_version, latest.version
                )));
            }
            if registry.consumed.contains(&latest.version) {
                return Err(LifecycleError::RequestRejected(format!(
                    "decision set {} was already executed",
                    latest.version
                )));
            }
            if request.confirmation != latest.confirmation {
                return Err(LifecycleError::RequestRejected(
                    "confirmation token does not match".into(),
                ));
            }
            Arc::clone(latest)
        };

        if request.item_ids.is_empty() {
            info!("Empty deletion request for {}: nothing to do", set.version);
            return Ok(DeletionResult::new(set.version, Vec::new(), None));
        }

        self.registry.write().await.consumed.insert(set.version);
        if let Some(store) = &self.reports {
            if let Err(e) = store.mark_consumed(set.version).await {
                warn!("Could not persist consumption of {}: {}", set.version, e);
            }
        }

        let executor =
            DeletionExecutor::new(&self.services, &self.backups, self.settings.timeout_secs);
        Ok(executor.execute(&set, &request.item_ids).await)
    }

    pub async fn latest(&self) -> Option<Arc<DecisionSet>> {
        self.registry.read().await.latest().cloned()
    }

    /// Retained sets, oldest first.
    pub async fn history(&self) -> Vec<Arc<DecisionSet>> {
        self.registry.read().await.history.iter().cloned().collect()
    }

    pub async fn is_consumed(&self, version: DecisionSetVersion) -> bool {
        self.registry.read().await.consumed.contains(&version)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let total_reports = match &self.reports {
            Some(store) => store.versions().await?.len(),
            None => self.registry.read().await.history.len(),
        };
        let latest = self.latest().await;
        Ok(Stats {
            total_reports,
            last_run: latest.as_ref().map(|set| set.created_at),
            total_items_flagged: latest.as_ref().map_or(0, |set| set.aggregate.count),
            total_space_flagged_gb: latest.as_ref().map_or(0.0, |set| set.aggregate.total_size_gb),
        })
    }

    pub async fn health(&self) -> SystemHealth {
        let show: OptionFuture<_> = self
            .services
            .show_tracker()
            .map(|tracker| tracker.health_check())
            .into();
        let movie: OptionFuture<_> = self
            .services
            .movie_tracker()
            .map(|tracker| tracker.health_check())
            .into();
        let (media_server_online, show_tracker_ready, movie_tracker_ready) = futures::join!(
            self.services.media_server().health_check(),
            show,
            movie
        );
        SystemHealth {
            media_server_online,
            show_tracker_ready,
            movie_tracker_ready,
        }
    }

    /// Remove old persisted sets, keeping `keep`, and old backup logs.
    pub async fn cleanup_reports(&self, keep: usize) -> Result<CleanupSummary> {
        let reports = match &self.reports {
            Some(store) => store.cleanup(keep).await?,
            None => 0,
        };
        let backups = self.backups.prune(self.settings.backup_retention).await?;
        Ok(CleanupSummary { reports, backups })
    }
}
