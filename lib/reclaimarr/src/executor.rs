//! Best-effort, per-item deletion pipeline.
//!
//! Items run one after another. Each goes through backup, unmonitor,
//! catalog removal and file deletion; a failing step is recorded on that
//! item and never stops the batch. Nothing is rolled back.

use std::collections::HashSet;

use chrono::Utc;
use shared::{
    decision::{DecisionEntry, DecisionSet},
    deletion::{
        DeletionResult, DeletionStep, FileRemoval, ItemResult, ItemStatus, StepOutcome, StepReport,
    },
    library::{ItemId, MediaType},
};
use tracing::{error, info, warn};

use crate::backup::{BackupBatch, BackupLog, BackupRecord};
use crate::error::{bounded, LifecycleError, Result};
use crate::services::Services;

const FILESYSTEM: &str = "filesystem";

pub struct DeletionExecutor<'a> {
    services: &'a Services,
    backups: &'a BackupLog,
    timeout_secs: u64,
}

/// Accumulates step reports for one item.
struct ItemRun {
    steps: Vec<StepReport>,
    errors: Vec<String>,
}

impl ItemRun {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn record(&mut self, step: DeletionStep, outcome: StepOutcome) -> bool {
        let done = outcome.is_done();
        if let StepOutcome::Failed(message) = &outcome {
            self.errors.push(format!("{step}: {message}"));
        }
        self.steps.push(StepReport { step, outcome });
        done
    }

    fn record_result(&mut self, item_id: &ItemId, step: DeletionStep, result: Result<()>) -> bool {
        match result {
            Ok(()) => self.record(step, StepOutcome::Done),
            Err(e) => {
                let message = e.to_string();
                error!(
                    "{}",
                    LifecycleError::DeletionStep {
                        item_id: item_id.clone(),
                        step,
                        message: message.clone(),
                    }
                );
                self.record(step, StepOutcome::Failed(message))
            }
        }
    }

    fn finish(self, entry: &DecisionEntry, status: ItemStatus) -> ItemResult {
        ItemResult {
            id: entry.item.id.clone(),
            title: entry.item.display_name(),
            status,
            error: (!self.errors.is_empty()).then(|| self.errors.join("; ")),
            steps: self.steps,
        }
    }
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(services: &'a Services, backups: &'a BackupLog, timeout_secs: u64) -> Self {
        Self {
            services,
            backups,
            timeout_secs,
        }
    }

    /// Delete the approved `ids` of `set`. Repeated ids are processed
    /// once; ids absent from the set fail without touching anything.
    pub async fn execute(&self, set: &DecisionSet, ids: &[ItemId]) -> DeletionResult {
        let mut seen = HashSet::new();
        let ids: Vec<&ItemId> = ids.iter().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return DeletionResult::new(set.version, Vec::new(), None);
        }

        let batch = self.backups.batch(set.version, Utc::now());
        info!(
            "Deleting {} items from decision set {} (backup: {})",
            ids.len(),
            set.version,
            batch.reference()
        );

        let mut results = Vec::with_capacity(ids.len());
        let mut backed_up = false;
        for (idx, id) in ids.into_iter().enumerate() {
            let result = match set.get(id) {
                Some(entry) => {
                    let result = self.delete_item(set, entry, &batch).await;
                    backed_up |= result
                        .steps
                        .first()
                        .is_some_and(|report| report.outcome.is_done());
                    result
                }
                None => {
                    warn!("Item {} is not part of decision set {}", id, set.version);
                    ItemResult {
                        id: id.clone(),
                        title: String::new(),
                        status: ItemStatus::Failed,
                        error: Some(format!("not in decision set {}", set.version)),
                        steps: Vec::new(),
                    }
                }
            };
            info!(
                "[{}] {} -> {}",
                idx + 1,
                if result.title.is_empty() {
                    result.id.as_str()
                } else {
                    result.title.as_str()
                },
                result.status
            );
            results.push(result);
        }

        let backup_ref = backed_up.then(|| batch.reference());
        let result = DeletionResult::new(set.version, results, backup_ref);
        info!("Deletion finished: {}", result.summary);
        result
    }

    async fn delete_item(
        &self,
        set: &DecisionSet,
        entry: &DecisionEntry,
        batch: &BackupBatch,
    ) -> ItemResult {
        let id = &entry.item.id;
        let mut run = ItemRun::new();

        let record = BackupRecord {
            backed_up_at: Utc::now(),
            decision_set_version: set.version,
            item: entry.item.clone(),
            decision: entry.decision.clone(),
        };
        let backup = bounded(FILESYSTEM, self.timeout_secs, batch.append(&record)).await;
        if !run.record_result(id, DeletionStep::Backup, backup) {
            return run.finish(entry, ItemStatus::Failed);
        }

        let unmonitor = self.unmonitor(entry).await;
        run.record(DeletionStep::Unmonitor, unmonitor);

        let server = self.services.media_server();
        let removal = bounded(server.id(), self.timeout_secs, server.remove_item(id)).await;
        let catalog_removed = run.record_result(id, DeletionStep::CatalogRemoval, removal);

        let (files, failures) = self.delete_files(entry).await;
        let outcome = if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::FileDeletion {
                failed: files.failed,
                total: files.deleted + files.failed,
                details: failures.join("; "),
            })
        };
        run.record_result(id, DeletionStep::FileDeletion, outcome);

        run.finish(entry, ItemStatus::from_removals(catalog_removed, files))
    }

    /// Stop the tracker from downloading the item again. Never affects the
    /// item's status.
    async fn unmonitor(&self, entry: &DecisionEntry) -> StepOutcome {
        let item = &entry.item;
        let outcome = match item.media_type() {
            MediaType::Show => match self.services.show_tracker() {
                None => return StepOutcome::Skipped("no show tracker configured".into()),
                Some(tracker) => {
                    let lookup =
                        bounded(tracker.id(), self.timeout_secs, tracker.find_series(&item.title))
                            .await;
                    match lookup {
                        Ok(Some(series)) => {
                            bounded(tracker.id(), self.timeout_secs, tracker.unmonitor(series))
                                .await
                                .map(|_| true)
                        }
                        Ok(None) => Ok(false),
                        Err(e) => Err(e),
                    }
                }
            },
            MediaType::Movie => match self.services.movie_tracker() {
                None => return StepOutcome::Skipped("no movie tracker configured".into()),
                Some(tracker) => {
                    let lookup = bounded(
                        tracker.id(),
                        self.timeout_secs,
                        tracker.find_movie(&item.title, item.year),
                    )
                    .await;
                    match lookup {
                        Ok(Some(movie)) => {
                            bounded(tracker.id(), self.timeout_secs, tracker.unmonitor(movie))
                                .await
                                .map(|_| true)
                        }
                        Ok(None) => Ok(false),
                        Err(e) => Err(e),
                    }
                }
            },
        };

        match outcome {
            Ok(true) => StepOutcome::Done,
            Ok(false) | Err(LifecycleError::Match { .. }) => {
                warn!("No tracker match for '{}', not unmonitored", item.display_name());
                StepOutcome::Skipped("no tracker match".into())
            }
            Err(e) => {
                error!("Unmonitor failed for '{}': {}", item.display_name(), e);
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    /// Try to delete every file of the item, then prune folders left empty
    /// below the library root. A failing file does not stop the others, and
    /// a pruning failure is logged without failing the step.
    async fn delete_files(&self, entry: &DecisionEntry) -> (FileRemoval, Vec<String>) {
        let fs = self.services.filesystem();
        let mut removal = FileRemoval::default();
        let mut failures = Vec::new();
        let mut deleted = Vec::new();
        for path in &entry.item.file_paths {
            match bounded(FILESYSTEM, self.timeout_secs, fs.delete_path(path)).await {
                Ok(()) => {
                    removal.deleted += 1;
                    deleted.push(path);
                }
                Err(e) => {
                    removal.failed += 1;
                    failures.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        for path in deleted {
            let (Some(parent), Some(root)) = (path.parent(), entry.item.library.root_for(path))
            else {
                continue;
            };
            if parent == root || !parent.starts_with(root) {
                continue;
            }
            match bounded(
                FILESYSTEM,
                self.timeout_secs,
                fs.prune_empty_dirs(parent, root),
            )
            .await
            {
                Ok(removed) => {
                    for dir in removed {
                        info!("Removed empty folder {}", dir.display());
                    }
                }
                Err(e) => warn!("Could not prune folders above {}: {}", path.display(), e),
            }
        }
        (removal, failures)
    }
}
