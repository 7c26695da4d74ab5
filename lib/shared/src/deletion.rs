use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decision::DecisionSetVersion;
use crate::library::ItemId;

/// Caller approval of a subset of a decision set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub decision_set_version: DecisionSetVersion,
    pub item_ids: Vec<ItemId>,
    pub confirmation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Success,
    Partial,
    Failed,
}

/// Outcome of deleting every file of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileRemoval {
    pub deleted: usize,
    pub failed: usize,
}

impl FileRemoval {
    pub fn all_deleted(&self) -> bool {
        self.failed == 0
    }

    pub fn any_deleted(&self) -> bool {
        self.deleted > 0
    }
}

impl ItemStatus {
    /// `success` when the catalog entry and every file are gone, `failed`
    /// when nothing was removed, `partial` otherwise.
    pub fn from_removals(catalog_removed: bool, files: FileRemoval) -> Self {
        if catalog_removed && files.all_deleted() {
            ItemStatus::Success
        } else if catalog_removed || files.any_deleted() {
            ItemStatus::Partial
        } else {
            ItemStatus::Failed
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Success => f.write_str("success"),
            ItemStatus::Partial => f.write_str("partial"),
            ItemStatus::Failed => f.write_str("failed"),
        }
    }
}

/// The per-item removal pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
    Backup,
    Unmonitor,
    CatalogRemoval,
    FileDeletion,
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionStep::Backup => f.write_str("backup"),
            DeletionStep::Unmonitor => f.write_str("unmonitor"),
            DeletionStep::CatalogRemoval => f.write_str("catalog removal"),
            DeletionStep::FileDeletion => f.write_str("file deletion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    Skipped(String),
    Failed(String),
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: DeletionStep,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: ItemId,
    pub title: String,
    pub status: ItemStatus,
    pub error: Option<String>,
    pub steps: Vec<StepReport>,
}

impl ItemResult {
    pub fn outcome_of(&self, step: DeletionStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| &report.outcome)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
}

/// Outcome of a deletion batch.
///
/// Execution is best-effort and not atomic: completed steps of a partial or
/// failed item are never rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionResult {
    pub decision_set_version: DecisionSetVersion,
    pub per_item: Vec<ItemResult>,
    pub summary: DeletionSummary,
    pub backup_ref: Option<String>,
}

impl DeletionResult {
    pub fn new(
        decision_set_version: DecisionSetVersion,
        per_item: Vec<ItemResult>,
        backup_ref: Option<String>,
    ) -> Self {
        let mut summary = DeletionSummary::default();
        for result in &per_item {
            match result.status {
                ItemStatus::Success => summary.success += 1,
                ItemStatus::Partial => summary.partial += 1,
                ItemStatus::Failed => summary.failed += 1,
            }
        }
        Self {
            decision_set_version,
            per_item,
            summary,
            backup_ref,
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.summary.partial == 0 && self.summary.failed == 0
    }
}

impl fmt::Display for DeletionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} partial, {} failed (best-effort, no rollback)",
            self.success, self.partial, self.failed
        )
    }
}
