use std::collections::HashSet;

use reclaimarr::LifecycleEngine;
use shared::{
    decision::{Aggregate, DecisionEntry, DecisionRow, DecisionSet},
    deletion::{DeletionRequest, DeletionResult},
    library::ItemId,
};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::handlers::analysis::latest_decision_set;

/// Which entries of the latest decision set to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every auto-recommended entry. Shows are never included.
    AutoRecommended,
    Items(Vec<ItemId>),
}

/// A deletion request plus what it will touch, for the approving user.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    pub request: DeletionRequest,
    pub rows: Vec<DecisionRow>,
    pub aggregate: Aggregate,
}

impl DeletionPlan {
    pub fn is_empty(&self) -> bool {
        self.request.item_ids.is_empty()
    }
}

/// Resolve `selection` against `set`. Explicit ids must all be listed in
/// the set; repeated ids are kept once.
pub fn select_items(set: &DecisionSet, selection: &Selection) -> Result<Vec<ItemId>> {
    match selection {
        Selection::AutoRecommended => Ok(set.auto_recommended_ids()),
        Selection::Items(ids) => {
            let unknown: Vec<String> = ids
                .iter()
                .filter(|id| set.get(id).is_none())
                .map(|id| id.to_string())
                .collect();
            if !unknown.is_empty() {
                return Err(ApiError::UnknownItems {
                    version: set.version,
                    ids: unknown,
                });
            }
            let mut seen = HashSet::new();
            Ok(ids
                .iter()
                .filter(|id| seen.insert(*id))
                .cloned()
                .collect())
        }
    }
}

pub fn plan_for(set: &DecisionSet, selection: &Selection) -> Result<DeletionPlan> {
    let item_ids = select_items(set, selection)?;
    let entries: Vec<DecisionEntry> = item_ids
        .iter()
        .filter_map(|id| set.get(id).cloned())
        .collect();
    Ok(DeletionPlan {
        request: DeletionRequest {
            decision_set_version: set.version,
            item_ids,
            confirmation: set.confirmation.clone(),
        },
        rows: entries.iter().map(DecisionRow::from).collect(),
        aggregate: Aggregate::from_entries(&entries),
    })
}

pub async fn plan_deletion(
    engine: &LifecycleEngine,
    selection: &Selection,
) -> Result<DeletionPlan> {
    let set = latest_decision_set(engine).await?;
    plan_for(&set, selection)
}

pub async fn execute_deletion(
    engine: &LifecycleEngine,
    request: &DeletionRequest,
) -> Result<DeletionResult> {
    info!(
        "Approved {} items of decision set {}",
        request.item_ids.len(),
        request.decision_set_version
    );
    Ok(engine.execute_deletion(request).await?)
}
