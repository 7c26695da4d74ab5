use std::sync::Arc;

use reclaimarr::{AnalysisOutcome, LifecycleEngine};
use shared::decision::DecisionSet;

use crate::error::{ApiError, Result};

pub async fn run_analysis(engine: &LifecycleEngine) -> Result<AnalysisOutcome> {
    Ok(engine.run_analysis().await?)
}

pub async fn latest_decision_set(engine: &LifecycleEngine) -> Result<Arc<DecisionSet>> {
    engine.latest().await.ok_or(ApiError::NoDecisionSet)
}
