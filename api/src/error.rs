use reclaimarr::LifecycleError;
use shared::decision::DecisionSetVersion;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("engine is not initialized")]
    NotInitialized,

    #[error("no decision set has been published yet, run an analysis first")]
    NoDecisionSet,

    #[error("not in decision set {version}: {}", .ids.join(", "))]
    UnknownItems {
        version: DecisionSetVersion,
        ids: Vec<String>,
    },
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
