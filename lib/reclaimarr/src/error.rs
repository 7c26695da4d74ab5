use shared::deletion::DeletionStep;
use shared::library::ItemId;
use thiserror::Error;

use crate::gate::OperationKind;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{service} is unreachable: {message}")]
    Connectivity {
        service: &'static str,
        message: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no {service} match for '{title}'")]
    Match { service: &'static str, title: String },

    #[error("{step} failed for item {item_id}: {message}")]
    DeletionStep {
        item_id: ItemId,
        step: DeletionStep,
        message: String,
    },

    #[error("{failed} of {total} files could not be deleted: {details}")]
    FileDeletion {
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("refusing to delete {0}: not a media file")]
    NotAFile(std::path::PathBuf),

    #[error("{service} API error {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} call timed out after {secs}s")]
    Timeout { service: &'static str, secs: u64 },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("cannot start {requested}: {running} in progress")]
    Busy {
        requested: OperationKind,
        running: OperationKind,
    },

    #[error("deletion request rejected: {0}")]
    RequestRejected(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LifecycleError {
    /// Classify a transport failure: refused connections and timeouts mean
    /// the collaborator is unreachable, anything else is an API error.
    pub fn transport(service: &'static str, error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            LifecycleError::Connectivity {
                service,
                message: error.to_string(),
            }
        } else {
            LifecycleError::Api {
                service,
                status: error.status().map(|s| s.as_u16()).unwrap_or(0),
                message: error.to_string(),
            }
        }
    }

    /// Errors that abort an analysis run before anything is published.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LifecycleError::Match { .. }
                | LifecycleError::DeletionStep { .. }
                | LifecycleError::FileDeletion { .. }
        )
    }
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;

/// Run a collaborator call with an upper bound on its duration.
pub async fn bounded<T, F>(service: &'static str, secs: u64, call: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    tokio::time::timeout(std::time::Duration::from_secs(secs), call)
        .await
        .map_err(|_| LifecycleError::Timeout { service, secs })?
}
