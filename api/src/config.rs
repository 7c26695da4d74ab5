//! Centralized configuration management.
//!
//! Environment variables are read and validated once at startup through this
//! module, and the analysis policy is loaded from its YAML file.

use std::path::{Path, PathBuf};

use reclaimarr::{
    engine::{EngineSettings, DEFAULT_BACKUP_RETENTION, DEFAULT_HISTORY_LIMIT},
    matching::matcher_by_name,
    plex::DEFAULT_TIMEOUT_SECS,
    rules::PolicyConfig,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required {0} env var")]
    Missing(&'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),

    #[error("cannot read policy file {path}: {source}")]
    PolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy file {path}: {source}")]
    PolicyParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Base URL and API key of an optional tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEndpoint {
    pub url: String,
    pub api_key: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Plex base URL (required)
    pub plex_url: String,
    /// Plex authentication token (required)
    pub plex_token: String,
    /// Sonarr endpoint, from SONARR_URL and SONARR_API_KEY
    pub sonarr: Option<TrackerEndpoint>,
    /// Radarr endpoint, from RADARR_URL and RADARR_API_KEY
    pub radarr: Option<TrackerEndpoint>,
    /// Path to the policy file (default: "reclaimarr.yaml")
    pub policy_path: PathBuf,
    /// Directory for persisted decision sets (default: "./reports")
    pub reports_dir: PathBuf,
    /// Directory for backup logs (default: "<REPORTS_DIR>/backups")
    pub backup_dir: PathBuf,
    /// Per-call timeout for collaborators (default: 120)
    pub http_timeout_secs: u64,
    /// Title matching strategy for tracker lookups (default: "exact")
    pub title_matching: String,
    /// How many decision sets stay in memory (default: 10)
    pub history_limit: usize,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));
        let tracker = |url: &'static str, key: &'static str| match (var(url), var(key)) {
            (Some(url), Some(api_key)) => Ok(Some(TrackerEndpoint { url, api_key })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::Incomplete(url, key)),
        };

        let reports_dir = PathBuf::from(var("REPORTS_DIR").unwrap_or_else(|| "./reports".into()));
        let backup_dir = var("BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| reports_dir.join("backups"));

        let title_matching = var("TITLE_MATCHING").unwrap_or_else(|| "exact".into());
        if matcher_by_name(&title_matching).is_none() {
            return Err(ConfigError::Invalid {
                name: "TITLE_MATCHING",
                value: title_matching,
            });
        }

        Ok(Self {
            plex_url: required("PLEX_URL")?,
            plex_token: required("PLEX_TOKEN")?,
            sonarr: tracker("SONARR_URL", "SONARR_API_KEY")?,
            radarr: tracker("RADARR_URL", "RADARR_API_KEY")?,
            policy_path: PathBuf::from(
                var("RECLAIMARR_POLICY").unwrap_or_else(|| "reclaimarr.yaml".into()),
            ),
            reports_dir,
            backup_dir,
            http_timeout_secs: parse_or(
                var("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?,
            title_matching,
            history_limit: parse_or(
                var("HISTORY_LIMIT"),
                "HISTORY_LIMIT",
                DEFAULT_HISTORY_LIMIT,
            )?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            timeout_secs: self.http_timeout_secs,
            history_limit: self.history_limit,
            reports_dir: Some(self.reports_dir.clone()),
            backup_dir: self.backup_dir.clone(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
        }
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value {
        None => Ok(default),
        Some(raw) => match raw.parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

/// Read the analysis policy. A missing file means the built-in defaults.
pub fn load_policy(path: &Path) -> Result<PolicyConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No policy at {}, using default rules", path.display());
            return Ok(PolicyConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::PolicyRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let policy: PolicyConfig =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::PolicyParse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        "Loaded policy from {} ({} rule sets, {} library bindings)",
        path.display(),
        policy.rules.len(),
        policy.libraries.len()
    );
    Ok(policy)
}
