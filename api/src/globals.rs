use std::sync::Arc;

use reclaimarr::{
    arr::{RadarrClientBuilder, SonarrClientBuilder},
    matching::matcher_by_name,
    plex::PlexClientBuilder,
    rules::PolicyConfig,
    LifecycleEngine, ServicesBuilder, TitleMatcher,
};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{load_policy, AppConfig, ConfigError};
use crate::error::{ApiError, Result};

/// Process-wide engine, created once by [`init`].
static ENGINE: OnceCell<LifecycleEngine> = OnceCell::const_new();

/// Wire the configured collaborators into an engine.
pub fn build_engine(config: &AppConfig, policy: PolicyConfig) -> Result<LifecycleEngine> {
    let matcher: Arc<dyn TitleMatcher> = matcher_by_name(&config.title_matching)
        .map(Arc::from)
        .ok_or_else(|| ConfigError::Invalid {
            name: "TITLE_MATCHING",
            value: config.title_matching.clone(),
        })?;

    let plex = PlexClientBuilder::new()
        .base_url(&config.plex_url)
        .token(&config.plex_token)
        .timeout_secs(config.http_timeout_secs)
        .build()?;
    let mut services = ServicesBuilder::new().media_server(plex);

    match &config.sonarr {
        Some(endpoint) => {
            let sonarr = SonarrClientBuilder::new()
                .base_url(&endpoint.url)
                .api_key(&endpoint.api_key)
                .timeout_secs(config.http_timeout_secs)
                .matcher(Arc::clone(&matcher))
                .build()?;
            services = services.show_tracker(sonarr);
        }
        None => warn!("Sonarr is not configured: continuing shows cannot be protected"),
    }
    match &config.radarr {
        Some(endpoint) => {
            let radarr = RadarrClientBuilder::new()
                .base_url(&endpoint.url)
                .api_key(&endpoint.api_key)
                .timeout_secs(config.http_timeout_secs)
                .matcher(Arc::clone(&matcher))
                .build()?;
            services = services.movie_tracker(radarr);
        }
        None => info!("Radarr is not configured, movies will not be unmonitored"),
    }

    Ok(LifecycleEngine::new(
        services.build()?,
        policy,
        config.engine_settings(),
    ))
}

/// Build the global engine from `config` and restore the newest persisted
/// decision set. Later calls return the engine built first.
pub async fn init(config: &AppConfig) -> Result<&'static LifecycleEngine> {
    ENGINE
        .get_or_try_init(|| async {
            let policy = load_policy(&config.policy_path)?;
            let engine = build_engine(config, policy)?;
            if let Some(version) = engine.restore().await? {
                info!("Latest decision set is {}", version);
            }
            Ok::<_, ApiError>(engine)
        })
        .await
}

pub fn engine() -> Result<&'static LifecycleEngine> {
    ENGINE.get().ok_or(ApiError::NotInitialized)
}
