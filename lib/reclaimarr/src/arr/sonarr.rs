use super::client::{ArrClient, ListingCache, DEFAULT_CACHE_TTL_SECS};
use super::models::SeriesRecord;
use crate::error::Result;
use crate::matching::ExactTitleMatcher;
use crate::plex::DEFAULT_TIMEOUT_SECS;
use crate::traits::{SeriesId, SeriesStatus, ShowTracker, TitleMatcher, TitleQuery};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "sonarr";

pub struct SonarrClient {
    arr: ArrClient,
    matcher: Arc<dyn TitleMatcher>,
    series: ListingCache<SeriesRecord>,
}

#[derive(Default)]
pub struct SonarrClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    cache_ttl_secs: Option<i64>,
    matcher: Option<Arc<dyn TitleMatcher>>,
}

impl SonarrClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn cache_ttl_secs(mut self, secs: i64) -> Self {
        self.cache_ttl_secs = Some(secs);
        self
    }

    pub fn matcher(mut self, matcher: Arc<dyn TitleMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn build(self) -> Result<SonarrClient> {
        Ok(SonarrClient {
            arr: ArrClient::new(
                SERVICE,
                self.base_url,
                self.api_key,
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            )?,
            matcher: self.matcher.unwrap_or_else(|| Arc::new(ExactTitleMatcher)),
            series: ListingCache::new(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
        })
    }
}

fn parse_status(status: &str) -> SeriesStatus {
    match status.to_lowercase().as_str() {
        "continuing" | "upcoming" => SeriesStatus::Continuing,
        _ => SeriesStatus::Ended,
    }
}

impl SonarrClient {
    async fn all_series(&self) -> Result<Arc<Vec<SeriesRecord>>> {
        self.series
            .get_or_fetch(|| self.arr.get::<Vec<SeriesRecord>>("series"))
            .await
    }
}

#[async_trait]
impl ShowTracker for SonarrClient {
    fn id(&self) -> &'static str {
        SERVICE
    }

    fn name(&self) -> &'static str {
        "Sonarr"
    }

    async fn find_series(&self, title: &str) -> Result<Option<SeriesId>> {
        let series = self.all_series().await?;
        let query = TitleQuery { title, year: None };
        let found = series
            .iter()
            .find(|s| self.matcher.matches(query, &s.title, s.year))
            .map(|s| SeriesId(s.id));
        debug!(
            "Sonarr lookup '{}' ({} matcher): {:?}",
            title,
            self.matcher.name(),
            found
        );
        Ok(found)
    }

    async fn get_status(&self, series_id: SeriesId) -> Result<SeriesStatus> {
        let series: SeriesRecord = self.arr.get(&format!("series/{series_id}")).await?;
        debug!("Sonarr status for {}: {}", series.title, series.status);
        Ok(parse_status(&series.status))
    }

    async fn unmonitor(&self, series_id: SeriesId) -> Result<()> {
        self.arr
            .set_unmonitored(&format!("series/{series_id}"))
            .await?;
        self.series.invalidate().await;
        info!("Unmonitored series {} in {}", series_id, self.arr.service());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.arr.check_connection().await
    }
}
