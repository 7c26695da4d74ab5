use super::client::{ArrClient, ListingCache, DEFAULT_CACHE_TTL_SECS};
use super::models::MovieRecord;
use crate::error::Result;
use crate::matching::ExactTitleMatcher;
use crate::plex::DEFAULT_TIMEOUT_SECS;
use crate::traits::{MovieId, MovieTracker, TitleMatcher, TitleQuery};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "radarr";

pub struct RadarrClient {
    arr: ArrClient,
    matcher: Arc<dyn TitleMatcher>,
    movies: ListingCache<MovieRecord>,
}

#[derive(Default)]
pub struct RadarrClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    cache_ttl_secs: Option<i64>,
    matcher: Option<Arc<dyn TitleMatcher>>,
}

impl RadarrClientBuilder {
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

    pub fn build(self) -> Result<RadarrClient> {
        Ok(RadarrClient {
            arr: ArrClient::new(
                SERVICE,
                self.base_url,
                self.api_key,
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            )?,
            matcher: self.matcher.unwrap_or_else(|| Arc::new(ExactTitleMatcher)),
            movies: ListingCache::new(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
        })
    }
}

#[async_trait]
impl MovieTracker for RadarrClient {
    fn id(&self) -> &'static str {
        SERVICE
    }

    fn name(&self) -> &'static str {
        "Radarr"
    }

    async fn find_movie(&self, title: &str, year: Option<u16>) -> Result<Option<MovieId>> {
        let movies = self
            .movies
            .get_or_fetch(|| self.arr.get::<Vec<MovieRecord>>("movie"))
            .await?;
        let query = TitleQuery { title, year };
        let found = movies
            .iter()
            .find(|m| self.matcher.matches(query, &m.title, m.year))
            .map(|m| MovieId(m.id));
        debug!(
            "Radarr lookup '{}' ({:?}, {} matcher): {:?}",
            title,
            year,
            self.matcher.name(),
            found
        );
        Ok(found)
    }

    async fn unmonitor(&self, movie_id: MovieId) -> Result<()> {
        self.arr
            .set_unmonitored(&format!("movie/{movie_id}"))
            .await?;
        self.movies.invalidate().await;
        info!("Unmonitored movie {} in {}", movie_id, self.arr.service());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.arr.check_connection().await
    }
}
