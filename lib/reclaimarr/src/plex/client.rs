use super::models::{
    Envelope, Media, Metadata, MetadataContainer, SectionContainer, Stream, AUDIO_STREAM,
};
use crate::error::{LifecycleError, Result};
use crate::traits::MediaServer;
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, Method, Response};
use serde::de::DeserializeOwned;
use shared::{
    catalog::{RawAudioStream, RawItem, RawLibrary, RawPart},
    library::{ItemId, MediaType},
};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info};
use url::Url;

const SERVICE: &str = "plex";

/// Default per-request timeout. Deleting a show with hundreds of episodes
/// can keep Plex busy for a long time.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct PlexClient {
    base_url: Url,
    token: String,
    client: Client,
}

#[derive(Default)]
pub struct PlexClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
}

impl PlexClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<PlexClient> {
        let base_url_str = self.base_url.ok_or(LifecycleError::NotConfigured("plex url"))?;
        let token = self.token.ok_or(LifecycleError::NotConfigured("plex token"))?;
        let base_url = Url::parse(&format!("{}/", base_url_str.trim_end_matches('/')))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| LifecycleError::transport(SERVICE, e))?;

        Ok(PlexClient {
            base_url,
            token,
            client,
        })
    }
}

impl PlexClient {
    async fn send(&self, method: Method, endpoint: &str) -> Result<Response> {
        let url = self.base_url.join(endpoint)?;
        debug!("Request: {} {}", method, url);
        let response = self
            .client
            .request(method, url)
            .header("X-Plex-Token", &self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LifecycleError::transport(SERVICE, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(LifecycleError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.send(Method::GET, endpoint).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LifecycleError::transport(SERVICE, e))?;
        serde_json::from_str(&text).map_err(|e| LifecycleError::Api {
            service: SERVICE,
            status: status.as_u16(),
            message: format!("JSON parse error: {e}"),
        })
    }

    async fn metadata(&self, endpoint: &str) -> Result<Vec<Metadata>> {
        let envelope: Envelope<MetadataContainer> = self.get_json(endpoint).await?;
        Ok(envelope.media_container.metadata)
    }

    /// Audio streams are only reported on the detail endpoint.
    async fn audio_streams(&self, rating_key: &str) -> Result<Vec<RawAudioStream>> {
        let detail = self
            .metadata(&format!("library/metadata/{rating_key}"))
            .await?;
        Ok(detail
            .first()
            .map(|metadata| collect_audio(&metadata.media))
            .unwrap_or_default())
    }

    async fn movie_record(&self, metadata: Metadata) -> Result<RawItem> {
        let audio_streams = self.audio_streams(&metadata.rating_key).await?;
        let primary = metadata.media.first();
        Ok(RawItem {
            id: metadata.rating_key.clone(),
            title: metadata.title.clone(),
            year: metadata.year,
            media_type: Some(MediaType::Movie),
            added_at: metadata.added_at.unwrap_or_default(),
            last_viewed_at: metadata.last_viewed_at,
            view_count: metadata.view_count.unwrap_or_default(),
            view_offset_ms: metadata.view_offset,
            user_rating: metadata.user_rating,
            leaf_count: None,
            viewed_leaf_count: None,
            child_count: None,
            parts: collect_parts(&metadata.media),
            video_resolution: primary.and_then(|m| m.video_resolution.clone()),
            video_codec: primary.and_then(|m| m.video_codec.clone()),
            audio_streams,
        })
    }

    async fn show_record(&self, metadata: Metadata) -> Result<RawItem> {
        let episodes = self
            .metadata(&format!("library/metadata/{}/allLeaves", metadata.rating_key))
            .await?;
        let parts = episodes
            .iter()
            .flat_map(|episode| collect_parts(&episode.media))
            .collect();
        let last_viewed_at = episodes
            .iter()
            .filter_map(|episode| episode.last_viewed_at)
            .chain(metadata.last_viewed_at)
            .max();
        let viewed = episodes
            .iter()
            .filter(|episode| episode.view_count.unwrap_or_default() > 0)
            .count() as u32;

        let first = episodes.first();
        let primary = first.and_then(|episode| episode.media.first());
        let audio_streams = match first {
            Some(episode) => self.audio_streams(&episode.rating_key).await?,
            None => Vec::new(),
        };

        Ok(RawItem {
            id: metadata.rating_key.clone(),
            title: metadata.title.clone(),
            year: metadata.year,
            media_type: Some(MediaType::Show),
            added_at: metadata.added_at.unwrap_or_default(),
            last_viewed_at,
            view_count: viewed,
            view_offset_ms: None,
            user_rating: metadata.user_rating,
            leaf_count: metadata.leaf_count.or(Some(episodes.len() as u32)),
            viewed_leaf_count: metadata.viewed_leaf_count.or(Some(viewed)),
            child_count: metadata.child_count,
            parts,
            video_resolution: primary.and_then(|m| m.video_resolution.clone()),
            video_codec: primary.and_then(|m| m.video_codec.clone()),
            audio_streams,
        })
    }

    pub async fn check_connection(&self) -> bool {
        self.send(Method::GET, "identity").await.is_ok()
    }
}

fn collect_parts(media: &[Media]) -> Vec<RawPart> {
    media
        .iter()
        .flat_map(|m| m.part.iter())
        .filter_map(|part| {
            part.file.as_ref().map(|file| RawPart {
                file: file.clone(),
                size: part.size,
            })
        })
        .collect()
}

fn collect_audio(media: &[Media]) -> Vec<RawAudioStream> {
    media
        .iter()
        .flat_map(|m| m.part.iter())
        .flat_map(|part| part.stream.iter())
        .filter(|stream| stream.stream_type == Some(AUDIO_STREAM))
        .map(|stream: &Stream| RawAudioStream {
            language_code: stream.language_code.clone(),
            language_tag: stream.language_tag.clone(),
            title: stream.title.clone().or_else(|| stream.display_title.clone()),
        })
        .collect()
}

fn section_type(kind: &str) -> Option<MediaType> {
    match kind {
        "movie" => Some(MediaType::Movie),
        "show" => Some(MediaType::Show),
        _ => None,
    }
}

#[async_trait]
impl MediaServer for PlexClient {
    fn id(&self) -> &'static str {
        SERVICE
    }

    fn name(&self) -> &'static str {
        "Plex"
    }

    async fn list_libraries(&self) -> Result<Vec<RawLibrary>> {
        let envelope: Envelope<SectionContainer> = self.get_json("library/sections").await?;
        let libraries: Vec<RawLibrary> = envelope
            .media_container
            .directory
            .into_iter()
            .filter_map(|section| {
                let media_type = section_type(&section.kind)?;
                Some(RawLibrary {
                    id: section.key,
                    name: section.title,
                    media_type,
                    locations: section
                        .location
                        .into_iter()
                        .map(|l| PathBuf::from(l.path))
                        .collect(),
                })
            })
            .collect();
        info!("Plex reports {} movie/show libraries", libraries.len());
        Ok(libraries)
    }

    async fn list_items(&self, library_id: &str) -> Result<Vec<RawItem>> {
        let listing = self
            .metadata(&format!("library/sections/{library_id}/all"))
            .await?;
        let total = listing.len();
        info!("Found {} items in library {}", total, library_id);

        let mut records = Vec::with_capacity(total);
        for (idx, metadata) in listing.into_iter().enumerate() {
            if (idx + 1) % 50 == 0 {
                info!("  Processing {}/{}...", idx + 1, total);
            }
            let record = match section_type(&metadata.kind) {
                Some(MediaType::Movie) => self.movie_record(metadata).await?,
                Some(MediaType::Show) => self.show_record(metadata).await?,
                None => {
                    debug!("Skipping {} entry '{}'", metadata.kind, metadata.title);
                    continue;
                }
            };
            records.push(record);
        }
        Ok(records)
    }

    async fn remove_item(&self, item_id: &ItemId) -> Result<()> {
        info!("Removing item {} from Plex", item_id);
        self.send(Method::DELETE, &format!("library/metadata/{item_id}"))
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.check_connection().await
    }
}
