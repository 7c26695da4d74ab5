//! Raw records as reported by a media server, before normalization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::library::MediaType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLibrary {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    pub locations: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPart {
    pub file: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAudioStream {
    pub language_code: Option<String>,
    pub language_tag: Option<String>,
    pub title: Option<String>,
}

/// One catalog entry. Timestamps are unix seconds. For shows, `parts`
/// covers every episode file and the counters describe episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub year: Option<u16>,
    pub media_type: Option<MediaType>,
    pub added_at: i64,
    pub last_viewed_at: Option<i64>,
    pub view_count: u32,
    pub view_offset_ms: Option<u64>,
    pub user_rating: Option<f32>,
    pub leaf_count: Option<u32>,
    pub viewed_leaf_count: Option<u32>,
    pub child_count: Option<u32>,
    pub parts: Vec<RawPart>,
    pub video_resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_streams: Vec<RawAudioStream>,
}
