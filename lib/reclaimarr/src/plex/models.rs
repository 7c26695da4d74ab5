use serde::Deserialize;

// Internal structs for deserializing raw Plex API responses

#[derive(Deserialize, Debug)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SectionContainer {
    #[serde(rename = "Directory", default)]
    pub directory: Vec<Section>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Section {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "Location", default)]
    pub location: Vec<SectionLocation>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SectionLocation {
    pub path: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Metadata>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Metadata {
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub year: Option<u16>,
    pub added_at: Option<i64>,
    pub last_viewed_at: Option<i64>,
    pub view_count: Option<u32>,
    pub view_offset: Option<u64>,
    pub user_rating: Option<f32>,
    pub leaf_count: Option<u32>,
    pub viewed_leaf_count: Option<u32>,
    pub child_count: Option<u32>,
    #[serde(rename = "Media", default)]
    pub media: Vec<Media>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Media {
    pub video_resolution: Option<String>,
    pub video_codec: Option<String>,
    #[serde(rename = "Part", default)]
    pub part: Vec<Part>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Part {
    pub file: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "Stream", default)]
    pub stream: Vec<Stream>,
}

/// `streamType` 2 is audio.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Stream {
    pub stream_type: Option<u8>,
    pub language_code: Option<String>,
    pub language_tag: Option<String>,
    pub title: Option<String>,
    pub display_title: Option<String>,
}

pub(crate) const AUDIO_STREAM: u8 = 2;
