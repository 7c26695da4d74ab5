use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language tags that identify a Dutch audio track.
pub const DUTCH_LANGUAGE_TAGS: [&str; 4] = ["nl", "nld", "dut", "dutch"];

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Media server identifier of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Movie sorts before show wherever items are ordered by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Show,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => f.write_str("movie"),
            MediaType::Show => f.write_str("show"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShowDetails {
    pub seasons: u32,
    pub episodes: u32,
    pub watched_episodes: u32,
}

/// Type-specific payload of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show(ShowDetails),
}

impl MediaKind {
    pub fn media_type(&self) -> MediaType {
        match self {
            MediaKind::Movie => MediaType::Movie,
            MediaKind::Show(_) => MediaType::Show,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    Unwatched,
    PartiallyWatched,
    FullyWatched,
}

/// Resolution tiers, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Unknown,
    Sd,
    Hd,
    FullHd,
    Uhd,
}

impl Resolution {
    /// Parse a media server resolution label such as `1080`, `4k` or `sd`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        let label = label.trim_end_matches('p');
        match label {
            "4k" | "2160" | "uhd" => Resolution::Uhd,
            "1080" | "fhd" => Resolution::FullHd,
            "720" | "hd" => Resolution::Hd,
            "480" | "576" | "sd" => Resolution::Sd,
            _ => Resolution::Unknown,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Resolution::Unknown => "unknown",
            Resolution::Sd => "SD",
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
            Resolution::Uhd => "2160p",
        };
        f.write_str(label)
    }
}

/// The library an item belongs to, with the root folders that bound
/// folder cleanup after deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRef {
    pub id: String,
    pub name: String,
    pub roots: Vec<PathBuf>,
}

impl LibraryRef {
    /// The deepest library root containing `path`.
    pub fn root_for(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }
}

/// A normalized movie or show entry, rebuilt on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    pub title: String,
    pub year: Option<u16>,
    pub kind: MediaKind,
    pub library: LibraryRef,
    pub file_paths: Vec<PathBuf>,
    pub size_bytes: u64,
    pub watch_state: WatchState,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub rating: Option<f32>,
    pub audio_tracks: BTreeSet<String>,
    pub resolution: Resolution,
    pub video_codec: Option<String>,
}

impl MediaItem {
    pub fn media_type(&self) -> MediaType {
        self.kind.media_type()
    }

    pub fn size_gb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_GB
    }

    pub fn has_dutch_audio(&self) -> bool {
        self.audio_tracks
            .iter()
            .any(|tag| DUTCH_LANGUAGE_TAGS.contains(&tag.as_str()))
    }

    /// `Title (Year)` for log lines and reasons.
    pub fn display_name(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// Convert a byte count to gigabytes (GiB), rounded to two decimals.
pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}

/// Identity of a duplicate group: normalized title, year and media type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub title: String,
    pub year: Option<u16>,
    pub media_type: MediaType,
}

/// Items that share a [`DuplicateKey`]; exactly one of them is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    pub members: Vec<ItemId>,
    pub keeper: ItemId,
    pub rationale: String,
}

impl DuplicateGroup {
    pub fn superseded(&self) -> impl Iterator<Item = &ItemId> {
        self.members.iter().filter(move |id| **id != self.keeper)
    }
}
