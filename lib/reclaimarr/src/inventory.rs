//! Turns raw media server listings into [`MediaItem`] records.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use shared::{
    catalog::{RawAudioStream, RawItem, RawLibrary},
    library::{
        LibraryRef, MediaItem, MediaKind, MediaType, Resolution, ShowDetails, WatchState,
    },
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::rules::RuleTable;
use crate::traits::MediaServer;

const DUTCH_TITLE_HINTS: [&str; 2] = ["dutch", "nederlands"];

/// List every configured library and normalize its items. Any listing
/// error aborts the scan; a partial inventory is never returned.
pub async fn scan(server: &dyn MediaServer, table: &RuleTable) -> Result<Vec<MediaItem>> {
    let mut items = Vec::new();
    for resolved in table.libraries() {
        let library = &resolved.library;
        info!(
            "Scanning {} library '{}' ({})",
            library.media_type, library.name, library.id
        );
        let raw = server.list_items(&library.id).await?;
        let before = items.len();
        let library_ref = library_ref(library);
        items.extend(
            raw.into_iter()
                .filter_map(|record| normalize(record, &library_ref, library.media_type)),
        );
        info!(
            "Library '{}': {} items usable",
            library.name,
            items.len() - before
        );
    }
    Ok(items)
}

pub fn library_ref(library: &RawLibrary) -> LibraryRef {
    LibraryRef {
        id: library.id.clone(),
        name: library.name.clone(),
        roots: library.locations.clone(),
    }
}

/// Normalize one raw record. Records without files or with an unusable
/// added timestamp are skipped.
pub fn normalize(raw: RawItem, library: &LibraryRef, library_type: MediaType) -> Option<MediaItem> {
    let media_type = raw.media_type.unwrap_or(library_type);
    if media_type != library_type {
        debug!(
            "Skipping {} '{}' listed in {} library '{}'",
            media_type, raw.title, library_type, library.name
        );
        return None;
    }
    if raw.parts.is_empty() {
        debug!("Skipping '{}' ({}): no files", raw.title, raw.id);
        return None;
    }
    let added_at = match timestamp(raw.added_at) {
        Some(at) => at,
        None => {
            warn!(
                "Skipping '{}' ({}): invalid added timestamp {}",
                raw.title, raw.id, raw.added_at
            );
            return None;
        }
    };

    let (kind, watch_state) = match media_type {
        MediaType::Movie => (MediaKind::Movie, movie_watch_state(&raw)),
        MediaType::Show => {
            let details = ShowDetails {
                seasons: raw.child_count.unwrap_or_default(),
                episodes: raw.leaf_count.unwrap_or_default(),
                watched_episodes: raw.viewed_leaf_count.unwrap_or_default(),
            };
            (MediaKind::Show(details), show_watch_state(&details))
        }
    };

    Some(MediaItem {
        id: raw.id.into(),
        year: raw.year,
        kind,
        library: library.clone(),
        file_paths: raw.parts.iter().map(|part| PathBuf::from(&part.file)).collect(),
        size_bytes: raw.parts.iter().filter_map(|part| part.size).sum(),
        watch_state,
        last_watched_at: raw.last_viewed_at.and_then(timestamp),
        added_at,
        rating: raw.user_rating,
        audio_tracks: audio_tags(&raw.audio_streams),
        resolution: raw
            .video_resolution
            .as_deref()
            .map(Resolution::from_label)
            .unwrap_or(Resolution::Unknown),
        video_codec: raw.video_codec.map(|codec| codec.to_lowercase()),
        title: raw.title,
    })
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

fn movie_watch_state(raw: &RawItem) -> WatchState {
    if raw.view_count > 0 {
        WatchState::FullyWatched
    } else if raw.view_offset_ms.unwrap_or_default() > 0 {
        WatchState::PartiallyWatched
    } else {
        WatchState::Unwatched
    }
}

fn show_watch_state(details: &ShowDetails) -> WatchState {
    match details.watched_episodes {
        0 => WatchState::Unwatched,
        watched if watched >= details.episodes => WatchState::FullyWatched,
        _ => WatchState::PartiallyWatched,
    }
}

/// Lowercase language tags of the audio streams. A stream titled as Dutch
/// counts as `nl` even without a language code.
pub fn audio_tags(streams: &[RawAudioStream]) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for stream in streams {
        for tag in [&stream.language_code, &stream.language_tag]
            .into_iter()
            .flatten()
        {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() {
                tags.insert(tag);
            }
        }
        if let Some(title) = &stream.title {
            let title = title.to_lowercase();
            if DUTCH_TITLE_HINTS.iter().any(|hint| title.contains(hint)) {
                tags.insert("nl".to_string());
            }
        }
    }
    tags
}
