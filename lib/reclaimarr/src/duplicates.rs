use std::cmp::Ordering;
use std::collections::BTreeMap;

use itertools::Itertools;
use shared::{
    decision::Decision,
    library::{DuplicateGroup, DuplicateKey, MediaItem},
};
use tracing::{debug, info};

use crate::matching::normalize_title;
use crate::rules::DuplicateSettings;

pub const DUPLICATE_PRIORITY: u8 = 8;

#[derive(Debug, Clone, Default)]
pub struct DuplicateResolution {
    pub groups: Vec<DuplicateGroup>,
    /// One candidate decision per superseded item.
    pub decisions: Vec<Decision>,
}

pub fn duplicate_key(item: &MediaItem) -> DuplicateKey {
    DuplicateKey {
        title: normalize_title(&item.title),
        year: item.year,
        media_type: item.media_type(),
    }
}

/// Keeper ordering: Dutch audio tier first (when enabled), then resolution,
/// size and id. `Ordering::Less` means `a` is the better keeper.
fn keeper_order(a: &MediaItem, b: &MediaItem, nl_audio_priority: bool) -> Ordering {
    let dutch = if nl_audio_priority {
        b.has_dutch_audio().cmp(&a.has_dutch_audio())
    } else {
        Ordering::Equal
    };
    dutch
        .then_with(|| b.resolution.cmp(&a.resolution))
        .then_with(|| b.size_bytes.cmp(&a.size_bytes))
        .then_with(|| a.id.cmp(&b.id))
}

fn rationale(keeper: &MediaItem, runner_up: &MediaItem, nl_audio_priority: bool) -> String {
    if nl_audio_priority && keeper.has_dutch_audio() && !runner_up.has_dutch_audio() {
        format!(
            "kept {} ({}) for its Dutch audio track",
            keeper.id, keeper.resolution
        )
    } else if keeper.resolution != runner_up.resolution {
        format!(
            "kept {} for higher resolution ({} vs {})",
            keeper.id, keeper.resolution, runner_up.resolution
        )
    } else if keeper.size_bytes != runner_up.size_bytes {
        format!("kept {} as the larger file", keeper.id)
    } else {
        format!("kept {} (lowest id among equals)", keeper.id)
    }
}

/// Group the full inventory by [`DuplicateKey`] and pick one keeper per group.
pub fn resolve(items: &[MediaItem], settings: &DuplicateSettings) -> DuplicateResolution {
    if !settings.enabled {
        info!("Duplicate detection disabled");
        return DuplicateResolution::default();
    }

    let by_key: BTreeMap<DuplicateKey, Vec<&MediaItem>> = items
        .iter()
        .map(|item| (duplicate_key(item), item))
        .into_group_map()
        .into_iter()
        .collect();

    let mut resolution = DuplicateResolution::default();
    for (key, members) in by_key {
        if members.len() < 2 {
            continue;
        }
        let members: Vec<&MediaItem> = members
            .into_iter()
            .sorted_by(|a, b| keeper_order(a, b, settings.nl_audio_priority))
            .collect();
        let keeper = members[0];
        let rationale = rationale(keeper, members[1], settings.nl_audio_priority);
        info!(
            "Duplicate '{}': {} copies, {}",
            keeper.display_name(),
            members.len(),
            rationale
        );

        for superseded in &members[1..] {
            debug!(
                "  superseded {} ({}, {} bytes, dutch: {})",
                superseded.id,
                superseded.resolution,
                superseded.size_bytes,
                superseded.has_dutch_audio()
            );
            resolution.decisions.push(
                Decision::candidate(
                    superseded.id.clone(),
                    superseded.media_type(),
                    DUPLICATE_PRIORITY,
                )
                .with_reason(format!("superseded by duplicate: {}", keeper.title)),
            );
        }

        resolution.groups.push(DuplicateGroup {
            key,
            members: members.iter().map(|item| item.id.clone()).sorted().collect(),
            keeper: keeper.id.clone(),
            rationale,
        });
    }
    info!("Found {} duplicate groups", resolution.groups.len());
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::library::{LibraryRef, MediaKind, MediaType, Resolution, ShowDetails, WatchState};
    use std::collections::BTreeSet;

    fn item(id: &str, title: &str, resolution: Resolution, dutch: bool, size: u64) -> MediaItem {
        MediaItem {
            id: id.into(),
            title: title.into(),
            year: Some(2020),
            kind: MediaKind::Movie,
            library: LibraryRef {
                id: "1".into(),
                name: "Movies".into(),
                roots: vec![],
            },
            file_paths: vec![format!("/m/{id}.mkv").into()],
            size_bytes: size,
            watch_state: WatchState::Unwatched,
            last_watched_at: None,
            added_at: Utc::now(),
            rating: None,
            audio_tracks: if dutch {
                BTreeSet::from(["nl".to_string()])
            } else {
                BTreeSet::from(["en".to_string()])
            },
            resolution,
            video_codec: None,
        }
    }

    fn settings(nl_audio_priority: bool) -> DuplicateSettings {
        DuplicateSettings {
            enabled: true,
            nl_audio_priority,
        }
    }

    #[test]
    fn dutch_audio_outranks_resolution() {
        let items = vec![
            item("a", "Alpha", Resolution::FullHd, true, 10),
            item("b", "Alpha", Resolution::Uhd, false, 40),
        ];
        let resolution = resolve(&items, &settings(true));
        assert_eq!(resolution.groups.len(), 1);
        assert_eq!(resolution.groups[0].keeper.as_str(), "a");
        assert_eq!(resolution.decisions.len(), 1);
        assert_eq!(resolution.decisions[0].item_id.as_str(), "b");
        assert_eq!(resolution.decisions[0].priority, DUPLICATE_PRIORITY);
        assert_eq!(
            resolution.decisions[0].reasons,
            vec!["superseded by duplicate: Alpha".to_string()]
        );
    }

    #[test]
    fn resolution_wins_when_audio_ignored() {
        let items = vec![
            item("a", "Alpha", Resolution::FullHd, true, 10),
            item("b", "Alpha", Resolution::Uhd, false, 40),
        ];
        let resolution = resolve(&items, &settings(false));
        assert_eq!(resolution.groups[0].keeper.as_str(), "b");
        assert!(resolution.groups[0].rationale.contains("higher resolution"));
    }

    #[test]
    fn keeper_is_independent_of_input_order() {
        let mut items = vec![
            item("c", "Alpha!", Resolution::Hd, false, 5),
            item("a", "alpha", Resolution::Hd, false, 5),
            item("b", "ALPHA", Resolution::Hd, false, 5),
        ];
        let first = resolve(&items, &settings(true));
        items.reverse();
        let second = resolve(&items, &settings(true));
        assert_eq!(first.groups[0].keeper.as_str(), "a");
        assert_eq!(first.groups, second.groups);
        assert_eq!(first.decisions.len(), 2);
    }

    #[test]
    fn larger_file_breaks_resolution_ties() {
        let items = vec![
            item("a", "Beta", Resolution::FullHd, false, 10),
            item("b", "Beta", Resolution::FullHd, false, 20),
        ];
        assert_eq!(resolve(&items, &settings(true)).groups[0].keeper.as_str(), "b");
    }

    #[test]
    fn movies_and_shows_never_group_together() {
        let mut show = item("s", "Alpha", Resolution::FullHd, false, 10);
        show.kind = MediaKind::Show(ShowDetails::default());
        let items = vec![item("m", "Alpha", Resolution::FullHd, false, 10), show];
        assert!(resolve(&items, &settings(true)).groups.is_empty());
        assert_eq!(duplicate_key(&items[1]).media_type, MediaType::Show);
    }

    #[test]
    fn disabled_detection_finds_nothing() {
        let items = vec![
            item("a", "Alpha", Resolution::FullHd, false, 10),
            item("b", "Alpha", Resolution::Uhd, false, 40),
        ];
        let disabled = DuplicateSettings {
            enabled: false,
            nl_audio_priority: true,
        };
        let resolution = resolve(&items, &disabled);
        assert!(resolution.groups.is_empty());
        assert!(resolution.decisions.is_empty());
    }
}
