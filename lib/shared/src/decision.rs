use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::library::{bytes_to_gb, DuplicateGroup, ItemId, MediaItem, MediaType};

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// The outcome of evaluating one item.
///
/// A protected decision is never eligible; [`Decision::protect`] is the only
/// way the flag is raised and it clears eligibility at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub item_id: ItemId,
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub priority: u8,
    pub auto_recommended: bool,
    pub requires_manual_review: bool,
    pub protected: bool,
}

/// Exactly one of these holds for every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
    Excluded,
    MovieAutoEligible,
    ShowManualEligible,
    Protected,
}

impl Decision {
    /// An eligible decision with the review flags that belong to `media_type`:
    /// movies are auto-recommended, shows always need a manual look.
    pub fn candidate(item_id: ItemId, media_type: MediaType, priority: u8) -> Self {
        Self {
            item_id,
            eligible: true,
            reasons: Vec::new(),
            priority: clamp_priority(priority as i64),
            auto_recommended: media_type == MediaType::Movie,
            requires_manual_review: media_type == MediaType::Show,
            protected: false,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    /// Fold `other` into `self`: highest priority wins, reasons are appended.
    pub fn merge(mut self, other: Decision) -> Self {
        self.priority = self.priority.max(other.priority);
        self.eligible = (self.eligible || other.eligible) && !(self.protected || other.protected);
        self.protected = self.protected || other.protected;
        for reason in other.reasons {
            if !self.reasons.contains(&reason) {
                self.reasons.push(reason);
            }
        }
        self
    }

    pub fn protect(&mut self, reason: impl Into<String>) {
        self.protected = true;
        self.eligible = false;
        self.auto_recommended = false;
        self.reasons.push(reason.into());
    }

    pub fn state(&self) -> DecisionState {
        match (self.protected, self.eligible) {
            (true, _) => DecisionState::Protected,
            (false, false) => DecisionState::Excluded,
            (false, true) if self.auto_recommended => DecisionState::MovieAutoEligible,
            (false, true) => DecisionState::ShowManualEligible,
        }
    }
}

pub fn clamp_priority(score: i64) -> u8 {
    score.clamp(MIN_PRIORITY as i64, MAX_PRIORITY as i64) as u8
}

/// Monotonic identifier of a published decision set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionSetVersion(pub u64);

impl fmt::Display for DecisionSetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub item: MediaItem,
    pub decision: Decision,
}

/// An item the protection guard withheld from deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedItem {
    pub id: ItemId,
    pub title: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub count: usize,
    pub movie_count: usize,
    pub show_count: usize,
    pub total_size_bytes: u64,
    pub total_size_gb: f64,
}

impl Aggregate {
    pub fn from_entries(entries: &[DecisionEntry]) -> Self {
        let total_size_bytes: u64 = entries.iter().map(|e| e.item.size_bytes).sum();
        let movie_count = entries
            .iter()
            .filter(|e| e.item.media_type() == MediaType::Movie)
            .count();
        Self {
            count: entries.len(),
            movie_count,
            show_count: entries.len() - movie_count,
            total_size_bytes,
            total_size_gb: bytes_to_gb(total_size_bytes),
        }
    }
}

/// Immutable output of one analysis run. Only eligible items are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSet {
    pub version: DecisionSetVersion,
    pub created_at: DateTime<Utc>,
    pub confirmation: String,
    pub items: Vec<DecisionEntry>,
    pub aggregate: Aggregate,
    #[serde(default)]
    pub duplicate_groups: Vec<DuplicateGroup>,
    #[serde(default)]
    pub protected: Vec<ProtectedItem>,
}

impl DecisionSet {
    pub fn get(&self, id: &ItemId) -> Option<&DecisionEntry> {
        self.items.iter().find(|entry| entry.item.id == *id)
    }

    /// Ids of the entries that can be approved without manual review.
    pub fn auto_recommended_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|entry| entry.decision.auto_recommended)
            .map(|entry| entry.item.id.clone())
            .collect()
    }

    pub fn rows(&self) -> Vec<DecisionRow> {
        self.items.iter().map(DecisionRow::from).collect()
    }
}

/// Flat view of a decision set entry, as shown to the approving user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRow {
    pub id: ItemId,
    pub title: String,
    pub year: Option<u16>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub library: String,
    pub auto_recommended: bool,
    pub requires_manual_review: bool,
    pub protected: bool,
    pub reasons: Vec<String>,
    pub priority: u8,
    pub size_gb: f64,
    pub audio_tracks: Vec<String>,
}

impl From<&DecisionEntry> for DecisionRow {
    fn from(entry: &DecisionEntry) -> Self {
        Self {
            id: entry.item.id.clone(),
            title: entry.item.title.clone(),
            year: entry.item.year,
            media_type: entry.item.media_type(),
            library: entry.item.library.name.clone(),
            auto_recommended: entry.decision.auto_recommended,
            requires_manual_review: entry.decision.requires_manual_review,
            protected: entry.decision.protected,
            reasons: entry.decision.reasons.clone(),
            priority: entry.decision.priority,
            size_gb: bytes_to_gb(entry.item.size_bytes),
            audio_tracks: entry.item.audio_tracks.iter().cloned().collect(),
        }
    }
}
