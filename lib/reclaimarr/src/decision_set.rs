//! Assembles rule, duplicate and protection output into a [`DecisionSet`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use shared::{
    decision::{Aggregate, Decision, DecisionEntry, DecisionSet, DecisionSetVersion, ProtectedItem},
    library::{DuplicateGroup, ItemId, MediaItem},
};
use tracing::{debug, info};

use crate::duplicates;
use crate::error::Result;
use crate::protection::ProtectionGuard;
use crate::rules::{self, DuplicateSettings, RuleTable};

const TOKEN_LEN: usize = 16;

/// Candidates gathered during one analysis run, before protection.
#[derive(Debug, Default)]
pub struct DecisionSetBuilder {
    candidates: BTreeMap<ItemId, (MediaItem, Decision)>,
    duplicate_groups: Vec<DuplicateGroup>,
}

impl DecisionSetBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Merge `decision` into whatever is already recorded for `item`.
    pub fn add(&mut self, item: &MediaItem, decision: Decision) {
        match self.candidates.remove(&item.id) {
            Some((item, existing)) => {
                self.candidates
                    .insert(item.id.clone(), (item, existing.merge(decision)));
            }
            None => {
                self.candidates
                    .insert(item.id.clone(), (item.clone(), decision));
            }
        }
    }

    /// Rule decisions first, so their reasons precede duplicate reasons.
    pub fn evaluate(
        mut self,
        items: &[MediaItem],
        table: &RuleTable,
        settings: &DuplicateSettings,
        now: DateTime<Utc>,
    ) -> Self {
        for item in items {
            let Some(rules) = table.rules_for(&item.library.id) else {
                debug!("No rule set for library {}", item.library.id);
                continue;
            };
            if let Some(decision) = rules::evaluate(item, rules, now) {
                self.add(item, decision);
            }
        }
        let rule_candidates = self.candidates.len();

        let by_id: BTreeMap<&ItemId, &MediaItem> =
            items.iter().map(|item| (&item.id, item)).collect();
        let resolution = duplicates::resolve(items, settings);
        for decision in resolution.decisions {
            if let Some(item) = by_id.get(&decision.item_id) {
                self.add(item, decision);
            }
        }
        self.duplicate_groups = resolution.groups;
        info!(
            "{} rule candidates, {} after duplicate resolution",
            rule_candidates,
            self.candidates.len()
        );
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Run the protection guard over the candidates and freeze the result.
    pub async fn build(
        self,
        version: DecisionSetVersion,
        created_at: DateTime<Utc>,
        guard: &ProtectionGuard<'_>,
    ) -> Result<DecisionSet> {
        let mut candidates: Vec<(MediaItem, Decision)> = self.candidates.into_values().collect();
        let protected = guard.apply(&mut candidates).await?;
        Ok(finish(
            version,
            created_at,
            candidates,
            self.duplicate_groups,
            protected,
        ))
    }
}

fn entry_order(a: &DecisionEntry, b: &DecisionEntry) -> Ordering {
    b.decision
        .priority
        .cmp(&a.decision.priority)
        .then_with(|| a.item.media_type().cmp(&b.item.media_type()))
        .then_with(|| a.item.title.to_lowercase().cmp(&b.item.title.to_lowercase()))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Keep eligible entries only, order them and compute the token.
pub fn finish(
    version: DecisionSetVersion,
    created_at: DateTime<Utc>,
    candidates: Vec<(MediaItem, Decision)>,
    duplicate_groups: Vec<DuplicateGroup>,
    protected: Vec<ProtectedItem>,
) -> DecisionSet {
    let mut items: Vec<DecisionEntry> = candidates
        .into_iter()
        .filter(|(_, decision)| decision.eligible && !decision.protected)
        .map(|(item, decision)| DecisionEntry { item, decision })
        .collect();
    items.sort_by(entry_order);

    let ids: Vec<&ItemId> = items.iter().map(|entry| &entry.item.id).collect();
    let confirmation = confirmation_token(version, created_at, &ids);
    let aggregate = Aggregate::from_entries(&items);
    info!(
        "Decision set {}: {} items ({} movies, {} shows), {} GB reclaimable, {} protected",
        version,
        aggregate.count,
        aggregate.movie_count,
        aggregate.show_count,
        aggregate.total_size_gb,
        protected.len()
    );

    DecisionSet {
        version,
        created_at,
        confirmation,
        items,
        aggregate,
        duplicate_groups,
        protected,
    }
}

/// First 16 hex characters of SHA-256 over version, timestamp and ids.
pub fn confirmation_token(
    version: DecisionSetVersion,
    created_at: DateTime<Utc>,
    ids: &[&ItemId],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.0.to_be_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    for id in ids {
        hasher.update(b"\n");
        hasher.update(id.as_str().as_bytes());
    }
    let digest = hasher.finalize();
    let mut token: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    token.truncate(TOKEN_LEN);
    token
}
