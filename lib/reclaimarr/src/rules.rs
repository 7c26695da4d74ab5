//! Eligibility rules and the library to rule-set table.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    catalog::RawLibrary,
    decision::{clamp_priority, Decision},
    library::{MediaItem, MediaKind, MediaType, ShowDetails, WatchState},
};
use tracing::{debug, info};

use crate::error::{LifecycleError, Result};

const DAYS_PER_YEAR: f64 = 365.25;

const WATCHED_BASE: i64 = 2;
const UNWATCHED_BASE: i64 = 3;
const LOW_RATING_BASE: i64 = 4;
const LARGE_FILE_BASE: i64 = 5;

const SHOW_FULLY_WATCHED_BASE: i64 = 2;
const SHOW_UNWATCHED_BASE: i64 = 3;
const SHOW_PARTIALLY_WATCHED_BASE: i64 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieRules {
    pub unwatched_age_years: f64,
    pub watched_age_years: f64,
    pub low_rating_threshold: f32,
    pub large_file_gb: f64,
    pub low_rating_age_years: Option<f64>,
    pub large_file_unwatched_years: Option<f64>,
}

impl Default for MovieRules {
    fn default() -> Self {
        Self {
            unwatched_age_years: 5.0,
            watched_age_years: 2.0,
            low_rating_threshold: 3.0,
            large_file_gb: 50.0,
            low_rating_age_years: None,
            large_file_unwatched_years: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowRules {
    pub fully_watched_age_years: f64,
    pub unwatched_age_years: f64,
    pub partially_watched_age_years: f64,
}

impl Default for ShowRules {
    fn default() -> Self {
        Self {
            fully_watched_age_years: 0.5,
            unwatched_age_years: 5.0,
            partially_watched_age_years: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleSet {
    Movie(MovieRules),
    Show(ShowRules),
}

impl RuleSet {
    pub fn media_type(&self) -> MediaType {
        match self {
            RuleSet::Movie(_) => MediaType::Movie,
            RuleSet::Show(_) => MediaType::Show,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryBinding {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub rules: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateSettings {
    pub enabled: bool,
    pub nl_audio_priority: bool,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            nl_audio_priority: true,
        }
    }
}

/// The analysis policy: named rule sets, which library uses which, and
/// duplicate handling.
///
/// With no `libraries` entries every movie library is bound to the rule set
/// named `movies` and every show library to `shows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub rules: BTreeMap<String, RuleSet>,
    pub libraries: Vec<LibraryBinding>,
    pub duplicates: DuplicateSettings,
}

pub const DEFAULT_MOVIE_RULES: &str = "movies";
pub const DEFAULT_SHOW_RULES: &str = "shows";

impl Default for PolicyConfig {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            DEFAULT_MOVIE_RULES.to_string(),
            RuleSet::Movie(MovieRules::default()),
        );
        rules.insert(
            DEFAULT_SHOW_RULES.to_string(),
            RuleSet::Show(ShowRules::default()),
        );
        Self {
            rules,
            libraries: Vec::new(),
            duplicates: DuplicateSettings::default(),
        }
    }
}

/// A library the run will scan, with the rule set it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLibrary {
    pub library: RawLibrary,
    pub rules_name: String,
    pub rules: RuleSet,
}

/// Library to rule-set mapping, validated against the media server once
/// per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    libraries: Vec<ResolvedLibrary>,
    by_id: HashMap<String, usize>,
}

impl RuleTable {
    pub fn resolve(policy: &PolicyConfig, available: &[RawLibrary]) -> Result<Self> {
        let bindings = if policy.libraries.is_empty() {
            default_bindings(policy, available)
        } else {
            policy.libraries.clone()
        };

        let mut table = RuleTable::default();
        for binding in bindings {
            let library = available
                .iter()
                .find(|lib| lib.id == binding.id)
                .ok_or_else(|| {
                    LifecycleError::Configuration(format!(
                        "library {} ({}) does not exist on the media server",
                        binding.id,
                        binding.name.as_deref().unwrap_or("unnamed")
                    ))
                })?;
            let rules = policy.rules.get(&binding.rules).ok_or_else(|| {
                LifecycleError::Configuration(format!(
                    "library {} refers to unknown rule set '{}'",
                    binding.id, binding.rules
                ))
            })?;
            if rules.media_type() != library.media_type {
                return Err(LifecycleError::Configuration(format!(
                    "library {} ({}) holds {}s but rule set '{}' is for {}s",
                    library.id,
                    library.name,
                    library.media_type,
                    binding.rules,
                    rules.media_type()
                )));
            }
            if table.by_id.contains_key(&library.id) {
                return Err(LifecycleError::Configuration(format!(
                    "library {} is bound more than once",
                    library.id
                )));
            }
            debug!(
                "Library {} ({}) uses rule set '{}'",
                library.id, library.name, binding.rules
            );
            table
                .by_id
                .insert(library.id.clone(), table.libraries.len());
            table.libraries.push(ResolvedLibrary {
                library: library.clone(),
                rules_name: binding.rules,
                rules: rules.clone(),
            });
        }
        info!("Resolved rule sets for {} libraries", table.libraries.len());
        Ok(table)
    }

    pub fn libraries(&self) -> &[ResolvedLibrary] {
        &self.libraries
    }

    pub fn rules_for(&self, library_id: &str) -> Option<&RuleSet> {
        self.by_id
            .get(library_id)
            .map(|&idx| &self.libraries[idx].rules)
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

fn default_bindings(policy: &PolicyConfig, available: &[RawLibrary]) -> Vec<LibraryBinding> {
    available
        .iter()
        .filter_map(|library| {
            let name = match library.media_type {
                MediaType::Movie => DEFAULT_MOVIE_RULES,
                MediaType::Show => DEFAULT_SHOW_RULES,
            };
            policy.rules.contains_key(name).then(|| LibraryBinding {
                id: library.id.clone(),
                name: Some(library.name.clone()),
                rules: name.to_string(),
            })
        })
        .collect()
}

fn years_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Base score plus two points per whole threshold-sized overshoot.
fn score(base: i64, overshoot: f64) -> i64 {
    base + (2.0 * overshoot.max(0.0)).floor() as i64
}

fn relative_overshoot(value: f64, threshold: f64) -> f64 {
    if threshold > 0.0 {
        (value - threshold) / threshold
    } else {
        0.0
    }
}

/// Ratings count downwards: how far below the threshold, relative to it.
fn low_rating_overshoot(rating: f32, threshold: f32) -> f64 {
    if threshold > 0.0 {
        ((threshold - rating) / threshold) as f64
    } else {
        0.0
    }
}

/// One satisfied condition: its score and the reason shown to the user.
struct Hit {
    score: i64,
    reason: String,
}

/// Evaluate `item` against `rules`. `None` when no condition holds or the
/// rule set does not fit the item's kind.
pub fn evaluate(item: &MediaItem, rules: &RuleSet, now: DateTime<Utc>) -> Option<Decision> {
    let hits = match (&item.kind, rules) {
        (MediaKind::Movie, RuleSet::Movie(movie)) => movie_hits(item, movie, now),
        (MediaKind::Show(details), RuleSet::Show(show)) => show_hits(item, details, show, now),
        (kind, rules) => {
            debug!(
                "Rule set for {}s does not apply to {} '{}'",
                rules.media_type(),
                kind.media_type(),
                item.title
            );
            return None;
        }
    };

    let best = hits.iter().map(|hit| hit.score).max()?;
    let decision = hits.into_iter().fold(
        Decision::candidate(item.id.clone(), item.media_type(), clamp_priority(best)),
        |decision, hit| decision.with_reason(hit.reason),
    );
    Some(decision)
}

fn movie_hits(item: &MediaItem, rules: &MovieRules, now: DateTime<Utc>) -> Vec<Hit> {
    let mut hits = Vec::new();
    let age = years_between(item.added_at, now);
    let unwatched = item.watch_state == WatchState::Unwatched;

    if unwatched && age >= rules.unwatched_age_years {
        hits.push(Hit {
            score: score(
                UNWATCHED_BASE,
                relative_overshoot(age, rules.unwatched_age_years),
            ),
            reason: format!(
                "Unwatched for {:.1} years (threshold: {}y)",
                age, rules.unwatched_age_years
            ),
        });
    }

    if let (false, Some(last_watched)) = (unwatched, item.last_watched_at) {
        let since = years_between(last_watched, now);
        if since >= rules.watched_age_years {
            hits.push(Hit {
                score: score(
                    WATCHED_BASE,
                    relative_overshoot(since, rules.watched_age_years),
                ),
                reason: format!(
                    "Last watched {:.1} years ago (threshold: {}y)",
                    since, rules.watched_age_years
                ),
            });
        }
    }

    if let Some(rating) = item.rating {
        let old_enough = rules.low_rating_age_years.is_none_or(|min| age >= min);
        if rating < rules.low_rating_threshold && old_enough {
            hits.push(Hit {
                score: score(
                    LOW_RATING_BASE,
                    low_rating_overshoot(rating, rules.low_rating_threshold),
                ),
                reason: format!(
                    "Low rating ({:.1}) and {:.1} years old (threshold: {})",
                    rating, age, rules.low_rating_threshold
                ),
            });
        }
    }

    let size_gb = item.size_gb();
    if size_gb >= rules.large_file_gb {
        let fires = match rules.large_file_unwatched_years {
            Some(min_age) => unwatched && age >= min_age,
            None => true,
        };
        if fires {
            let reason = if unwatched {
                format!(
                    "Large file ({:.1}GB) unwatched for {:.1} years (threshold: {}GB)",
                    size_gb, age, rules.large_file_gb
                )
            } else {
                format!(
                    "Large file ({:.1}GB, threshold: {}GB)",
                    size_gb, rules.large_file_gb
                )
            };
            hits.push(Hit {
                score: score(
                    LARGE_FILE_BASE,
                    relative_overshoot(size_gb, rules.large_file_gb),
                ),
                reason,
            });
        }
    }

    hits
}

fn show_hits(
    item: &MediaItem,
    details: &ShowDetails,
    rules: &ShowRules,
    now: DateTime<Utc>,
) -> Vec<Hit> {
    let age = years_between(item.added_at, now);
    let since_watched = item.last_watched_at.map(|at| years_between(at, now));

    let hit = match (item.watch_state, since_watched) {
        (WatchState::Unwatched, _) if age >= rules.unwatched_age_years => Some(Hit {
            score: score(
                SHOW_UNWATCHED_BASE,
                relative_overshoot(age, rules.unwatched_age_years),
            ),
            reason: format!(
                "Never watched, added {:.1} years ago (threshold: {}y)",
                age, rules.unwatched_age_years
            ),
        }),
        (WatchState::FullyWatched, Some(since)) if since >= rules.fully_watched_age_years => {
            Some(Hit {
                score: score(
                    SHOW_FULLY_WATCHED_BASE,
                    relative_overshoot(since, rules.fully_watched_age_years),
                ),
                reason: format!(
                    "Fully watched, last view {:.1} years ago (threshold: {}y)",
                    since, rules.fully_watched_age_years
                ),
            })
        }
        (WatchState::PartiallyWatched, Some(since))
            if since >= rules.partially_watched_age_years =>
        {
            let percent = if details.episodes > 0 {
                details.watched_episodes as f64 / details.episodes as f64 * 100.0
            } else {
                0.0
            };
            Some(Hit {
                score: score(
                    SHOW_PARTIALLY_WATCHED_BASE,
                    relative_overshoot(since, rules.partially_watched_age_years),
                ),
                reason: format!(
                    "{:.0}% watched, abandoned {:.1} years ago (threshold: {}y)",
                    percent, since, rules.partially_watched_age_years
                ),
            })
        }
        _ => None,
    };

    hit.into_iter().collect()
}
