use async_trait::async_trait;
use shared::{
    catalog::{RawItem, RawLibrary},
    library::ItemId,
};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovieId(pub i64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStatus {
    Continuing,
    Ended,
}

#[async_trait]
pub trait MediaServer: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn list_libraries(&self) -> Result<Vec<RawLibrary>>;
    async fn list_items(&self, library_id: &str) -> Result<Vec<RawItem>>;
    async fn remove_item(&self, item_id: &ItemId) -> Result<()>;
    async fn health_check(&self) -> bool;
}

#[async_trait]
pub trait ShowTracker: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn find_series(&self, title: &str) -> Result<Option<SeriesId>>;
    async fn get_status(&self, series_id: SeriesId) -> Result<SeriesStatus>;
    async fn unmonitor(&self, series_id: SeriesId) -> Result<()>;
    async fn health_check(&self) -> bool;
}

#[async_trait]
pub trait MovieTracker: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn find_movie(&self, title: &str, year: Option<u16>) -> Result<Option<MovieId>>;
    async fn unmonitor(&self, movie_id: MovieId) -> Result<()>;
    async fn health_check(&self) -> bool;
}

#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Delete a single file. A path that is already gone is not an error;
    /// a directory is refused.
    async fn delete_path(&self, path: &Path) -> Result<()>;

    /// Remove `start` and its ancestors while they are empty, stopping
    /// before `root`. Returns the directories removed, deepest first.
    async fn prune_empty_dirs(&self, start: &Path, root: &Path) -> Result<Vec<PathBuf>>;
}

/// What the lifecycle engine knows about the item being looked up.
#[derive(Debug, Clone, Copy)]
pub struct TitleQuery<'a> {
    pub title: &'a str,
    pub year: Option<u16>,
}

/// Strategy deciding whether a tracker entry corresponds to a catalog item.
pub trait TitleMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, query: TitleQuery<'_>, candidate_title: &str, candidate_year: Option<u16>)
        -> bool;
}
