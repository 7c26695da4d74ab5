#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reclaimarr::{
    error::{LifecycleError, Result},
    EngineSettings, Filesystem, MediaServer, MovieId, MovieTracker, SeriesId, SeriesStatus,
    Services, ServicesBuilder, ShowTracker,
};
use shared::{
    catalog::{RawAudioStream, RawItem, RawLibrary, RawPart},
    library::{ItemId, MediaType},
};
use tokio::sync::Notify;

pub const MOVIES: &str = "1";
pub const SHOWS: &str = "2";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

pub fn years_ago(years: f64) -> i64 {
    (now() - Duration::days((years * 365.25).round() as i64)).timestamp()
}

pub fn libraries() -> Vec<RawLibrary> {
    vec![
        RawLibrary {
            id: MOVIES.into(),
            name: "Movies".into(),
            media_type: MediaType::Movie,
            locations: vec!["/media/movies".into()],
        },
        RawLibrary {
            id: SHOWS.into(),
            name: "TV Shows".into(),
            media_type: MediaType::Show,
            locations: vec!["/media/tv".into()],
        },
    ]
}

pub fn raw_movie(id: &str, title: &str, year: u16) -> RawItem {
    RawItem {
        id: id.into(),
        title: title.into(),
        year: Some(year),
        media_type: Some(MediaType::Movie),
        added_at: years_ago(1.0),
        parts: vec![RawPart {
            file: format!("/media/movies/{title} ({year})/{title}.{id}.mkv"),
            size: Some(8 * 1024 * 1024 * 1024),
        }],
        video_resolution: Some("1080".into()),
        ..RawItem::default()
    }
}

pub fn raw_show(id: &str, title: &str, episodes: u32, watched: u32) -> RawItem {
    RawItem {
        id: id.into(),
        title: title.into(),
        year: Some(2015),
        media_type: Some(MediaType::Show),
        added_at: years_ago(1.0),
        leaf_count: Some(episodes),
        viewed_leaf_count: Some(watched),
        child_count: Some(1),
        parts: (1..=episodes)
            .map(|ep| RawPart {
                file: format!("/media/tv/{title}/Season 01/{title} S01E{ep:02}.mkv"),
                size: Some(1024 * 1024 * 1024),
            })
            .collect(),
        video_resolution: Some("720".into()),
        ..RawItem::default()
    }
}

pub fn dutch_audio() -> Vec<RawAudioStream> {
    vec![RawAudioStream {
        language_code: Some("nld".into()),
        ..RawAudioStream::default()
    }]
}

/// Blocks `list_libraries` until released, to hold an analysis run open.
#[derive(Clone, Default)]
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct FakeMediaServer {
    pub libraries: Vec<RawLibrary>,
    pub items: Mutex<HashMap<String, Vec<RawItem>>>,
    pub unreachable: bool,
    pub failing_removals: HashSet<String>,
    pub removed: Mutex<Vec<ItemId>>,
    pub hold: Option<Hold>,
}

impl FakeMediaServer {
    pub fn new(items: Vec<RawItem>) -> Self {
        let mut by_library: HashMap<String, Vec<RawItem>> = HashMap::new();
        for item in items {
            let library = match item.media_type {
                Some(MediaType::Show) => SHOWS,
                _ => MOVIES,
            };
            by_library.entry(library.to_string()).or_default().push(item);
        }
        Self {
            libraries: libraries(),
            items: Mutex::new(by_library),
            ..Default::default()
        }
    }

    pub fn removed(&self) -> Vec<ItemId> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaServer for FakeMediaServer {
    fn id(&self) -> &'static str {
        "fake-plex"
    }

    fn name(&self) -> &'static str {
        "Fake Plex"
    }

    async fn list_libraries(&self) -> Result<Vec<RawLibrary>> {
        if let Some(hold) = &self.hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        if self.unreachable {
            return Err(LifecycleError::Connectivity {
                service: "fake-plex",
                message: "connection refused".into(),
            });
        }
        Ok(self.libraries.clone())
    }

    async fn list_items(&self, library_id: &str) -> Result<Vec<RawItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(library_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_item(&self, item_id: &ItemId) -> Result<()> {
        if self.failing_removals.contains(item_id.as_str()) {
            return Err(LifecycleError::Api {
                service: "fake-plex",
                status: 500,
                message: "delete failed".into(),
            });
        }
        self.removed.lock().unwrap().push(item_id.clone());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.unreachable
    }
}

#[derive(Default)]
pub struct FakeShowTracker {
    pub series: Vec<(i64, String, SeriesStatus)>,
    pub unreachable: bool,
    pub unmonitored: Mutex<Vec<SeriesId>>,
}

impl FakeShowTracker {
    pub fn with_series(series: &[(i64, &str, SeriesStatus)]) -> Self {
        Self {
            series: series
                .iter()
                .map(|(id, title, status)| (*id, title.to_string(), *status))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ShowTracker for FakeShowTracker {
    fn id(&self) -> &'static str {
        "fake-sonarr"
    }

    fn name(&self) -> &'static str {
        "Fake Sonarr"
    }

    async fn find_series(&self, title: &str) -> Result<Option<SeriesId>> {
        if self.unreachable {
            return Err(LifecycleError::Connectivity {
                service: "fake-sonarr",
                message: "connection refused".into(),
            });
        }
        Ok(self
            .series
            .iter()
            .find(|(_, t, _)| t.eq_ignore_ascii_case(title))
            .map(|(id, _, _)| SeriesId(*id)))
    }

    async fn get_status(&self, series_id: SeriesId) -> Result<SeriesStatus> {
        self.series
            .iter()
            .find(|(id, _, _)| *id == series_id.0)
            .map(|(_, _, status)| *status)
            .ok_or(LifecycleError::Api {
                service: "fake-sonarr",
                status: 404,
                message: "no such series".into(),
            })
    }

    async fn unmonitor(&self, series_id: SeriesId) -> Result<()> {
        self.unmonitored.lock().unwrap().push(series_id);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.unreachable
    }
}

#[derive(Default)]
pub struct FakeMovieTracker {
    pub movies: Vec<(i64, String, u16)>,
    pub failing: bool,
    pub unmonitored: Mutex<Vec<MovieId>>,
}

impl FakeMovieTracker {
    pub fn with_movies(movies: &[(i64, &str, u16)]) -> Self {
        Self {
            movies: movies
                .iter()
                .map(|(id, title, year)| (*id, title.to_string(), *year))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MovieTracker for FakeMovieTracker {
    fn id(&self) -> &'static str {
        "fake-radarr"
    }

    fn name(&self) -> &'static str {
        "Fake Radarr"
    }

    async fn find_movie(&self, title: &str, year: Option<u16>) -> Result<Option<MovieId>> {
        Ok(self
            .movies
            .iter()
            .find(|(_, t, y)| t.eq_ignore_ascii_case(title) && year.is_none_or(|year| year == *y))
            .map(|(id, _, _)| MovieId(*id)))
    }

    async fn unmonitor(&self, movie_id: MovieId) -> Result<()> {
        if self.failing {
            return Err(LifecycleError::Api {
                service: "fake-radarr",
                status: 500,
                message: "update failed".into(),
            });
        }
        self.unmonitored.lock().unwrap().push(movie_id);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Records deletions instead of touching the disk.
#[derive(Default)]
pub struct FakeFilesystem {
    pub failing: HashSet<PathBuf>,
    pub attempted: Mutex<Vec<PathBuf>>,
    pub deleted: Mutex<Vec<PathBuf>>,
    pub pruned: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeFilesystem {
    pub fn failing_on(paths: &[&str]) -> Self {
        Self {
            failing: paths.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    pub fn deleted(&self) -> Vec<PathBuf> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn attempted(&self) -> Vec<PathBuf> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Filesystem for FakeFilesystem {
    async fn delete_path(&self, path: &Path) -> Result<()> {
        self.attempted.lock().unwrap().push(path.to_path_buf());
        if self.failing.contains(path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )
            .into());
        }
        self.deleted.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn prune_empty_dirs(&self, start: &Path, root: &Path) -> Result<Vec<PathBuf>> {
        self.pruned
            .lock()
            .unwrap()
            .push((start.to_path_buf(), root.to_path_buf()));
        Ok(Vec::new())
    }
}

/// Handles on the fakes behind an engine, for assertions.
pub struct Fakes {
    pub server: Arc<FakeMediaServer>,
    pub shows: Option<Arc<FakeShowTracker>>,
    pub movies: Option<Arc<FakeMovieTracker>>,
    pub fs: Arc<FakeFilesystem>,
}

impl Fakes {
    pub fn new(server: FakeMediaServer) -> Self {
        Self {
            server: Arc::new(server),
            shows: None,
            movies: None,
            fs: Arc::new(FakeFilesystem::default()),
        }
    }

    pub fn with_shows(mut self, tracker: FakeShowTracker) -> Self {
        self.shows = Some(Arc::new(tracker));
        self
    }

    pub fn with_movies(mut self, tracker: FakeMovieTracker) -> Self {
        self.movies = Some(Arc::new(tracker));
        self
    }

    pub fn with_fs(mut self, fs: FakeFilesystem) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    pub fn services(&self) -> Services {
        let mut builder = ServicesBuilder::new()
            .media_server_arc(self.server.clone())
            .filesystem_arc(self.fs.clone());
        if let Some(shows) = &self.shows {
            builder = builder.show_tracker_arc(shows.clone());
        }
        if let Some(movies) = &self.movies {
            builder = builder.movie_tracker_arc(movies.clone());
        }
        builder.build().unwrap()
    }
}

pub fn settings(dir: &Path) -> EngineSettings {
    EngineSettings {
        timeout_secs: 5,
        reports_dir: Some(dir.join("reports")),
        backup_dir: dir.join("reports").join("backups"),
        ..EngineSettings::default()
    }
}
