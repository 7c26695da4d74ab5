use std::sync::Arc;

use crate::error::{LifecycleError, Result};
use crate::fs::LocalFilesystem;
use crate::{Filesystem, MediaServer, MovieTracker, ShowTracker};

/// The collaborators one engine talks to. Only the media server is
/// mandatory; without trackers nothing is protected or unmonitored.
#[derive(Clone)]
pub struct Services {
    media_server: Arc<dyn MediaServer>,
    show_tracker: Option<Arc<dyn ShowTracker>>,
    movie_tracker: Option<Arc<dyn MovieTracker>>,
    filesystem: Arc<dyn Filesystem>,
}

impl Services {
    pub fn media_server(&self) -> &dyn MediaServer {
        self.media_server.as_ref()
    }

    pub fn show_tracker(&self) -> Option<&dyn ShowTracker> {
        self.show_tracker.as_deref()
    }

    pub fn movie_tracker(&self) -> Option<&dyn MovieTracker> {
        self.movie_tracker.as_deref()
    }

    pub fn filesystem(&self) -> &dyn Filesystem {
        self.filesystem.as_ref()
    }

    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut services = vec![(self.media_server.id(), self.media_server.name())];
        if let Some(tracker) = &self.show_tracker {
            services.push((tracker.id(), tracker.name()));
        }
        if let Some(tracker) = &self.movie_tracker {
            services.push((tracker.id(), tracker.name()));
        }
        services
    }
}

pub struct ServicesBuilder {
    media_server: Option<Arc<dyn MediaServer>>,
    show_tracker: Option<Arc<dyn ShowTracker>>,
    movie_tracker: Option<Arc<dyn MovieTracker>>,
    filesystem: Option<Arc<dyn Filesystem>>,
}

impl ServicesBuilder {
    pub fn new() -> Self {
        Self {
            media_server: None,
            show_tracker: None,
            movie_tracker: None,
            filesystem: None,
        }
    }

    pub fn media_server(mut self, server: impl MediaServer + 'static) -> Self {
        self.media_server = Some(Arc::new(server));
        self
    }

    pub fn show_tracker(mut self, tracker: impl ShowTracker + 'static) -> Self {
        self.show_tracker = Some(Arc::new(tracker));
        self
    }

    pub fn movie_tracker(mut self, tracker: impl MovieTracker + 'static) -> Self {
        self.movie_tracker = Some(Arc::new(tracker));
        self
    }

    pub fn filesystem(mut self, filesystem: impl Filesystem + 'static) -> Self {
        self.filesystem = Some(Arc::new(filesystem));
        self
    }

    /// Shared handles, for callers that keep their own reference to a
    /// collaborator (tests inspecting a fake, for instance).
    pub fn media_server_arc(mut self, server: Arc<dyn MediaServer>) -> Self {
        self.media_server = Some(server);
        self
    }

    pub fn show_tracker_arc(mut self, tracker: Arc<dyn ShowTracker>) -> Self {
        self.show_tracker = Some(tracker);
        self
    }

    pub fn movie_tracker_arc(mut self, tracker: Arc<dyn MovieTracker>) -> Self {
        self.movie_tracker = Some(tracker);
        self
    }

    pub fn filesystem_arc(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn build(self) -> Result<Services> {
        let media_server = self
            .media_server
            .ok_or(LifecycleError::NotConfigured("media server"))?;

        Ok(Services {
            media_server,
            show_tracker: self.show_tracker,
            movie_tracker: self.movie_tracker,
            filesystem: self
                .filesystem
                .unwrap_or_else(|| Arc::new(LocalFilesystem::new())),
        })
    }
}

impl Default for ServicesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
