//! Sonarr and Radarr clients.

mod client;
mod models;
mod radarr;
mod sonarr;

pub use client::DEFAULT_CACHE_TTL_SECS;
pub use radarr::{RadarrClient, RadarrClientBuilder};
pub use sonarr::{SonarrClient, SonarrClientBuilder};
