mod client;
mod models;

pub use client::{PlexClient, PlexClientBuilder, DEFAULT_TIMEOUT_SECS};
