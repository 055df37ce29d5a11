//! Boundaries between the playlist core and the outside world.
//!
//! A [`TrackSource`] hands over fully materialized track lists, a
//! [`PlaylistPublisher`] receives the finished playlist. The local library
//! in [`crate::db`] implements both; the JSON types here cover exports and
//! one-off runs that skip the library.

use crate::builder::Playlist;
use crate::config::FluidConfig;
use crate::pool::{Pool, PoolKind};
use crate::track::{self, Track};
use anyhow::{Context, Result};
use log::{info, warn};
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Supplies the tracks of a pool.
pub trait TrackSource {
    /// # Errors
    ///
    /// Returns an error if the tracks cannot be read.
    fn fetch(&self, kind: PoolKind) -> Result<Vec<Track>>;
}

/// Persists a finished playlist.
pub trait PlaylistPublisher {
    /// # Errors
    ///
    /// Returns an error if the playlist cannot be stored.
    fn publish(&mut self, name: &str, playlist: &Playlist) -> Result<()>;
}

/// Reads a track export from disk.
pub fn read_tracks(path: &Path) -> Result<Vec<Track>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read track export {}", path.display()))?;
    track::parse_tracks(&raw)
        .with_context(|| format!("Invalid track export {}", path.display()))
}

/// Track exports on disk, one file per pool.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub saved: PathBuf,
    pub featured: PathBuf,
}

impl TrackSource for JsonFileSource {
    fn fetch(&self, kind: PoolKind) -> Result<Vec<Track>> {
        match kind {
            PoolKind::Saved => read_tracks(&self.saved),
            PoolKind::Featured => read_tracks(&self.featured),
        }
    }
}

/// Loads both pools and trims them to the configured limits.
///
/// Saved tracks are deduplicated, keep their order and are truncated;
/// featured tracks are randomly sampled.
pub fn prepare_pools<S, R>(source: &S, config: &FluidConfig, rng: &mut R) -> Result<(Pool, Pool)>
where
    S: TrackSource + ?Sized,
    R: Rng + ?Sized,
{
    let mut saved = Pool::new(source.fetch(PoolKind::Saved)?);
    let repeated = saved.dedupe();
    if repeated > 0 {
        warn!("Dropped {repeated} repeated saved tracks");
    }
    saved.truncate(config.saved_track_limit);

    let mut featured = Pool::new(source.fetch(PoolKind::Featured)?);
    featured.sample(config.featured_track_limit, rng);

    info!("Loaded {} saved and {} featured tracks", saved.len(), featured.len());
    Ok((saved, featured))
}

#[derive(Serialize)]
struct PlaylistExport<'a> {
    name: &'a str,
    uris: Vec<&'a str>,
    #[serde(flatten)]
    playlist: &'a Playlist,
}

/// Writes the playlist as JSON: name, ordered URIs and per-entry detail.
#[derive(Debug, Clone)]
pub struct JsonPlaylistWriter {
    path: PathBuf,
}

impl JsonPlaylistWriter {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PlaylistPublisher for JsonPlaylistWriter {
    fn publish(&mut self, name: &str, playlist: &Playlist) -> Result<()> {
        let export = PlaylistExport {
            name,
            uris: playlist.uris(),
            playlist,
        };
        let json = serde_json::to_string_pretty(&export)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write playlist to {}", self.path.display()))?;
        info!("Wrote playlist '{name}' to {}", self.path.display());
        Ok(())
    }
}
