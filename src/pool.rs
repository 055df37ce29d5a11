//! Ordered, mutable track pools.
//!
//! A build works against two pools: the user's saved tracks (primary) and
//! the featured catalog tracks (secondary). Pools are small, hundreds to a
//! few thousand tracks, so lookups and removals are plain linear scans.

use crate::error::Error;
use crate::track::Track;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Which source a pool was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// The user's own saved tracks
    Saved,
    /// Tracks pulled from featured catalog playlists
    Featured,
}

impl PoolKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PoolKind::Saved => "saved",
            PoolKind::Featured => "featured",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "saved" | "user" => Ok(PoolKind::Saved),
            "featured" => Ok(PoolKind::Featured),
            other => Err(Error::Configuration(format!(
                "Unknown pool '{other}'. Use 'saved' or 'featured'"
            ))),
        }
    }
}

/// An ordered collection of tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pool {
    tracks: Vec<Track>,
}

impl Pool {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    #[must_use]
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    /// Position of the first track sharing `track`'s identity key.
    #[must_use]
    pub fn index_of(&self, track: &Track) -> Option<usize> {
        self.position(&track.id)
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|candidate| candidate.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Removes the first track with the given identity key.
    pub fn remove(&mut self, id: &str) -> Option<Track> {
        self.position(id).map(|index| self.tracks.remove(index))
    }

    /// Removes repeated identity keys, keeping each key's first occurrence.
    ///
    /// Every later index that repeats an earlier key is marked, the marks are
    /// collapsed into a set, and the set is removed from the highest index
    /// down so pending indices stay valid.
    pub fn dedupe(&mut self) -> usize {
        let mut marked = BTreeSet::new();
        for (outer, track) in self.tracks.iter().enumerate() {
            for inner in (outer + 1)..self.tracks.len() {
                if track.id == self.tracks[inner].id {
                    marked.insert(inner);
                }
            }
        }

        for &index in marked.iter().rev() {
            self.tracks.remove(index);
        }

        if !marked.is_empty() {
            debug!("Removed {} duplicated tracks, {} remain", marked.len(), self.tracks.len());
        }
        marked.len()
    }

    /// Keeps at most `limit` tracks, in order.
    pub fn truncate(&mut self, limit: usize) {
        self.tracks.truncate(limit);
    }

    /// Keeps a uniform random sample of at most `limit` tracks.
    ///
    /// The sample is shuffled, so pool order after sampling is random too.
    pub fn sample<R: Rng + ?Sized>(&mut self, limit: usize, rng: &mut R) {
        if self.tracks.len() <= limit {
            return;
        }
        let (picked, _) = self.tracks.partial_shuffle(rng, limit);
        let picked = picked.to_vec();
        self.tracks = picked;
    }
}

impl From<Vec<Track>> for Pool {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

impl FromIterator<Track> for Pool {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Pool {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}
