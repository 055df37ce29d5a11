//! Tracks and their audio features.
//!
//! A [`Track`] is the unit the selection core works with: an identity key,
//! an opaque URI used when publishing, and a fixed set of optional audio
//! features. Features are validated once, when a track is ingested, so the
//! core never has to deal with non-finite values.

use crate::error::Error;
use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audio features known to the playlist core.
///
/// All of them are normalized to `[0, 1]` by the catalog, which is what the
/// trajectory sampling assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum Feature {
    Danceability,
    Energy,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Danceability,
        Feature::Energy,
        Feature::Speechiness,
        Feature::Acousticness,
        Feature::Instrumentalness,
        Feature::Liveness,
        Feature::Valence,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Feature::Danceability => "danceability",
            Feature::Energy => "energy",
            Feature::Speechiness => "speechiness",
            Feature::Acousticness => "acousticness",
            Feature::Instrumentalness => "instrumentalness",
            Feature::Liveness => "liveness",
            Feature::Valence => "valence",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Feature::ALL
            .into_iter()
            .find(|feature| feature.as_str() == needle)
            .ok_or_else(|| Error::UnknownFeature(s.to_string()))
    }
}

/// Fixed-shape audio feature record. Absent values stay `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub speechiness: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub instrumentalness: Option<f64>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
}

impl AudioFeatures {
    #[must_use]
    pub const fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Danceability => self.danceability,
            Feature::Energy => self.energy,
            Feature::Speechiness => self.speechiness,
            Feature::Acousticness => self.acousticness,
            Feature::Instrumentalness => self.instrumentalness,
            Feature::Liveness => self.liveness,
            Feature::Valence => self.valence,
        }
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        let slot = match feature {
            Feature::Danceability => &mut self.danceability,
            Feature::Energy => &mut self.energy,
            Feature::Speechiness => &mut self.speechiness,
            Feature::Acousticness => &mut self.acousticness,
            Feature::Instrumentalness => &mut self.instrumentalness,
            Feature::Liveness => &mut self.liveness,
            Feature::Valence => &mut self.valence,
        };
        *slot = value;
    }

    /// Drops NaN and infinite values. Returns how many were dropped.
    fn sanitize(&mut self) -> usize {
        let mut dropped = 0;
        for feature in Feature::ALL {
            if let Some(value) = self.get(feature) {
                if !value.is_finite() {
                    self.set(feature, None);
                    dropped += 1;
                }
            }
        }
        dropped
    }
}

/// A catalog track as seen by the playlist core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Identity key, unique within a pool.
    pub id: String,
    /// Opaque payload handed to publishers.
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub features: AudioFeatures,
}

impl Track {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, features: AudioFeatures) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            name: None,
            features,
        }
    }

    /// Test and bench shorthand: a track with only two features set.
    #[must_use]
    pub fn with_point(id: &str, axis_x: Feature, x: f64, axis_y: Feature, y: f64) -> Self {
        let mut features = AudioFeatures::default();
        features.set(axis_x, Some(x));
        features.set(axis_y, Some(y));
        Self::new(id, format!("spotify:track:{id}"), features)
    }

    #[must_use]
    pub const fn feature(&self, feature: Feature) -> Option<f64> {
        self.features.get(feature)
    }

    /// Coordinates on the given axis pair, or `None` if either value is absent.
    #[must_use]
    pub fn point(&self, axis_x: Feature, axis_y: Feature) -> Option<(f64, f64)> {
        Some((self.feature(axis_x)?, self.feature(axis_y)?))
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Shapes accepted when importing a track export.
///
/// Catalog exports come either as a bare array or wrapped in an
/// `audio_features` object; in both, unresolved entries are `null`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrackExport {
    Wrapped { audio_features: Vec<Option<Track>> },
    Bare(Vec<Option<Track>>),
}

/// Parses and validates a track export.
///
/// `null` entries and entries without an id are dropped, non-finite feature
/// values become absent.
pub fn parse_tracks(json: &str) -> serde_json::Result<Vec<Track>> {
    let entries = match serde_json::from_str::<TrackExport>(json)? {
        TrackExport::Wrapped { audio_features } => audio_features,
        TrackExport::Bare(entries) => entries,
    };

    let total = entries.len();
    let tracks: Vec<Track> = entries
        .into_iter()
        .flatten()
        .filter(|track| !track.id.trim().is_empty())
        .map(|mut track| {
            let dropped = track.features.sanitize();
            if dropped > 0 {
                warn!("Dropped {dropped} non-finite feature value(s) from track {}", track.id);
            }
            track
        })
        .collect();

    if tracks.len() < total {
        warn!("Skipped {} unresolved track entries", total - tracks.len());
    }

    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_parsing_is_case_insensitive() {
        assert_eq!("Energy".parse::<Feature>().unwrap(), Feature::Energy);
        assert_eq!(" danceability ".parse::<Feature>().unwrap(), Feature::Danceability);
        assert!(matches!("tempo".parse::<Feature>(), Err(Error::UnknownFeature(_))));
    }

    #[test]
    fn test_point_requires_both_axes() {
        let mut track = Track::with_point("a", Feature::Energy, 0.3, Feature::Danceability, 0.7);
        assert_eq!(track.point(Feature::Energy, Feature::Danceability), Some((0.3, 0.7)));
        assert_eq!(track.point(Feature::Energy, Feature::Valence), None);

        track.features.set(Feature::Energy, None);
        assert_eq!(track.point(Feature::Energy, Feature::Danceability), None);
    }

    #[test]
    fn test_parse_bare_export_drops_nulls() {
        let json = r#"[
            {"id": "a", "uri": "spotify:track:a", "energy": 0.1, "danceability": 0.2, "tempo": 120.0},
            null,
            {"id": "b", "uri": "spotify:track:b", "energy": null, "danceability": 0.5}
        ]"#;

        let tracks = parse_tracks(json).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].feature(Feature::Energy), Some(0.1));
        assert_eq!(tracks[1].feature(Feature::Energy), None);
        assert_eq!(tracks[1].feature(Feature::Danceability), Some(0.5));
    }

    #[test]
    fn test_parse_wrapped_export() {
        let json = r#"{"audio_features": [{"id": "x", "valence": 0.4}, null]}"#;
        let tracks = parse_tracks(json).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "x");
        assert_eq!(tracks[0].uri, "");
        assert_eq!(tracks[0].feature(Feature::Valence), Some(0.4));
    }

    #[test]
    fn test_parse_rejects_blank_ids() {
        let json = r#"[{"id": "  ", "energy": 0.5}, {"id": "ok", "energy": 0.5}]"#;
        let tracks = parse_tracks(json).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "ok");
    }

    #[test]
    fn test_sanitize_drops_non_finite() {
        let mut features = AudioFeatures {
            energy: Some(f64::NAN),
            valence: Some(0.5),
            ..AudioFeatures::default()
        };
        assert_eq!(features.sanitize(), 1);
        assert_eq!(features.energy, None);
        assert_eq!(features.valence, Some(0.5));
    }
}
