//! Plot data for inspecting a build.
//!
//! Nothing is rendered here. Each graph is written as JSON (the raw scatter
//! plus first- and second-degree fits sampled over `[0, 1]`) for whatever
//! plotting tool the user prefers.

use crate::builder::Playlist;
use crate::curve::{self, Polynomial, TrajectoryPoint};
use crate::track::{Feature, Track};
use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Samples drawn along each fitted curve.
const CURVE_SAMPLES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSeries {
    pub degree: usize,
    pub coefficients: Vec<f64>,
    pub samples: Vec<TrajectoryPoint>,
}

impl FitSeries {
    fn from_polynomial(polynomial: Polynomial) -> Self {
        Self {
            degree: polynomial.degree(),
            samples: polynomial.sample_unit_interval(CURVE_SAMPLES),
            coefficients: polynomial.coefficients,
        }
    }
}

/// Scatter of a track set on two features, with its fits when solvable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    pub axis_x: Feature,
    pub axis_y: Feature,
    pub points: Vec<TrajectoryPoint>,
    pub linear: Option<FitSeries>,
    pub quadratic: Option<FitSeries>,
}

impl Graph {
    /// Scatter only.
    pub fn scatter<'a>(tracks: impl IntoIterator<Item = &'a Track>, axis_x: Feature, axis_y: Feature) -> Self {
        let points = tracks
            .into_iter()
            .filter_map(|track| track.point(axis_x, axis_y))
            .map(|(x, y)| TrajectoryPoint::new(x, y))
            .collect();
        Self {
            axis_x,
            axis_y,
            points,
            linear: None,
            quadratic: None,
        }
    }

    /// Scatter plus both fits. A fit that cannot be solved is left out.
    pub fn with_fits<'a>(tracks: impl IntoIterator<Item = &'a Track>, axis_x: Feature, axis_y: Feature) -> Self {
        let mut graph = Self::scatter(tracks, axis_x, axis_y);
        let pairs: Vec<(f64, f64)> = graph.points.iter().map(|p| (p.x, p.y)).collect();

        graph.linear = match curve::fit_linear(&pairs) {
            Ok(polynomial) => Some(FitSeries::from_polynomial(polynomial)),
            Err(err) => {
                warn!("Skipping first-degree fit: {err}");
                None
            }
        };
        graph.quadratic = match curve::fit_quadratic(&pairs) {
            Ok(polynomial) => Some(FitSeries::from_polynomial(polynomial)),
            Err(err) => {
                warn!("Skipping second-degree fit: {err}");
                None
            }
        };
        graph
    }
}

fn write_graph(path: &Path, graph: &Graph) -> Result<()> {
    let json = serde_json::to_string_pretty(graph)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Writes the graphs for one build under `<out_dir>/<user_id>/`.
///
/// Layout:
/// - `saved.json`: saved tracks with fits
/// - `featured.json`: featured tracks, scatter only
/// - `generated/playlist.json`: the playlist's tracks with fits
///
/// Returns the user's folder.
pub fn write_build_graphs<'a>(
    out_dir: &Path,
    user_id: &str,
    saved: impl IntoIterator<Item = &'a Track>,
    featured: impl IntoIterator<Item = &'a Track>,
    playlist: &Playlist,
    axis_x: Feature,
    axis_y: Feature,
) -> Result<PathBuf> {
    let user_dir = out_dir.join(user_id);
    let generated_dir = user_dir.join("generated");
    fs::create_dir_all(&generated_dir)
        .with_context(|| format!("Failed to create diagnostics folder {}", generated_dir.display()))?;

    write_graph(&user_dir.join("saved.json"), &Graph::with_fits(saved, axis_x, axis_y))?;
    write_graph(&user_dir.join("featured.json"), &Graph::scatter(featured, axis_x, axis_y))?;
    write_graph(
        &generated_dir.join("playlist.json"),
        &Graph::with_fits(playlist.tracks(), axis_x, axis_y),
    )?;

    info!("Wrote diagnostics to {}", user_dir.display());
    Ok(user_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::generate;
    use crate::config::FluidConfig;
    use crate::pool::Pool;
    use tempfile::TempDir;

    fn tracks(points: &[(f64, f64)]) -> Vec<Track> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Track::with_point(&format!("t{i}"), Feature::Energy, x, Feature::Danceability, y))
            .collect()
    }

    #[test]
    fn test_graph_fits_when_solvable() {
        let tracks = tracks(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]);
        let graph = Graph::with_fits(&tracks, Feature::Energy, Feature::Danceability);

        assert_eq!(graph.points.len(), 3);
        assert_eq!(graph.linear.as_ref().map(|f| f.degree), Some(1));
        let quadratic = graph.quadratic.expect("three points fit a parabola");
        assert_eq!(quadratic.samples.len(), CURVE_SAMPLES);
    }

    #[test]
    fn test_graph_omits_unsolvable_fits() {
        let tracks = tracks(&[(0.3, 0.3)]);
        let graph = Graph::with_fits(&tracks, Feature::Energy, Feature::Danceability);

        assert_eq!(graph.points.len(), 1);
        assert!(graph.linear.is_none());
        assert!(graph.quadratic.is_none());
    }

    #[test]
    fn test_write_build_graphs_layout() -> Result<()> {
        let dir = TempDir::new()?;
        let saved = tracks(&[(0.0, 0.1), (0.3, 0.2), (0.6, 0.5), (0.9, 0.9)]);
        let featured = tracks(&[(0.5, 0.5)]);
        let mut primary = Pool::new(saved.clone());
        let mut secondary = Pool::new(featured.clone());
        let playlist = generate(&mut primary, &mut secondary, &FluidConfig {
            num_points: 4,
            ..FluidConfig::default()
        })?;

        let user_dir = write_build_graphs(
            dir.path(),
            "listener",
            &saved,
            &featured,
            &playlist,
            Feature::Energy,
            Feature::Danceability,
        )?;

        assert_eq!(user_dir, dir.path().join("listener"));
        assert!(user_dir.join("saved.json").is_file());
        assert!(user_dir.join("featured.json").is_file());
        let generated: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(user_dir.join("generated/playlist.json"))?)?;
        assert_eq!(generated["points"].as_array().unwrap().len(), 4);
        assert_eq!(generated["axis_x"], "energy");
        Ok(())
    }
}
