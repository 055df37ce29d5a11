//! Fluid playlist construction.
//!
//! The builder walks the fitted trajectory in order. For each point it asks
//! the selector for a track, widening the search radius by a fixed step
//! until something qualifies, then removes the chosen track from both pools
//! so it cannot be picked again.

use crate::config::FluidConfig;
use crate::curve::{self, TrajectoryPoint};
use crate::error::{Error, Result};
use crate::pool::{Pool, PoolKind};
use crate::selector;
use crate::track::{Feature, Track};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

/// Most radius increments a single point may go through.
pub const MAX_THRESHOLD_STEPS: usize = 100_000;

/// Threshold schedule for a build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
    /// Search radius every point starts with
    pub initial_threshold: f64,
    /// Amount the radius grows after a miss
    pub threshold_step: f64,
    /// Radius beyond which a point is declared unsatisfiable
    pub max_threshold: f64,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            initial_threshold: 0.01,
            threshold_step: 0.01,
            // Past the unit square's diagonal, so normalized tracks are always reachable.
            max_threshold: 2.0,
        }
    }
}

impl BuildParams {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a negative initial threshold, a
    /// non-positive step, or a cap below the initial threshold. A step too
    /// small to reach the cap within [`MAX_THRESHOLD_STEPS`] is rejected too.
    pub fn validate(&self) -> Result<()> {
        if !self.initial_threshold.is_finite() || self.initial_threshold < 0.0 {
            return Err(Error::Configuration(format!(
                "initial threshold must be a non-negative number, got {}",
                self.initial_threshold
            )));
        }
        if !self.threshold_step.is_finite() || self.threshold_step <= 0.0 {
            return Err(Error::Configuration(format!(
                "threshold step must be positive, got {}",
                self.threshold_step
            )));
        }
        if !self.max_threshold.is_finite() || self.max_threshold < self.initial_threshold {
            return Err(Error::Configuration(format!(
                "max threshold must be at least the initial threshold ({}), got {}",
                self.initial_threshold, self.max_threshold
            )));
        }
        if self.initial_threshold + self.threshold_step == self.initial_threshold
            || (self.max_threshold - self.initial_threshold) / self.threshold_step
                > MAX_THRESHOLD_STEPS as f64
        {
            return Err(Error::Configuration(format!(
                "threshold step {} is too small to reach {} from {} in {MAX_THRESHOLD_STEPS} steps",
                self.threshold_step, self.max_threshold, self.initial_threshold
            )));
        }
        Ok(())
    }

    /// Number of increments tried after the initial radius.
    ///
    /// Only meaningful once [`BuildParams::validate`] has passed.
    #[must_use]
    pub fn steps(&self) -> usize {
        // Absorbs rounding so an evenly dividing step lands on the cap.
        let steps = ((self.max_threshold - self.initial_threshold) / self.threshold_step + 1e-9).floor();
        (steps as usize).min(MAX_THRESHOLD_STEPS)
    }

    /// Search radius after `step` increments, never above the cap.
    #[must_use]
    pub fn threshold_at(&self, step: usize) -> f64 {
        (self.initial_threshold + step as f64 * self.threshold_step).min(self.max_threshold)
    }
}

/// One playlist position and how it was filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub track: Track,
    pub point: TrajectoryPoint,
    pub distance: f64,
    /// Search radius at which the track was accepted
    pub threshold: f64,
    pub source: PoolKind,
}

/// The ordered result of a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter().map(|entry| &entry.track)
    }

    #[must_use]
    pub fn uris(&self) -> Vec<&str> {
        self.tracks().map(|track| track.uri.as_str()).collect()
    }

    /// How many entries came from each pool, as `(saved, featured)`.
    #[must_use]
    pub fn source_counts(&self) -> (usize, usize) {
        self.entries.iter().fold((0, 0), |(saved, featured), entry| match entry.source {
            PoolKind::Saved => (saved + 1, featured),
            PoolKind::Featured => (saved, featured + 1),
        })
    }
}

/// Walks a trajectory and fills one playlist slot per point.
#[derive(Debug, Clone)]
pub struct PlaylistBuilder {
    axis_x: Feature,
    axis_y: Feature,
    params: BuildParams,
}

impl PlaylistBuilder {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `params` is malformed.
    pub fn new(axis_x: Feature, axis_y: Feature, params: BuildParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            axis_x,
            axis_y,
            params,
        })
    }

    /// Builds the playlist, consuming chosen tracks from the pools.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SelectionExhausted`] when a point finds no track
    /// at any radius up to `max_threshold`. The pools keep the
    /// removals made up to that point.
    pub fn build(
        &self,
        primary: &mut Pool,
        secondary: &mut Pool,
        trajectory: &[TrajectoryPoint],
    ) -> Result<Playlist> {
        let mut playlist = Playlist {
            entries: Vec::with_capacity(trajectory.len()),
        };

        for (index, &point) in trajectory.iter().enumerate() {
            let entry = self.fill_point(index, point, primary, secondary)?;

            primary.remove(&entry.track.id);
            secondary.remove(&entry.track.id);

            debug!(
                "#{index} ({:.3}, {:.3}) -> {} from {} pool (distance {:.4}, threshold {:.2})",
                point.x,
                point.y,
                entry.track.label(),
                entry.source,
                entry.distance,
                entry.threshold
            );
            playlist.entries.push(entry);
        }

        let (saved, featured) = playlist.source_counts();
        info!(
            "Built playlist of {} tracks ({saved} saved, {featured} featured)",
            playlist.len()
        );
        Ok(playlist)
    }

    fn fill_point(
        &self,
        index: usize,
        point: TrajectoryPoint,
        primary: &Pool,
        secondary: &Pool,
    ) -> Result<PlaylistEntry> {
        let mut threshold = self.params.initial_threshold;

        for step in 0..=self.params.steps() {
            threshold = self.params.threshold_at(step);
            if step > 0 {
                trace!("No track near point #{index}, widening threshold to {threshold:.3}");
            }
            if let Some(selection) =
                selector::select(point, threshold, primary, secondary, self.axis_x, self.axis_y)
            {
                return Ok(PlaylistEntry {
                    track: selection.track.clone(),
                    point,
                    distance: selection.distance,
                    threshold,
                    source: selection.source,
                });
            }
        }

        Err(Error::SelectionExhausted {
            point_index: index,
            x: point.x,
            y: point.y,
            threshold,
        })
    }
}

/// Full flow: dedupe the featured pool, fit the saved pool, build.
///
/// # Errors
///
/// Fails on invalid configuration before touching the pools, then on
/// fitting or exhausted selection.
pub fn generate(primary: &mut Pool, secondary: &mut Pool, config: &FluidConfig) -> Result<Playlist> {
    config.validate()?;
    let builder = PlaylistBuilder::new(config.axis_x, config.axis_y, config.build_params())?;

    secondary.dedupe();

    let trajectory = curve::fit_trajectory(primary, config.axis_x, config.axis_y, config.num_points)?;
    builder.build(primary, secondary, &trajectory)
}
