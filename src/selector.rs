//! Nearest-track selection around a trajectory point.
//!
//! Selection is two-phase: the saved pool is searched first, and the
//! featured pool is only consulted when nothing in the saved pool lies
//! within the threshold. Selection never mutates either pool.

use crate::curve::TrajectoryPoint;
use crate::pool::{Pool, PoolKind};
use crate::track::{Feature, Track};

/// A track picked for a trajectory point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub track: &'a Track,
    pub distance: f64,
    pub source: PoolKind,
}

/// Closest track in a single pool within `threshold` of `point`.
///
/// Tracks missing either axis value are skipped. Ties keep the earlier
/// track, since only a strictly smaller distance replaces the current best.
#[must_use]
pub fn nearest_in<'a>(
    pool: &'a Pool,
    point: TrajectoryPoint,
    threshold: f64,
    axis_x: Feature,
    axis_y: Feature,
) -> Option<(&'a Track, f64)> {
    let mut best: Option<(&Track, f64)> = None;

    for track in pool {
        let Some((x, y)) = track.point(axis_x, axis_y) else {
            continue;
        };
        let distance = point.distance_to(x, y);
        if distance > threshold {
            continue;
        }
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((track, distance));
        }
    }

    best
}

/// Picks the track for `point`, preferring the primary pool.
#[must_use]
pub fn select<'a>(
    point: TrajectoryPoint,
    threshold: f64,
    primary: &'a Pool,
    secondary: &'a Pool,
    axis_x: Feature,
    axis_y: Feature,
) -> Option<Selection<'a>> {
    [(primary, PoolKind::Saved), (secondary, PoolKind::Featured)]
        .into_iter()
        .find_map(|(pool, source)| {
            nearest_in(pool, point, threshold, axis_x, axis_y).map(|(track, distance)| Selection {
                track,
                distance,
                source,
            })
        })
}
