//! Curve-guided playlists from two pools of tracks.
//!
//! Fluid fits a smooth trajectory through the user's saved tracks in a
//! two-feature space (energy against danceability by default), then walks
//! that trajectory and picks, for each point, the closest track that has
//! not been used yet. Saved tracks are preferred; featured catalog tracks
//! fill the gaps.
//!
//! Core modules:
//! - [`curve`] - Least-squares trajectory fitting
//! - [`selector`] - Two-phase nearest-track selection
//! - [`builder`] - Playlist construction with a widening search radius
//! - [`pool`] - Track pools, deduplication and identity lookup
//! - [`track`] - Tracks and audio features
//!
//! ### Supporting Modules
//!
//! - [`config`] - Build settings and data directory management
//! - [`catalog`] - Track source and playlist publisher boundaries
//! - [`db`] - Local SQLite track library
//! - [`diagnostics`] - Plot data export
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use fluid::builder::generate;
//! use fluid::config::FluidConfig;
//! use fluid::pool::Pool;
//! use fluid::track::{Feature, Track};
//!
//! let mut saved: Pool = (0..10)
//!     .map(|i| {
//!         let x = f64::from(i) / 10.0;
//!         Track::with_point(&format!("s{i}"), Feature::Energy, x, Feature::Danceability, x * x)
//!     })
//!     .collect();
//! let mut featured = Pool::default();
//!
//! let config = FluidConfig { num_points: 5, ..FluidConfig::default() };
//! let playlist = generate(&mut saved, &mut featured, &config)?;
//!
//! assert_eq!(playlist.len(), 5);
//! assert_eq!(saved.len(), 5);
//! # Ok::<(), fluid::error::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! The core returns [`error::Error`]: fit failures, exhausted selection and
//! bad configuration. The library, settings and CLI layers use
//! `anyhow::Result` and wrap core errors with context.

pub mod builder;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod curve;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod pool;
pub mod selector;
pub mod track;
