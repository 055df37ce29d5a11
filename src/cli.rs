//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `fluid` binary.
//!
//! ## Commands
//!
//! - `init-db`: Create the local track library
//! - `import`: Load a track export into the saved or featured pool
//! - `list`: Show the tracks of a pool
//! - `fit`: Print the trajectory fitted through a pool
//! - `build`: Build and publish a fluid playlist
//! - `playlists` / `show`: Inspect published playlists
//!
//! ## Examples
//!
//! ```bash
//! fluid import saved saved_tracks.json
//! fluid import featured featured_tracks.json
//! fluid build --name "Sunday Drift" --points 40
//! ```

use crate::config::FluidConfig;
use crate::pool::PoolKind;
use crate::track::Feature;
use clap::{Args as ClapArgs, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "fluid")]
#[command(about = "Fluid: curve-guided playlists from your saved and featured tracks")]
#[command(version)]
pub struct Args {
    /// Library database to use instead of the platform default
    #[arg(long, global = true, env = "FLUID_DB")]
    pub db: Option<PathBuf>,

    /// Settings file to use instead of the platform default
    #[arg(long, global = true, env = "FLUID_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the track library
    InitDb {
        /// Delete and recreate an existing library
        #[arg(long)]
        force: bool,
    },

    /// Import a track export into a pool
    ///
    /// Accepts either a JSON array of track records or an object with an
    /// `audio_features` array. `null` entries are skipped.
    Import {
        /// Pool to import into: "saved" or "featured"
        pool: PoolKind,

        /// Path to the JSON export
        path: PathBuf,

        /// Replace the pool's current contents instead of appending
        #[arg(long)]
        replace: bool,
    },

    /// List the tracks of a pool
    List {
        /// Pool to list: "saved" or "featured"
        pool: PoolKind,
    },

    /// Print the trajectory fitted through a pool
    Fit {
        /// Pool to fit: "saved" or "featured"
        #[arg(default_value = "saved")]
        pool: PoolKind,

        #[command(flatten)]
        axes: AxisArgs,

        /// Number of trajectory points
        #[arg(long)]
        points: Option<usize>,
    },

    /// Build a fluid playlist and publish it to the library
    Build(BuildArgs),

    /// List published playlists
    Playlists,

    /// Show a published playlist
    Show {
        /// Playlist name; the most recent one wins on duplicates
        name: String,
    },

    /// Generate shell completions
    ///
    /// Usage: fluid completion bash > ~/.local/share/bash-completion/completions/fluid
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Feature axes, overriding the settings file.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct AxisArgs {
    /// Feature on the x axis
    #[arg(long, value_enum, ignore_case = true)]
    pub axis_x: Option<Feature>,

    /// Feature on the y axis
    #[arg(long, value_enum, ignore_case = true)]
    pub axis_y: Option<Feature>,
}

/// Options of the `build` command. Unset values come from the settings file.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Name to publish the playlist under
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub axes: AxisArgs,

    /// Number of playlist tracks (trajectory points)
    #[arg(long)]
    pub points: Option<usize>,

    /// Search radius each point starts with
    #[arg(long)]
    pub initial_threshold: Option<f64>,

    /// Radius growth after a miss
    #[arg(long)]
    pub threshold_step: Option<f64>,

    /// Radius at which a point is given up on
    #[arg(long)]
    pub max_threshold: Option<f64>,

    /// Read saved tracks from this export instead of the library
    #[arg(long, requires = "featured_file")]
    pub saved_file: Option<PathBuf>,

    /// Read featured tracks from this export instead of the library
    #[arg(long, requires = "saved_file")]
    pub featured_file: Option<PathBuf>,

    /// Seed for sampling the featured pool
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also write the playlist as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write plot data under this folder
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Folder name for diagnostics
    #[arg(long, default_value = "local")]
    pub user: String,

    /// Build without saving to the library
    #[arg(long)]
    pub dry_run: bool,
}

impl AxisArgs {
    pub fn apply(&self, config: &mut FluidConfig) {
        if let Some(axis_x) = self.axis_x {
            config.axis_x = axis_x;
        }
        if let Some(axis_y) = self.axis_y {
            config.axis_y = axis_y;
        }
    }
}

impl BuildArgs {
    /// Copies every flag that was given onto `config`.
    pub fn apply(&self, config: &mut FluidConfig) {
        self.axes.apply(config);
        if let Some(name) = &self.name {
            config.playlist_name = name.clone();
        }
        if let Some(points) = self.points {
            config.num_points = points;
        }
        if let Some(initial) = self.initial_threshold {
            config.initial_threshold = initial;
        }
        if let Some(step) = self.threshold_step {
            config.threshold_step = step;
        }
        if let Some(max) = self.max_threshold {
            config.max_threshold = max;
        }
    }
}
