//! # Fluid - Curve-Guided Playlists
//!
//! Fluid builds playlists that drift smoothly through audio-feature space,
//! following a curve fitted through your saved tracks and filling gaps from
//! featured catalog tracks.
//!
//! ## Usage
//!
//! ```bash
//! # Create the library and load track exports
//! fluid init-db
//! fluid import saved saved_tracks.json
//! fluid import featured featured_tracks.json
//!
//! # Build with the default energy/danceability axes
//! fluid build --name "Fluid Playlist"
//!
//! # Inspect the result
//! fluid playlists
//! fluid show "Fluid Playlist"
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use fluid::builder;
use fluid::catalog::{self, JsonFileSource, JsonPlaylistWriter, PlaylistPublisher, TrackSource};
use fluid::cli::{self, BuildArgs};
use fluid::completion;
use fluid::config::{FluidConfig, RuntimeConfig};
use fluid::curve;
use fluid::db::Library;
use fluid::diagnostics;
use fluid::pool::Pool;
use fluid::track::{Feature, Track};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Main entry point for the Fluid application.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug fluid build` - Show every pick
/// - `RUST_LOG=fluid::builder=trace fluid build` - Show threshold growth
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    let RuntimeConfig { db_path, settings } =
        RuntimeConfig::resolve(args.db.clone(), args.config.as_deref())?;
    debug!("Using library {} with settings {settings:?}", db_path.display());

    match args.command {
        cli::Command::InitDb { force } => {
            Library::init(&db_path, force)?;
            println!("Library ready at {}", db_path.display());
        }
        cli::Command::Import { pool, path, replace } => {
            let tracks = catalog::read_tracks(&path)?;
            let mut library = Library::open(&db_path)?;
            let count = library.import_tracks(pool, &tracks, replace)?;
            println!("Imported {count} tracks into the {pool} pool");
        }
        cli::Command::List { pool } => {
            let library = Library::open(&db_path)?;
            let tracks = library.load_pool(pool)?;
            for (i, track) in tracks.iter().enumerate() {
                println!("{:>4}. {}", i + 1, describe_track(track));
            }
            println!("{} tracks in the {pool} pool", tracks.len());
        }
        cli::Command::Fit { pool, axes, points } => {
            let mut settings = settings;
            axes.apply(&mut settings);
            if let Some(points) = points {
                settings.num_points = points;
            }
            settings.validate()?;

            let library = Library::open(&db_path)?;
            let tracks = Pool::new(library.load_pool(pool)?);
            let trajectory =
                curve::fit_trajectory(&tracks, settings.axis_x, settings.axis_y, settings.num_points)
                    .with_context(|| format!("Failed to fit the {pool} pool"))?;

            println!("{:>10} {:>14}", settings.axis_x.as_str(), settings.axis_y.as_str());
            for point in trajectory {
                println!("{:>10.4} {:>14.4}", point.x, point.y);
            }
        }
        cli::Command::Build(build_args) => {
            run_build(&db_path, settings, &build_args)?;
        }
        cli::Command::Playlists => {
            let library = Library::open(&db_path)?;
            for summary in library.playlists()? {
                println!(
                    "{:>4}  {}  ({} tracks, {})",
                    summary.id, summary.name, summary.length, summary.created_at
                );
            }
        }
        cli::Command::Show { name } => {
            let library = Library::open(&db_path)?;
            let entries = library
                .playlist_entries(&name)?
                .ok_or_else(|| anyhow::anyhow!("No playlist named '{name}'"))?;
            for (i, entry) in entries.iter().enumerate() {
                println!(
                    "{:>4}. {}  [{}] {}  (distance {:.3})",
                    i + 1,
                    entry.name.as_deref().unwrap_or(&entry.track_id),
                    entry.source,
                    entry.uri,
                    entry.distance
                );
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(shell, &mut cmd);
        }
    }

    Ok(())
}

/// Loads the pools, builds the playlist and hands it to the publishers.
fn run_build(db_path: &Path, settings: FluidConfig, args: &BuildArgs) -> Result<()> {
    let mut config = settings;
    args.apply(&mut config);
    config.validate()?;

    let mut library = match (&args.saved_file, args.dry_run) {
        (Some(_), true) => None,
        _ => Some(Library::open(db_path)?),
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (mut saved, mut featured) = match (&args.saved_file, &args.featured_file) {
        (Some(saved), Some(featured)) => {
            let source = JsonFileSource {
                saved: saved.clone(),
                featured: featured.clone(),
            };
            catalog::prepare_pools(&source, &config, &mut rng)?
        }
        _ => {
            let source: &dyn TrackSource = library
                .as_ref()
                .context("Library is required when no track files are given")?;
            catalog::prepare_pools(source, &config, &mut rng)?
        }
    };

    println!(
        "Building '{}' from {} saved and {} featured tracks",
        config.playlist_name,
        saved.len(),
        featured.len()
    );

    let snapshot = args
        .diagnostics
        .as_ref()
        .map(|_| (saved.clone(), featured.clone()));

    let playlist = builder::generate(&mut saved, &mut featured, &config)
        .context("Failed to build the playlist")?;

    for (i, entry) in playlist.entries.iter().enumerate() {
        println!(
            "{:>4}. {}  [{}] (distance {:.3})",
            i + 1,
            describe_track(&entry.track),
            entry.source,
            entry.distance
        );
    }

    if let Some(library) = library.as_mut().filter(|_| !args.dry_run) {
        library.publish(&config.playlist_name, &playlist)?;
        println!("Saved '{}' to the library", config.playlist_name);
    }

    if let Some(path) = &args.output {
        JsonPlaylistWriter::new(path.clone()).publish(&config.playlist_name, &playlist)?;
        println!("Wrote {}", path.display());
    }

    if let (Some(out_dir), Some((saved, featured))) = (&args.diagnostics, snapshot) {
        let user_dir: PathBuf = diagnostics::write_build_graphs(
            out_dir,
            &args.user,
            &saved,
            &featured,
            &playlist,
            config.axis_x,
            config.axis_y,
        )?;
        println!("Diagnostics written to {}", user_dir.display());
    }

    info!("Build of '{}' finished", config.playlist_name);
    Ok(())
}

fn describe_track(track: &Track) -> String {
    let features: Vec<String> = Feature::ALL
        .into_iter()
        .filter_map(|feature| track.feature(feature).map(|value| format!("{feature}={value:.2}")))
        .collect();
    format!("{}  {}", track.label(), features.join(" "))
}
