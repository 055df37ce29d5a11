//! Local track library.
//!
//! SQLite store for the two track pools and for published playlists. It
//! stands in for the remote catalog: tracks are imported from exports once,
//! then every build reads its pools from here and writes its result back.

use crate::builder::Playlist;
use crate::catalog::{PlaylistPublisher, TrackSource};
use crate::pool::PoolKind;
use crate::track::{AudioFeatures, Track};
use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tracks (
        id               INTEGER PRIMARY KEY,
        pool             TEXT    NOT NULL,
        position         INTEGER NOT NULL,
        track_id         TEXT    NOT NULL,
        uri              TEXT    NOT NULL,
        name             TEXT,
        danceability     REAL,
        energy           REAL,
        speechiness      REAL,
        acousticness     REAL,
        instrumentalness REAL,
        liveness         REAL,
        valence          REAL
    );
    CREATE INDEX IF NOT EXISTS idx_tracks_pool ON tracks(pool, position);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_identity ON tracks(pool, track_id);

    CREATE TABLE IF NOT EXISTS playlists (
        id         INTEGER PRIMARY KEY,
        name       TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS playlist_entries (
        playlist_id INTEGER NOT NULL,
        position    INTEGER NOT NULL,
        track_id    TEXT    NOT NULL,
        uri         TEXT    NOT NULL,
        name        TEXT,
        source      TEXT    NOT NULL,
        point_x     REAL    NOT NULL,
        point_y     REAL    NOT NULL,
        distance    REAL    NOT NULL,
        threshold   REAL    NOT NULL,
        FOREIGN KEY (playlist_id) REFERENCES playlists(id),
        PRIMARY KEY (playlist_id, position)
    );
";

const TRACK_COLUMNS: &str = "track_id, uri, name, danceability, energy, speechiness, \
                             acousticness, instrumentalness, liveness, valence";

/// A published playlist as listed by [`Library::playlists`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSummary {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub length: usize,
}

/// One stored playlist position.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub track_id: String,
    pub uri: String,
    pub name: Option<String>,
    pub source: String,
    pub distance: f64,
    pub threshold: f64,
}

/// Handle on the library database.
pub struct Library {
    conn: Connection,
}

impl Library {
    /// Opens the library at `path`, creating the schema if needed.
    ///
    /// With `force`, an existing database file is deleted first.
    pub fn init(path: &Path, force: bool) -> Result<Self> {
        if force && path.exists() {
            info!("Removing existing library at {}", path.display());
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove old library {}", path.display()))?;
        }
        Self::open(path)
    }

    /// Opens the library at `path`, creating the schema if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open library database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory library, used by tests and benches.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create library schema")?;
        Ok(Self { conn })
    }

    /// Appends `tracks` to a pool, or replaces its contents.
    ///
    /// A track already in the pool keeps its position and has its uri, name
    /// and features updated.
    pub fn import_tracks(&mut self, kind: PoolKind, tracks: &[Track], replace: bool) -> Result<usize> {
        let tx = self.conn.transaction()?;

        if replace {
            let removed = tx.execute("DELETE FROM tracks WHERE pool = ?1", [kind.as_str()])?;
            debug!("Cleared {removed} tracks from {kind} pool");
        }

        let start: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM tracks WHERE pool = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO tracks (pool, position, {TRACK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT (pool, track_id) DO UPDATE SET
                     uri = excluded.uri,
                     name = excluded.name,
                     danceability = excluded.danceability,
                     energy = excluded.energy,
                     speechiness = excluded.speechiness,
                     acousticness = excluded.acousticness,
                     instrumentalness = excluded.instrumentalness,
                     liveness = excluded.liveness,
                     valence = excluded.valence"
            ))?;

            for (offset, track) in tracks.iter().enumerate() {
                let f = &track.features;
                stmt.execute(params![
                    kind.as_str(),
                    start + offset as i64,
                    track.id,
                    track.uri,
                    track.name,
                    f.danceability,
                    f.energy,
                    f.speechiness,
                    f.acousticness,
                    f.instrumentalness,
                    f.liveness,
                    f.valence,
                ])
                .with_context(|| format!("Failed to insert track {}", track.id))?;
            }
        }

        tx.commit().context("Committing track import failed")?;
        info!("Imported {} tracks into {kind} pool", tracks.len());
        Ok(tracks.len())
    }

    /// All tracks of a pool, in import order.
    pub fn load_pool(&self, kind: PoolKind) -> Result<Vec<Track>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE pool = ?1 ORDER BY position"
        ))?;

        let tracks = stmt
            .query_map([kind.as_str()], track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read {kind} pool"))?;

        Ok(tracks)
    }

    pub fn pool_size(&self, kind: PoolKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE pool = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Stores a playlist and returns its id.
    pub fn save_playlist(&mut self, name: &str, playlist: &Playlist) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT INTO playlists (name) VALUES (?1)", [name])?;
        let playlist_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO playlist_entries
                 (playlist_id, position, track_id, uri, name, source, point_x, point_y, distance, threshold)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for (position, entry) in playlist.entries.iter().enumerate() {
                stmt.execute(params![
                    playlist_id,
                    position as i64,
                    entry.track.id,
                    entry.track.uri,
                    entry.track.name,
                    entry.source.as_str(),
                    entry.point.x,
                    entry.point.y,
                    entry.distance,
                    entry.threshold,
                ])?;
            }
        }

        tx.commit().context("Committing playlist failed")?;
        info!("Saved playlist '{name}' with {} tracks", playlist.len());
        Ok(playlist_id)
    }

    /// Published playlists, newest first.
    pub fn playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.created_at, COUNT(e.position)
             FROM playlists p LEFT JOIN playlist_entries e ON e.playlist_id = p.id
             GROUP BY p.id ORDER BY p.id DESC",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(PlaylistSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                    length: row.get::<_, i64>(3)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }

    /// Entries of the most recent playlist called `name`.
    pub fn playlist_entries(&self, name: &str) -> Result<Option<Vec<StoredEntry>>> {
        let playlist_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM playlists WHERE name = ?1 ORDER BY id DESC LIMIT 1",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        let Some(playlist_id) = playlist_id else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT track_id, uri, name, source, distance, threshold
             FROM playlist_entries WHERE playlist_id = ?1 ORDER BY position",
        )?;
        let entries = stmt
            .query_map([playlist_id], |row| {
                Ok(StoredEntry {
                    track_id: row.get(0)?,
                    uri: row.get(1)?,
                    name: row.get(2)?,
                    source: row.get(3)?,
                    distance: row.get(4)?,
                    threshold: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(entries))
    }
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        uri: row.get(1)?,
        name: row.get(2)?,
        features: AudioFeatures {
            danceability: row.get(3)?,
            energy: row.get(4)?,
            speechiness: row.get(5)?,
            acousticness: row.get(6)?,
            instrumentalness: row.get(7)?,
            liveness: row.get(8)?,
            valence: row.get(9)?,
        },
    })
}

impl TrackSource for Library {
    fn fetch(&self, kind: PoolKind) -> Result<Vec<Track>> {
        self.load_pool(kind)
    }
}

impl PlaylistPublisher for Library {
    fn publish(&mut self, name: &str, playlist: &Playlist) -> Result<()> {
        self.save_playlist(name, playlist).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PlaylistBuilder;
    use crate::curve::TrajectoryPoint;
    use crate::pool::Pool;
    use crate::track::Feature;

    fn sample_tracks() -> Vec<Track> {
        let mut named = Track::with_point("a", Feature::Energy, 0.1, Feature::Danceability, 0.2);
        named.name = Some("First".to_string());
        let mut partial = Track::with_point("b", Feature::Energy, 0.5, Feature::Danceability, 0.5);
        partial.features.valence = Some(0.9);
        partial.features.energy = None;
        vec![named, partial]
    }

    #[test]
    fn test_import_and_load_round_trip_order() -> Result<()> {
        let mut library = Library::in_memory()?;
        library.import_tracks(PoolKind::Saved, &sample_tracks(), false)?;

        let loaded = library.load_pool(PoolKind::Saved)?;
        assert_eq!(loaded, sample_tracks());
        assert!(library.load_pool(PoolKind::Featured)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_import_appends_then_replaces() -> Result<()> {
        let mut library = Library::in_memory()?;
        let tracks = sample_tracks();
        library.import_tracks(PoolKind::Featured, &tracks[..1], false)?;
        library.import_tracks(PoolKind::Featured, &tracks[1..], false)?;

        let ids: Vec<String> = library
            .load_pool(PoolKind::Featured)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        library.import_tracks(PoolKind::Featured, &tracks[1..], true)?;
        assert_eq!(library.pool_size(PoolKind::Featured)?, 1);
        Ok(())
    }

    #[test]
    fn test_reimport_updates_in_place() -> Result<()> {
        let mut library = Library::in_memory()?;
        let tracks = sample_tracks();
        library.import_tracks(PoolKind::Saved, &tracks, false)?;

        let mut renamed = tracks[0].clone();
        renamed.name = Some("Renamed".to_string());
        library.import_tracks(PoolKind::Saved, &tracks, false)?;
        library.import_tracks(PoolKind::Saved, &[renamed], false)?;

        let loaded = library.load_pool(PoolKind::Saved)?;
        let ids: Vec<&str> = loaded.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(loaded[0].name.as_deref(), Some("Renamed"));

        // The same id may still live in both pools.
        library.import_tracks(PoolKind::Featured, &tracks, false)?;
        assert_eq!(library.pool_size(PoolKind::Featured)?, 2);
        Ok(())
    }

    #[test]
    fn test_publish_and_read_back_playlist() -> Result<()> {
        let mut library = Library::in_memory()?;
        let builder = PlaylistBuilder::new(
            Feature::Energy,
            Feature::Danceability,
            crate::builder::BuildParams::default(),
        )?;
        let mut primary = Pool::new(vec![
            Track::with_point("x", Feature::Energy, 0.2, Feature::Danceability, 0.2),
            Track::with_point("y", Feature::Energy, 0.8, Feature::Danceability, 0.8),
        ]);
        let playlist = builder.build(
            &mut primary,
            &mut Pool::default(),
            &[TrajectoryPoint::new(0.8, 0.8), TrajectoryPoint::new(0.2, 0.2)],
        )?;

        library.publish("Evening", &playlist)?;

        let summaries = library.playlists()?;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Evening");
        assert_eq!(summaries[0].length, 2);

        let entries = library.playlist_entries("Evening")?.expect("playlist exists");
        let ids: Vec<&str> = entries.iter().map(|e| e.track_id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x"]);
        assert_eq!(entries[0].source, "saved");

        assert!(library.playlist_entries("Missing")?.is_none());
        Ok(())
    }

    #[test]
    fn test_force_init_recreates_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("library.db");

        let mut library = Library::init(&path, false)?;
        library.import_tracks(PoolKind::Saved, &sample_tracks(), false)?;
        drop(library);

        let kept = Library::init(&path, false)?;
        assert_eq!(kept.pool_size(PoolKind::Saved)?, 2);
        drop(kept);

        let fresh = Library::init(&path, true)?;
        assert_eq!(fresh.pool_size(PoolKind::Saved)?, 0);
        Ok(())
    }
}
