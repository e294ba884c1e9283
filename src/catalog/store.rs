//! SQLite-backed catalog store.

use super::models::{CatalogEntry, RecordOutcome};
use super::schema::{import_legacy_library, CATALOG_VERSIONED_SCHEMAS};
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Catalog persisted in a single SQLite file behind one write connection.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Opens (creating if needed) the catalog at `db_path` and brings its
    /// schema up to date.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self::from_connection(conn)?;
        info!(
            "Opened catalog {:?}: {} tracks",
            db_path,
            store.track_count()?
        );
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Catalog connection mutex poisoned"))
    }

    fn has_inner(conn: &Connection, spotify_id: &str) -> Result<bool> {
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tracks WHERE spotify_id = ?1)",
            params![spotify_id],
            |r| r.get(0),
        )?)
    }

    fn insert_inner(conn: &Connection, entry: &CatalogEntry) -> Result<bool> {
        if Self::has_inner(conn, &entry.spotify_id)? {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO tracks (spotify_id, title, artist, album_name, album_spotify_id, year,
                duration, genre, bpm, energy, file_path, album_art_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                &entry.spotify_id,
                &entry.title,
                &entry.artist,
                &entry.album_name,
                &entry.album_spotify_id,
                &entry.year,
                &entry.duration,
                &entry.genre,
                entry.bpm,
                entry.energy,
                &entry.file_path,
                &entry.album_art_path,
            ],
        )?;
        Ok(true)
    }

    fn link_inner(conn: &Connection, spotify_id: &str, playlist_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM playlist_tracks WHERE spotify_id = ?1 AND playlist_id = ?2)",
            params![spotify_id, playlist_id],
            |r| r.get(0),
        )?;
        if exists {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO playlist_tracks (spotify_id, playlist_id) VALUES (?1, ?2)",
            params![spotify_id, playlist_id],
        )?;
        Ok(true)
    }

    fn parse_entry_row(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
        Ok(CatalogEntry {
            spotify_id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            album_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            album_spotify_id: row.get(4)?,
            year: row.get(5)?,
            duration: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            genre: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            bpm: row.get(8)?,
            energy: row.get(9)?,
            file_path: row.get(10)?,
            album_art_path: row.get(11)?,
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn init_schema(&self) -> Result<()> {
        let mut conn = self.lock()?;
        migrate_if_needed(
            &mut conn,
            CATALOG_VERSIONED_SCHEMAS,
            "catalog",
            Some(import_legacy_library),
        )
    }

    fn has(&self, spotify_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        Self::has_inner(&conn, spotify_id)
    }

    fn insert(&self, entry: &CatalogEntry) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = Self::insert_inner(&tx, entry)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn link(&self, spotify_id: &str, playlist_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let linked = Self::link_inner(&tx, spotify_id, playlist_id)?;
        tx.commit()?;
        Ok(linked)
    }

    fn record(&self, entry: &CatalogEntry, playlist_id: Option<&str>) -> Result<RecordOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let entry_inserted = Self::insert_inner(&tx, entry)?;
        let membership_linked = match playlist_id {
            Some(playlist_id) => Self::link_inner(&tx, &entry.spotify_id, playlist_id)?,
            None => false,
        };
        tx.commit()?;
        Ok(RecordOutcome {
            entry_inserted,
            membership_linked,
        })
    }

    fn get_entry(&self, spotify_id: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT spotify_id, title, artist, album_name, album_spotify_id, year, duration,
                    genre, bpm, energy, file_path, album_art_path
                 FROM tracks WHERE spotify_id = ?1",
                params![spotify_id],
                Self::parse_entry_row,
            )
            .optional()?)
    }

    fn track_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn playlist_track_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT spotify_id FROM playlist_tracks WHERE playlist_id = ?1 ORDER BY rowid",
        )?;
        let ids = stmt
            .query_map(params![playlist_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}
