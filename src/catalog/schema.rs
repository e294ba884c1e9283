//! SQLite schema for the track catalog.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::Connection;

/// One row per unique track, keyed by the Spotify id.
const TRACKS_TABLE_V0: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("spotify_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("album_name", &SqlType::Text),
        sqlite_column!("album_spotify_id", &SqlType::Text),
        sqlite_column!("year", &SqlType::Text),
        sqlite_column!("duration", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("bpm", &SqlType::Real),
        sqlite_column!("energy", &SqlType::Real),
        sqlite_column!("file_path", &SqlType::Text, non_null = true),
        sqlite_column!("album_art_path", &SqlType::Text),
        sqlite_column!(
            "added_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_tracks_artist", "artist")],
    unique_constraints: &[],
};

/// Many-to-many junction between tracks and the playlists they came from.
const PLAYLIST_TRACKS_TABLE_V0: Table = Table {
    name: "playlist_tracks",
    columns: &[
        sqlite_column!(
            "spotify_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "tracks",
                foreign_column: "spotify_id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("playlist_id", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_playlist_tracks_playlist", "playlist_id")],
    unique_constraints: &[&["spotify_id", "playlist_id"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TRACKS_TABLE_V0, PLAYLIST_TRACKS_TABLE_V0],
    migration: None,
}];

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1)",
        [name],
        |r| r.get(0),
    )?)
}

/// Copies rows from the `music_library` / `playlist_song` tables written by
/// the older downloader scripts, if present. The old tables are left alone.
pub fn import_legacy_library(conn: &Connection) -> Result<bool> {
    if !table_exists(conn, "music_library")? {
        return Ok(false);
    }

    conn.execute(
        "INSERT OR IGNORE INTO tracks
            (spotify_id, title, artist, album_name, album_spotify_id, year, duration,
             genre, bpm, energy, file_path, album_art_path)
         SELECT spotify_id, COALESCE(title, ''), COALESCE(artist, ''), album_name,
                album_spotify_id, year, duration, genre, bpm, energy_level,
                COALESCE(file_path, ''), album_art_path
         FROM music_library
         WHERE spotify_id IS NOT NULL",
        [],
    )?;

    if table_exists(conn, "playlist_song")? {
        conn.execute(
            "INSERT OR IGNORE INTO playlist_tracks (spotify_id, playlist_id)
             SELECT spotify_id, playlist_id FROM playlist_song
             WHERE playlist_id IS NOT NULL
               AND spotify_id IN (SELECT spotify_id FROM tracks)",
            [],
        )?;
    }
    Ok(true)
}
