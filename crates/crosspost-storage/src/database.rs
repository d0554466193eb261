// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and
//! lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer; query modules accept
//! `&Database` and call through `connection().call()`. Do NOT create
//! additional Connection instances for writes.

use std::path::Path;
use std::str::FromStr;

use crosspost_core::CrosspostError;
use tracing::debug;

/// Handle to the Crosspost ledger database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, configure PRAGMAs, and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, CrosspostError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CrosspostError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CrosspostError::Storage {
                source: Box::new(e),
            })?;

        conn.call(
            |conn| -> Result<Result<(), CrosspostError>, rusqlite::Error> {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                Ok(crate::migrations::run_migrations(conn))
            },
        )
        .await
        .map_err(map_tr_err)??;

        debug!(path, "ledger database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the background connection thread gracefully.
    pub async fn close(self) -> Result<(), CrosspostError> {
        self.conn
            .close()
            .await
            .map_err(|e| CrosspostError::Storage {
                source: Box::new(e),
            })
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> CrosspostError {
    CrosspostError::Storage {
        source: Box::new(e),
    }
}

/// Parse a TEXT column into a strum-backed enum, reporting conversion
/// failures through rusqlite's own error type so `?` works in row mappers.
pub(crate) fn parse_enum<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations_and_is_reentrant() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let path = path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();

        // Re-open: migrations must be a no-op, not an error.
        let db = Database::open(path).await.unwrap();
        let tables: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='posts'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_active() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[test]
    fn parse_enum_surfaces_bad_values() {
        use crosspost_core::PostState;
        let ok: Result<PostState, _> = parse_enum(0, "scheduled".into());
        assert_eq!(ok.unwrap(), PostState::Scheduled);
        let bad: Result<PostState, _> = parse_enum(0, "not_a_state".into());
        assert!(bad.is_err());
    }
}
