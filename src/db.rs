// src/db.rs

use crate::error::{DropError, Result};
use crate::models::{LogBundle, Sections};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Bundles are purged this long after upload.
pub const RETENTION_SECS: i64 = 60 * 60 * 24 * 2;

/// Random bytes behind every key (hex encoded, so keys are twice as long).
pub const KEY_BYTES: usize = 64;

/// How many fresh keys `submit` tries before giving up on collisions.
pub const MAX_KEY_ATTEMPTS: usize = 3;

/// Default database location (~/.config/logdrop/logdrop.db)
pub fn default_db_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or(DropError::HomeDirNotFound)?;
    Ok(home_dir.join(".config/logdrop/logdrop.db"))
}

/// Produces an unguessable key from the OS random source.
///
/// Nothing checks the key for uniqueness here; `BundleStore::submit` handles collisions.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Keyed bundle storage on top of a SQLite connection owned by the caller.
pub struct BundleStore {
    conn: Connection,
}

impl BundleStore {
    /// Wraps an already opened connection and makes sure the schema exists.
    pub fn new(conn: Connection) -> Result<Self> {
        let store = BundleStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Opens (and creates, if needed) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!(path = %path.display(), "opening bundle store");
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the uploads table and the expiry policy if they don't exist yet.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS uploads (
                key TEXT PRIMARY KEY NOT NULL,
                main TEXT NOT NULL,
                dmesg TEXT NOT NULL,
                apps TEXT,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        self.ensure_expiry()
    }

    /// Declares the retention policy. Safe to call any number of times.
    ///
    /// Reads go through `live_uploads`, which hides anything past the retention window,
    /// and every insert sweeps expired rows out of the table.
    pub fn ensure_expiry(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS uploads_created_at ON uploads (created_at);
             CREATE VIEW IF NOT EXISTS live_uploads AS
                 SELECT key, main, dmesg, apps, created_at FROM uploads
                 WHERE created_at > CAST(strftime('%s', 'now') AS INTEGER) - {retention};
             CREATE TRIGGER IF NOT EXISTS uploads_expire AFTER INSERT ON uploads
             BEGIN
                 DELETE FROM uploads
                 WHERE created_at <= CAST(strftime('%s', 'now') AS INTEGER) - {retention};
             END;",
            retention = RETENTION_SECS
        ))?;
        Ok(())
    }

    /// Stores `sections` under `key`, stamped with the current time.
    pub fn insert(&self, key: &str, sections: &Sections) -> Result<()> {
        self.insert_at(key, sections, Utc::now())
    }

    pub(crate) fn insert_at(
        &self,
        key: &str,
        sections: &Sections,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_expiry()?;
        let inserted = self.conn.execute(
            "INSERT INTO uploads (key, main, dmesg, apps, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                sections.main,
                sections.dmesg,
                sections.apps,
                created_at.timestamp()
            ],
        );
        match inserted {
            Ok(_) => {
                tracing::debug!(
                    main_len = sections.main.len(),
                    dmesg_len = sections.dmesg.len(),
                    has_apps = sections.apps.is_some(),
                    "bundle inserted"
                );
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(DropError::DuplicateKey(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Generates a key and inserts under it, retrying with a fresh key on collision.
    pub fn submit(&self, sections: &Sections) -> Result<String> {
        self.submit_with_keys(sections, generate_key)
    }

    pub(crate) fn submit_with_keys<F>(&self, sections: &Sections, mut next_key: F) -> Result<String>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = next_key();
            match self.insert(&key, sections) {
                Ok(()) => return Ok(key),
                Err(DropError::DuplicateKey(_)) => {
                    tracing::warn!(attempt, "generated key already in use, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(DropError::KeySpaceExhausted(MAX_KEY_ATTEMPTS))
    }

    /// Looks up a live bundle. Expired bundles are reported as absent.
    pub fn get(&self, key: &str) -> Result<Option<LogBundle>> {
        let bundle = self
            .conn
            .query_row(
                "SELECT key, main, dmesg, apps, created_at FROM live_uploads WHERE key = ?",
                [key],
                |row| {
                    let secs: i64 = row.get(4)?;
                    let created_at = DateTime::from_timestamp(secs, 0)
                        .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, secs))?;
                    Ok(LogBundle {
                        key: row.get(0)?,
                        main: row.get(1)?,
                        dmesg: row.get(2)?,
                        apps: row.get(3)?,
                        created_at,
                    })
                },
            )
            .optional()?;
        Ok(bundle)
    }

    /// Removes the bundle stored under `key`, if there is one.
    pub fn delete(&self, key: &str) -> Result<()> {
        let count = self.conn.execute("DELETE FROM uploads WHERE key = ?", [key])?;
        tracing::debug!(removed = count, "delete by key");
        Ok(())
    }

    /// Drops every bundle past the retention window. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM uploads WHERE created_at <= CAST(strftime('%s', 'now') AS INTEGER) - ?",
            [RETENTION_SECS],
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    fn sample() -> Sections {
        Sections {
            main: "m".to_string(),
            dmesg: "d".to_string(),
            apps: Some("a".to_string()),
        }
    }

    fn row_count(store: &BundleStore) -> i64 {
        store
            .connection()
            .query_row("SELECT COUNT(*) FROM uploads", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn keys_are_fixed_length_hex() {
        let key = generate_key();
        assert_eq!(key.len(), KEY_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ten_thousand_keys_are_distinct() {
        let keys: HashSet<String> = (0..10_000).map(|_| generate_key()).collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn insert_then_get_returns_bundle() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("k1", &sample()).unwrap();

        let bundle = store.get("k1").unwrap().unwrap();
        assert_eq!(bundle.key, "k1");
        assert_eq!(bundle.sections(), sample());
        assert!(Utc::now() - bundle.created_at < Duration::minutes(1));
    }

    #[test]
    fn missing_apps_round_trips_as_none() {
        let store = BundleStore::open_in_memory().unwrap();
        let sections = Sections {
            main: "{}".to_string(),
            dmesg: String::new(),
            apps: None,
        };
        store.insert("k1", &sections).unwrap();
        assert_eq!(store.get("k1").unwrap().unwrap().apps, None);
    }

    #[test]
    fn get_unknown_key_is_none() {
        let store = BundleStore::open_in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("k1", &sample()).unwrap();
        let err = store.insert("k1", &sample()).unwrap_err();
        assert!(matches!(err, DropError::DuplicateKey(ref k) if k == "k1"));
        assert_eq!(row_count(&store), 1);
    }

    #[test]
    fn submit_retries_on_collision() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("taken", &sample()).unwrap();

        let mut keys = vec!["fresh".to_string(), "taken".to_string()];
        let key = store.submit_with_keys(&sample(), || keys.pop().unwrap()).unwrap();
        assert_eq!(key, "fresh");
        assert_eq!(row_count(&store), 2);
    }

    #[test]
    fn submit_gives_up_after_max_attempts() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("taken", &sample()).unwrap();

        let mut calls = 0;
        let err = store
            .submit_with_keys(&sample(), || {
                calls += 1;
                "taken".to_string()
            })
            .unwrap_err();
        assert!(matches!(err, DropError::KeySpaceExhausted(MAX_KEY_ATTEMPTS)));
        assert_eq!(calls, MAX_KEY_ATTEMPTS);
    }

    #[test]
    fn submit_uses_generated_keys() {
        let store = BundleStore::open_in_memory().unwrap();
        let key = store.submit(&sample()).unwrap();
        assert_eq!(key.len(), KEY_BYTES * 2);
        assert!(store.get(&key).unwrap().is_some());
    }

    #[test]
    fn delete_is_idempotent() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("k1", &sample()).unwrap();
        store.delete("k1").unwrap();
        store.delete("k1").unwrap();
        assert!(store.get("k1").unwrap().is_none());
    }

    #[test]
    fn delete_only_touches_matching_key() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("k1", &sample()).unwrap();
        store.insert("k2", &sample()).unwrap();
        store.delete("k1").unwrap();
        assert!(store.get("k2").unwrap().is_some());
    }

    #[test]
    fn expired_bundle_is_hidden_and_purged() {
        let store = BundleStore::open_in_memory().unwrap();
        store.insert("old", &sample()).unwrap();
        store.insert("new", &sample()).unwrap();
        let three_days_ago = (Utc::now() - Duration::days(3)).timestamp();
        store
            .connection()
            .execute(
                "UPDATE uploads SET created_at = ? WHERE key = 'old'",
                [three_days_ago],
            )
            .unwrap();

        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("new").unwrap().is_some());
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(row_count(&store), 1);
    }

    #[test]
    fn insert_sweeps_expired_rows() {
        let store = BundleStore::open_in_memory().unwrap();
        store
            .insert_at("stale", &sample(), Utc::now() - Duration::days(2) - Duration::hours(1))
            .unwrap();
        assert_eq!(row_count(&store), 0);

        store
            .insert_at("recent", &sample(), Utc::now() - Duration::days(1))
            .unwrap();
        assert!(store.get("recent").unwrap().is_some());
    }

    #[test]
    fn out_of_range_timestamp_is_an_error() {
        let store = BundleStore::open_in_memory().unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO uploads (key, main, dmesg, apps, created_at) VALUES ('bad', 'm', 'd', NULL, ?)",
                [i64::MAX],
            )
            .unwrap();

        let err = store.get("bad").unwrap_err();
        assert!(matches!(
            err,
            DropError::Sql(rusqlite::Error::IntegralValueOutOfRange(4, i64::MAX))
        ));
        assert!(err.is_backend_error());
    }

    #[test]
    fn expiry_declaration_is_idempotent() {
        let store = BundleStore::open_in_memory().unwrap();
        store.ensure_expiry().unwrap();
        store.ensure_schema().unwrap();
        store.insert("k1", &sample()).unwrap();
        store.insert("k2", &sample()).unwrap();

        let objects: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE name IN ('uploads_created_at', 'live_uploads', 'uploads_expire')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(objects, 3);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/bundles.db");
        let store = BundleStore::open(&path).unwrap();
        store.insert("k1", &sample()).unwrap();
        drop(store);

        let reopened = BundleStore::open(&path).unwrap();
        assert!(reopened.get("k1").unwrap().is_some());
    }
}
