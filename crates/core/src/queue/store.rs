//! SQLite-backed download queue store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::types::{
    DownloadQueueItem, NewQueueItem, QueueCounts, QueueError, QueueStatus, QueueStore,
};

/// SQLite-backed queue store.
pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
}

impl SqliteQueueStore {
    /// Open (or create) the queue database at `path`.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS download_queue (
                id TEXT PRIMARY KEY,
                scene_id INTEGER,
                torrent_hash TEXT,
                client_hash TEXT,
                title TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                seeders INTEGER NOT NULL,
                quality TEXT,
                download_url TEXT,
                status TEXT NOT NULL,
                added_at TEXT NOT NULL,
                completed_at TEXT,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_attempt TEXT,
                last_error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_queue_status ON download_queue(status);
            CREATE INDEX IF NOT EXISTS idx_queue_scene ON download_queue(scene_id);
            "#,
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        // Migration: download_url was added after the initial schema
        let _ = conn.execute("ALTER TABLE download_queue ADD COLUMN download_url TEXT", []);

        Ok(())
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<DownloadQueueItem> {
        let id: String = row.get(0)?;
        let scene_id: Option<i64> = row.get(1)?;
        let torrent_hash: Option<String> = row.get(2)?;
        let client_hash: Option<String> = row.get(3)?;
        let title: String = row.get(4)?;
        let size_bytes: i64 = row.get(5)?;
        let seeders: u32 = row.get(6)?;
        let quality: Option<String> = row.get(7)?;
        let download_url: Option<String> = row.get(8)?;
        let status_str: String = row.get(9)?;
        let added_at_str: String = row.get(10)?;
        let completed_at_str: Option<String> = row.get(11)?;
        let attempts: u32 = row.get(12)?;
        let last_attempt_str: Option<String> = row.get(13)?;
        let last_error: Option<String> = row.get(14)?;

        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now())
        };

        Ok(DownloadQueueItem {
            id,
            scene_id,
            torrent_hash,
            client_hash,
            title,
            size_bytes: size_bytes.max(0) as u64,
            seeders,
            quality,
            download_url,
            status: QueueStatus::parse(&status_str).unwrap_or(QueueStatus::AddFailed),
            added_at: parse_ts(&added_at_str),
            completed_at: completed_at_str.as_deref().map(parse_ts),
            attempts,
            last_attempt: last_attempt_str.as_deref().map(parse_ts),
            last_error,
        })
    }
}

const SELECT_COLUMNS: &str = "id, scene_id, torrent_hash, client_hash, title, size_bytes, seeders, quality, download_url, status, added_at, completed_at, attempts, last_attempt, last_error";

impl QueueStore for SqliteQueueStore {
    fn insert(&self, item: NewQueueItem) -> Result<DownloadQueueItem, QueueError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = QueueStatus::Queued;

        conn.execute(
            "INSERT INTO download_queue (id, scene_id, torrent_hash, client_hash, title, size_bytes, seeders, quality, download_url, status, added_at, attempts) VALUES (?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                id,
                item.scene_id,
                item.torrent_hash.as_ref().map(|h| h.to_lowercase()),
                item.title,
                item.size_bytes as i64,
                item.seeders,
                item.quality,
                item.download_url,
                status.as_str(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(DownloadQueueItem {
            id,
            scene_id: item.scene_id,
            torrent_hash: item.torrent_hash.map(|h| h.to_lowercase()),
            client_hash: None,
            title: item.title,
            size_bytes: item.size_bytes,
            seeders: item.seeders,
            quality: item.quality,
            download_url: item.download_url,
            status,
            added_at: now,
            completed_at: None,
            attempts: 0,
            last_attempt: None,
            last_error: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<DownloadQueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {} FROM download_queue WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_item,
        );

        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(QueueError::Database(e.to_string())),
        }
    }

    fn list(&self) -> Result<Vec<DownloadQueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM download_queue ORDER BY added_at ASC, id ASC",
                SELECT_COLUMNS
            ))
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn list_by_status(&self, status: QueueStatus) -> Result<Vec<DownloadQueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM download_queue WHERE status = ? ORDER BY added_at ASC, id ASC",
                SELECT_COLUMNS
            ))
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![status.as_str()], Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn update_status(&self, id: &str, status: QueueStatus) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();

        let current: String = conn
            .query_row(
                "SELECT status FROM download_queue WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => QueueError::NotFound(id.to_string()),
                other => QueueError::Database(other.to_string()),
            })?;

        let from = QueueStatus::parse(&current).unwrap_or(QueueStatus::AddFailed);
        if !from.can_transition_to(status) {
            return Err(QueueError::InvalidTransition { from, to: status });
        }

        let completed_at = if status == QueueStatus::Completed {
            Some(Utc::now().to_rfc3339())
        } else {
            None
        };

        conn.execute(
            "UPDATE download_queue SET status = ?, completed_at = COALESCE(?, completed_at) WHERE id = ?",
            params![status.as_str(), completed_at, id],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(())
    }

    fn begin_attempt(&self, id: &str) -> Result<u32, QueueError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                "UPDATE download_queue SET attempts = attempts + 1, last_attempt = ? WHERE id = ?",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }

        conn.query_row(
            "SELECT attempts FROM download_queue WHERE id = ?",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn finish_attempt_success(&self, id: &str, client_hash: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                "UPDATE download_queue SET status = ?, client_hash = ?, last_error = NULL WHERE id = ?",
                params![
                    QueueStatus::Downloading.as_str(),
                    client_hash.to_lowercase(),
                    id
                ],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn finish_attempt_failure(&self, id: &str, error: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                "UPDATE download_queue SET status = ?, last_error = ? WHERE id = ?",
                params![QueueStatus::AddFailed.as_str(), error, id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();

        let deleted = conn
            .execute("DELETE FROM download_queue WHERE id = ?", params![id])
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if deleted == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn counts(&self, max_attempts: u32) -> Result<QueueCounts, QueueError> {
        let conn = self.conn.lock().unwrap();

        let mut counts = QueueCounts::default();

        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM download_queue GROUP BY status")
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| QueueError::Database(e.to_string()))?;

        for row in rows {
            let (status, count) = row.map_err(|e| QueueError::Database(e.to_string()))?;
            let count = count.max(0) as usize;
            match QueueStatus::parse(&status) {
                Some(QueueStatus::Queued) => counts.queued = count,
                Some(QueueStatus::Downloading) => counts.downloading = count,
                Some(QueueStatus::Seeding) => counts.seeding = count,
                Some(QueueStatus::Completed) => counts.completed = count,
                Some(QueueStatus::Paused) => counts.paused = count,
                Some(QueueStatus::AddFailed) => counts.add_failed = count,
                None => {}
            }
        }

        counts.permanent_failures = conn
            .query_row(
                "SELECT COUNT(*) FROM download_queue WHERE status = ? AND attempts >= ?",
                params![QueueStatus::AddFailed.as_str(), max_attempts],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| QueueError::Database(e.to_string()))?
            .max(0) as usize;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_new_item(title: &str) -> NewQueueItem {
        NewQueueItem {
            scene_id: Some(7),
            torrent_hash: Some("ABC123".to_string()),
            title: title.to_string(),
            size_bytes: 1024,
            seeders: 12,
            quality: Some("1080p".to_string()),
            download_url: Some("magnet:?xt=urn:btih:abc123".to_string()),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteQueueStore::in_memory().unwrap();

        let created = store.insert(make_new_item("Test Item")).unwrap();
        assert_eq!(created.status, QueueStatus::Queued);
        assert_eq!(created.attempts, 0);
        // Hash normalized on insert
        assert_eq!(created.torrent_hash.as_deref(), Some("abc123"));

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Test Item");
        assert_eq!(fetched.scene_id, Some(7));
        assert_eq!(fetched.status, QueueStatus::Queued);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = SqliteQueueStore::in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_begin_attempt_increments_and_stamps() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.insert(make_new_item("Test")).unwrap();

        assert_eq!(store.begin_attempt(&item.id).unwrap(), 1);
        assert_eq!(store.begin_attempt(&item.id).unwrap(), 2);

        let fetched = store.get(&item.id).unwrap().unwrap();
        assert_eq!(fetched.attempts, 2);
        assert!(fetched.last_attempt.is_some());
    }

    #[test]
    fn test_attempt_success_stores_hash_and_clears_error() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.insert(make_new_item("Test")).unwrap();

        store.begin_attempt(&item.id).unwrap();
        store.finish_attempt_failure(&item.id, "boom").unwrap();

        let failed = store.get(&item.id).unwrap().unwrap();
        assert_eq!(failed.status, QueueStatus::AddFailed);
        assert_eq!(failed.last_error.as_deref(), Some("boom"));

        store.begin_attempt(&item.id).unwrap();
        store.finish_attempt_success(&item.id, "DEF456").unwrap();

        let ok = store.get(&item.id).unwrap().unwrap();
        assert_eq!(ok.status, QueueStatus::Downloading);
        assert_eq!(ok.client_hash.as_deref(), Some("def456"));
        assert!(ok.last_error.is_none());
        assert_eq!(ok.attempts, 2);
    }

    #[test]
    fn test_update_status_enforces_state_machine() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.insert(make_new_item("Test")).unwrap();

        // queued -> seeding is illegal
        let err = store.update_status(&item.id, QueueStatus::Seeding).unwrap_err();
        assert!(matches!(err, QueueError::InvalidTransition { .. }));

        store.update_status(&item.id, QueueStatus::Downloading).unwrap();
        store.update_status(&item.id, QueueStatus::Completed).unwrap();

        let fetched = store.get(&item.id).unwrap().unwrap();
        assert_eq!(fetched.status, QueueStatus::Completed);
        assert!(fetched.completed_at.is_some());
    }

    #[test]
    fn test_list_by_status() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let a = store.insert(make_new_item("A")).unwrap();
        let _b = store.insert(make_new_item("B")).unwrap();

        store.begin_attempt(&a.id).unwrap();
        store.finish_attempt_failure(&a.id, "err").unwrap();

        let failed = store.list_by_status(QueueStatus::AddFailed).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, a.id);

        let queued = store.list_by_status(QueueStatus::Queued).unwrap();
        assert_eq!(queued.len(), 1);
    }

    #[test]
    fn test_counts_including_permanent_failures() {
        let store = SqliteQueueStore::in_memory().unwrap();

        let a = store.insert(make_new_item("A")).unwrap();
        for _ in 0..5 {
            store.begin_attempt(&a.id).unwrap();
        }
        store.finish_attempt_failure(&a.id, "err").unwrap();

        let b = store.insert(make_new_item("B")).unwrap();
        store.begin_attempt(&b.id).unwrap();
        store.finish_attempt_failure(&b.id, "err").unwrap();

        let counts = store.counts(5).unwrap();
        assert_eq!(counts.add_failed, 2);
        assert_eq!(counts.permanent_failures, 1);
    }

    #[test]
    fn test_delete() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.insert(make_new_item("Test")).unwrap();

        store.delete(&item.id).unwrap();
        assert!(store.get(&item.id).unwrap().is_none());
        assert!(matches!(store.delete(&item.id), Err(QueueError::NotFound(_))));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("queue.db");

        let id = {
            let store = SqliteQueueStore::new(&path).unwrap();
            store.insert(make_new_item("Persisted")).unwrap().id
        };

        let store = SqliteQueueStore::new(&path).unwrap();
        let fetched = store.get(&id).unwrap().unwrap();
        assert_eq!(fetched.title, "Persisted");
    }
}
