//! SQLite ledger of scheduled report deliveries.

use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let db = Self::init(Connection::open(path)?)?;
        info!("Opened delivery ledger at {:?} ({} deliveries)", path, db.delivery_count()?);
        Ok(db)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS report_deliveries (
                chat_id INTEGER NOT NULL,
                scheduled_for TEXT NOT NULL,
                delivered_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (chat_id, scheduled_for)
            );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database lock poisoned")
    }

    /// Reserve the delivery of `scheduled_for` to `chat_id`.
    /// Returns false if it was already claimed, by this or an earlier process.
    pub fn claim_delivery(&self, chat_id: i64, scheduled_for: &str) -> rusqlite::Result<bool> {
        let inserted = self.lock().execute(
            "INSERT OR IGNORE INTO report_deliveries (chat_id, scheduled_for) VALUES (?1, ?2)",
            params![chat_id, scheduled_for],
        )?;
        Ok(inserted == 1)
    }

    pub fn was_delivered(&self, chat_id: i64, scheduled_for: &str) -> rusqlite::Result<bool> {
        let count: i64 = self.lock().query_row(
            "SELECT COUNT(*) FROM report_deliveries WHERE chat_id = ?1 AND scheduled_for = ?2",
            params![chat_id, scheduled_for],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn delivery_count(&self) -> rusqlite::Result<i64> {
        self.lock()
            .query_row("SELECT COUNT(*) FROM report_deliveries", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let db = Database::open_in_memory().unwrap();
        let slot = "2024-06-16T08:00:00+02:00";
        assert!(!db.was_delivered(42, slot).unwrap());
        assert!(db.claim_delivery(42, slot).unwrap());
        assert!(!db.claim_delivery(42, slot).unwrap());
        assert!(db.was_delivered(42, slot).unwrap());
        assert_eq!(db.delivery_count().unwrap(), 1);
    }

    #[test]
    fn test_claims_are_per_chat_and_slot() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.claim_delivery(1, "2024-06-16T08:00:00+02:00").unwrap());
        assert!(db.claim_delivery(2, "2024-06-16T08:00:00+02:00").unwrap());
        assert!(db.claim_delivery(1, "2024-06-17T08:00:00+02:00").unwrap());
        assert_eq!(db.delivery_count().unwrap(), 3);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let db = Database::open(&path).unwrap();
            assert!(db.claim_delivery(7, "slot").unwrap());
        }
        let db = Database::open(&path).unwrap();
        assert!(!db.claim_delivery(7, "slot").unwrap());
    }
}
