//! SQLite-backed snapshot store
//!
//! Persistence for incoming market snapshots plus the batched latest-record
//! lookup the monitoring engine needs. One connection behind an async mutex;
//! the monitor guarantees at most one in-flight run, so contention is nil.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection};
use tokio::sync::Mutex;

use crate::monitoring::freshness::{SnapshotRecord, SnapshotStore};

#[derive(Clone)]
pub struct SnapshotDb {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotDb {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("open snapshot db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                value REAL NOT NULL,
                update_date TEXT NOT NULL,
                update_time TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_symbol_ts
             ON snapshots(symbol, update_date DESC, update_time DESC)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record one snapshot (ingestion path and test fixtures).
    pub async fn insert_snapshot(
        &self,
        symbol: &str,
        value: f64,
        update_date: &str,
        update_time: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO snapshots (symbol, value, update_date, update_time)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![symbol, value, update_date, update_time],
        )
        .context("insert snapshot")?;
        Ok(())
    }

    pub async fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl SnapshotStore for SnapshotDb {
    /// Latest record per requested symbol, one query for the whole batch.
    async fn latest_snapshots(&self, symbols: &[String]) -> Result<Vec<SnapshotRecord>> {
        if symbols.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.conn.lock().await;
        let placeholders = vec!["?"; symbols.len()].join(", ");
        // SQLite resolves bare columns in a MAX() group to the max row
        let sql = format!(
            "SELECT symbol, value, update_date, update_time,
                    MAX(update_date || ' ' || update_time)
             FROM snapshots
             WHERE symbol IN ({placeholders})
             GROUP BY symbol"
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(symbols.iter()), |row| {
            Ok(SnapshotRecord {
                symbol: row.get(0)?,
                value: row.get(1)?,
                update_date: row.get(2)?,
                update_time: row.get(3)?,
            })
        })?;

        let mut records = Vec::with_capacity(symbols.len());
        for row in rows {
            records.push(row.context("read snapshot row")?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_temp_db() -> (SnapshotDb, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let db = SnapshotDb::new(path.to_str().unwrap()).unwrap();
        (db, dir)
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_latest_snapshot_wins_per_symbol() {
        let (db, _dir) = open_temp_db().await;
        db.insert_snapshot("BTCUSDT", 0.0001, "2025-06-15", "00:00:00")
            .await
            .unwrap();
        db.insert_snapshot("BTCUSDT", 0.0002, "2025-06-15", "08:00:00")
            .await
            .unwrap();
        db.insert_snapshot("BTCUSDT", 0.0003, "2025-06-14", "16:00:00")
            .await
            .unwrap();

        let records = db.latest_snapshots(&symbols(&["BTCUSDT"])).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-06-15");
        assert_eq!(records[0].update_time, "08:00:00");
        assert!((records[0].value - 0.0002).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_absent_symbol_is_omitted() {
        let (db, _dir) = open_temp_db().await;
        db.insert_snapshot("BTCUSDT", 0.0001, "2025-06-15", "08:00:00")
            .await
            .unwrap();

        let records = db
            .latest_snapshots(&symbols(&["BTCUSDT", "ETHUSDT"]))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_empty_request_returns_empty() {
        let (db, _dir) = open_temp_db().await;
        let records = db.latest_snapshots(&[]).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_len_counts_rows() {
        let (db, _dir) = open_temp_db().await;
        assert_eq!(db.len().await.unwrap(), 0);
        db.insert_snapshot("BTCUSDT", 0.0001, "2025-06-15", "08:00:00")
            .await
            .unwrap();
        assert_eq!(db.len().await.unwrap(), 1);
    }
}
