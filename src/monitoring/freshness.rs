//! Per-symbol freshness evaluation
//!
//! Given the set of tracked symbols and an expected occurrence, asks the
//! snapshot store for the latest record per symbol (one batched call) and
//! classifies each as fresh or stale within the tolerance window. Records
//! with unparseable timestamps count as absent; they never abort the check.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Latest stored snapshot for one symbol, as the store returns it.
///
/// Date and time stay as stored strings so a malformed row degrades to
/// "missing" for that symbol instead of failing the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub symbol: String,
    pub value: f64,
    /// YYYY-MM-DD
    pub update_date: String,
    /// HH:MM:SS
    pub update_time: String,
}

/// Batched lookup of the most recent snapshot per symbol.
///
/// A symbol absent from the result means no record exists for it at all.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn latest_snapshots(&self, symbols: &[String]) -> Result<Vec<SnapshotRecord>>;
}

/// Freshness verdict for one symbol against one expected occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityFreshness {
    pub symbol: String,
    pub has_data: bool,
    /// Latest known record, kept for diagnostics even when stale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_record: Option<SnapshotRecord>,
    /// Seconds past tolerance, only when a same-day record exists but is late
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_by_secs: Option<i64>,
}

impl EntityFreshness {
    fn missing(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            has_data: false,
            latest_record: None,
            stale_by_secs: None,
        }
    }
}

/// Evaluates snapshot freshness against a store.
pub struct FreshnessChecker {
    store: Arc<dyn SnapshotStore>,
}

impl FreshnessChecker {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Check every symbol against the expected occurrence.
    ///
    /// Every requested symbol appears in the result; symbols with no record
    /// at all come back `has_data = false` rather than being omitted.
    pub async fn check(
        &self,
        symbols: &[String],
        expected_date: NaiveDate,
        expected_time: NaiveTime,
        tolerance_minutes: i64,
    ) -> Result<HashMap<String, EntityFreshness>> {
        let mut result: HashMap<String, EntityFreshness> = symbols
            .iter()
            .map(|s| (s.clone(), EntityFreshness::missing(s)))
            .collect();

        let records = self.store.latest_snapshots(symbols).await?;
        let expected = expected_date.and_time(expected_time);
        let tolerance_secs = tolerance_minutes * 60;

        for record in records {
            let Some(entry) = result.get_mut(&record.symbol) else {
                // Store returned a symbol we did not ask about
                continue;
            };

            match parse_record_timestamp(&record) {
                Some(recorded) => {
                    if recorded.date() != expected_date {
                        // A record from another day's cycle never satisfies
                        // this occurrence, even if the time-of-day matches.
                        entry.latest_record = Some(record);
                    } else {
                        let diff = (recorded - expected).num_seconds().abs();
                        if diff <= tolerance_secs {
                            entry.has_data = true;
                            entry.latest_record = Some(record);
                        } else {
                            entry.stale_by_secs = Some(diff - tolerance_secs);
                            entry.latest_record = Some(record);
                        }
                    }
                }
                None => {
                    warn!(
                        symbol = %record.symbol,
                        date = %record.update_date,
                        time = %record.update_time,
                        "Cannot parse snapshot timestamp, treating as missing"
                    );
                    entry.latest_record = Some(record);
                }
            }
        }

        Ok(result)
    }
}

fn parse_record_timestamp(record: &SnapshotRecord) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(&record.update_date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&record.update_time, "%H:%M:%S").ok()?;
    Some(date.and_time(time))
}
