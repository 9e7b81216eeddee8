//! Daily snapshot presence check
//!
//! Coarser companion to the cadence-based freshness check: instead of asking
//! "did this occurrence's data land within tolerance", asks "has any data
//! landed today at all" per tracked symbol. Served on demand over the API
//! rather than driven by the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::freshness::{SnapshotRecord, SnapshotStore};
use super::monitor::OverallStatus;

/// Today's presence verdict for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPresence {
    pub symbol: String,
    pub has_today_data: bool,
    /// Latest known record, kept for diagnostics even when it is older
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_record: Option<SnapshotRecord>,
}

/// Result of one daily presence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCheckResult {
    /// Local wall-clock time of the check, YYYY-MM-DD HH:MM:SS
    pub timestamp: String,
    /// The day being checked, YYYY-MM-DD
    pub check_date: String,
    pub symbols: HashMap<String, DailyPresence>,
    /// Symbols without any record from the check date, in configured order
    pub missing: Vec<String>,
    pub status: OverallStatus,
    pub message: String,
}

/// Checks that every tracked symbol has at least one record for today.
///
/// WARNING when records exist but none are from today, ERROR when the store
/// holds nothing at all for the tracked symbols or the lookup fails.
pub struct DailyPresenceMonitor {
    store: Arc<dyn SnapshotStore>,
    symbols: Vec<String>,
}

impl DailyPresenceMonitor {
    pub fn new(store: Arc<dyn SnapshotStore>, symbols: Vec<String>) -> Self {
        Self { store, symbols }
    }

    /// Run the check against the current local day.
    pub async fn check(&self) -> DailyCheckResult {
        self.check_at(Local::now().naive_local()).await
    }

    /// Run the check at an explicit instant. Faults never escape: a store
    /// failure comes back as an `ERROR` result.
    pub async fn check_at(&self, now: NaiveDateTime) -> DailyCheckResult {
        info!("Checking daily snapshot presence for all symbols");

        let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let check_date = now.date().format("%Y-%m-%d").to_string();

        let records = match self.store.latest_snapshots(&self.symbols).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Daily presence check failed");
                return DailyCheckResult {
                    timestamp,
                    check_date,
                    symbols: HashMap::new(),
                    missing: self.symbols.clone(),
                    status: OverallStatus::Error,
                    message: format!("Error checking daily snapshot data: {e}"),
                };
            }
        };

        let mut symbols: HashMap<String, DailyPresence> = self
            .symbols
            .iter()
            .map(|s| {
                (
                    s.clone(),
                    DailyPresence {
                        symbol: s.clone(),
                        has_today_data: false,
                        latest_record: None,
                    },
                )
            })
            .collect();

        let any_records = !records.is_empty();
        for record in records {
            let Some(entry) = symbols.get_mut(&record.symbol) else {
                continue;
            };
            entry.has_today_data = record.update_date == check_date;
            entry.latest_record = Some(record);
        }

        // Configured order, so repeated checks produce identical messages
        let missing: Vec<String> = self
            .symbols
            .iter()
            .filter(|s| !symbols.get(*s).map(|p| p.has_today_data).unwrap_or(false))
            .cloned()
            .collect();

        let (status, message) = if missing.is_empty() {
            (
                OverallStatus::Ok,
                format!(
                    "All {} symbols have snapshot data for today ({check_date})",
                    self.symbols.len()
                ),
            )
        } else if !any_records {
            let message = "DAILY SNAPSHOT ALERT: No snapshot data found in store".to_string();
            error!("{message}");
            (OverallStatus::Error, message)
        } else {
            let message = format!(
                "DAILY SNAPSHOT ALERT: No data for today ({check_date}): {}",
                missing.join(", ")
            );
            warn!(missing = missing.len(), "{message}");
            (OverallStatus::Warning, message)
        };

        DailyCheckResult {
            timestamp,
            check_date,
            symbols,
            missing,
            status,
            message,
        }
    }
}
