//! Multi-cycle snapshot monitoring
//!
//! Orchestrates one full check: classifies every configured cadence against
//! "now", runs the freshness checker for cadences currently inside their
//! window, dispatches alerts for missing data, and merges everything into a
//! single deterministic result. One cadence failing its store call never
//! aborts the others.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::alert::AlertDispatcher;
use super::config::MonitoringConfig;
use super::cycle::{classify, CadenceDefinition, ScheduleClassification};
use super::freshness::{EntityFreshness, FreshnessChecker};

/// Outcome of one cadence's check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Ok,
    Warning,
    NoCheckNeeded,
    Error,
}

/// Merged outcome across all cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Ok,
    Warning,
    Error,
}

/// Result of checking one cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleCheckResult {
    pub cadence_id: String,
    pub schedule: ScheduleClassification,
    /// Per-symbol freshness; empty when no check ran
    pub symbols: HashMap<String, EntityFreshness>,
    /// Symbols with no fresh data, in configured order
    pub missing: Vec<String>,
    pub status: CycleStatus,
    pub message: String,
    pub alert_sent: bool,
}

/// Result of one full monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallCheckResult {
    /// Local wall-clock time of the run, YYYY-MM-DD HH:MM:SS
    pub timestamp: String,
    /// One entry per configured cadence, in configured order
    pub cycles: Vec<CycleCheckResult>,
    pub overall_status: OverallStatus,
    pub message: String,
    pub total_symbols: usize,
}

impl OverallCheckResult {
    pub fn cycle(&self, cadence_id: &str) -> Option<&CycleCheckResult> {
        self.cycles.iter().find(|c| c.cadence_id == cadence_id)
    }
}

/// Runs freshness checks across every configured cadence.
pub struct CycleMonitor {
    config: MonitoringConfig,
    checker: FreshnessChecker,
    dispatcher: Arc<AlertDispatcher>,
}

impl CycleMonitor {
    pub fn new(
        config: MonitoringConfig,
        checker: FreshnessChecker,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            config,
            checker,
            dispatcher,
        }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Run a full check at the current local time.
    pub async fn run_all(&self) -> OverallCheckResult {
        self.run_all_at(Local::now().naive_local()).await
    }

    /// Run a full check at an explicit instant.
    ///
    /// Never returns an error: store faults surface as per-cadence `ERROR`
    /// results and an overall `ERROR` status.
    pub async fn run_all_at(&self, now: NaiveDateTime) -> OverallCheckResult {
        info!("Checking snapshot freshness for all cadences");

        let mut cycles = Vec::with_capacity(self.config.cadences.len());
        for cadence in &self.config.cadences {
            cycles.push(self.run_cycle(cadence, now).await);
        }

        let any_error = cycles.iter().any(|c| c.status == CycleStatus::Error);
        let any_warning = cycles.iter().any(|c| c.status == CycleStatus::Warning);
        let overall_status = if any_error {
            OverallStatus::Error
        } else if any_warning {
            OverallStatus::Warning
        } else {
            OverallStatus::Ok
        };

        let message = compose_overall_message(&cycles);

        if any_error {
            let details: Vec<String> = cycles
                .iter()
                .filter(|c| c.status == CycleStatus::Error)
                .map(|c| format!("{}: {}", c.cadence_id, c.message))
                .collect();
            self.dispatcher
                .notify_status("ERROR", &details.join("\n"))
                .await;
        }

        OverallCheckResult {
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            cycles,
            overall_status,
            message,
            total_symbols: self.config.expected_symbols.len(),
        }
    }

    /// Check one cadence: classify, and only query the store when inside a
    /// check window.
    async fn run_cycle(&self, cadence: &CadenceDefinition, now: NaiveDateTime) -> CycleCheckResult {
        let schedule = classify(cadence, now, self.config.tolerance_minutes);
        let expected_instant = format!("{} {}", schedule.date, schedule.time.format("%H:%M:%S"));

        if !schedule.is_in_window() {
            return CycleCheckResult {
                cadence_id: cadence.id.clone(),
                schedule,
                symbols: HashMap::new(),
                missing: Vec::new(),
                status: CycleStatus::NoCheckNeeded,
                message: format!(
                    "Not in {} check window. Next snapshot time: {expected_instant}",
                    cadence.id
                ),
                alert_sent: false,
            };
        }

        let symbols = match self
            .checker
            .check(
                &self.config.expected_symbols,
                schedule.date,
                schedule.time,
                self.config.tolerance_minutes,
            )
            .await
        {
            Ok(symbols) => symbols,
            Err(e) => {
                error!(cadence = %cadence.id, error = %e, "Freshness check failed");
                return CycleCheckResult {
                    cadence_id: cadence.id.clone(),
                    schedule,
                    symbols: HashMap::new(),
                    missing: Vec::new(),
                    status: CycleStatus::Error,
                    message: format!("Error checking snapshot data: {e}"),
                    alert_sent: false,
                };
            }
        };

        // Configured order, so repeated runs produce identical messages
        let missing: Vec<String> = self
            .config
            .expected_symbols
            .iter()
            .filter(|s| !symbols.get(*s).map(|f| f.has_data).unwrap_or(false))
            .cloned()
            .collect();

        if missing.is_empty() {
            info!(cadence = %cadence.id, "All symbols have fresh snapshot data");
            return CycleCheckResult {
                cadence_id: cadence.id.clone(),
                schedule,
                symbols,
                missing,
                status: CycleStatus::Ok,
                message: format!(
                    "All {} symbols have snapshot data for the {} cycle",
                    self.config.expected_symbols.len(),
                    cadence.id
                ),
                alert_sent: false,
            };
        }

        let message = format!(
            "SNAPSHOT {} ALERT: {} symbols missing data at {expected_instant}: {}",
            cadence.id.to_uppercase(),
            missing.len(),
            missing.join(", ")
        );
        warn!(cadence = %cadence.id, missing = missing.len(), "{message}");

        let alert_sent = self
            .dispatcher
            .notify_missing(&cadence.id, &missing, &expected_instant)
            .await;

        CycleCheckResult {
            cadence_id: cadence.id.clone(),
            schedule,
            symbols,
            missing,
            status: CycleStatus::Warning,
            message,
            alert_sent,
        }
    }
}

fn compose_overall_message(cycles: &[CycleCheckResult]) -> String {
    let warnings: Vec<String> = cycles
        .iter()
        .filter(|c| c.status == CycleStatus::Warning)
        .map(|c| format!("{}: {} symbols missing", c.cadence_id, c.missing.len()))
        .collect();
    if !warnings.is_empty() {
        return format!("SNAPSHOT ALERTS - {}", warnings.join(", "));
    }

    let errors: Vec<&str> = cycles
        .iter()
        .filter(|c| c.status == CycleStatus::Error)
        .map(|c| c.cadence_id.as_str())
        .collect();
    if !errors.is_empty() {
        return format!("SNAPSHOT CHECK ERRORS - {}", errors.join(", "));
    }

    let active: Vec<&str> = cycles
        .iter()
        .filter(|c| c.schedule.is_in_window())
        .map(|c| c.cadence_id.as_str())
        .collect();
    if active.is_empty() {
        "No active snapshot checks at this time".to_string()
    } else {
        format!(
            "All symbols have complete data for active cycles: {}",
            active.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::alert::NotificationChannel;
    use crate::monitoring::freshness::{SnapshotRecord, SnapshotStore};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeStore {
        records: Vec<SnapshotRecord>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SnapshotStore for FakeStore {
        async fn latest_snapshots(&self, symbols: &[String]) -> Result<Vec<SnapshotRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("store timeout");
            }
            Ok(self
                .records
                .iter()
                .filter(|r| symbols.contains(&r.symbol))
                .cloned()
                .collect())
        }
    }

    struct NullChannel {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl NotificationChannel for NullChannel {
        async fn send(&self, _text: &str) -> bool {
            self.sends.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn record(symbol: &str, date: &str, time: &str) -> SnapshotRecord {
        SnapshotRecord {
            symbol: symbol.to_string(),
            value: 0.0001,
            update_date: date.to_string(),
            update_time: time.to_string(),
        }
    }

    fn config_8h(symbols: &[&str]) -> MonitoringConfig {
        MonitoringConfig {
            check_interval_secs: 3600,
            expected_symbols: symbols.iter().map(|s| s.to_string()).collect(),
            tolerance_minutes: 30,
            cadences: vec![CadenceDefinition::every_hours("8h", 8)],
        }
    }

    fn build(
        config: MonitoringConfig,
        records: Vec<SnapshotRecord>,
        fail: bool,
    ) -> (CycleMonitor, Arc<FakeStore>, Arc<NullChannel>) {
        let store = Arc::new(FakeStore {
            records,
            calls: AtomicUsize::new(0),
            fail,
        });
        let channel = Arc::new(NullChannel {
            sends: AtomicUsize::new(0),
        });
        let dispatcher = Arc::new(AlertDispatcher::new(
            channel.clone(),
            Duration::from_secs(3600),
        ));
        let monitor = CycleMonitor::new(config, FreshnessChecker::new(store.clone()), dispatcher);
        (monitor, store, channel)
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_window_missing_symbol_warns() {
        // A has data at 08:05, B has none; now = 08:15 in the 08:00 window
        let (monitor, _, channel) = build(
            config_8h(&["A", "B"]),
            vec![record("A", "2025-06-15", "08:05:00")],
            false,
        );

        let result = monitor.run_all_at(at(8, 15, 0)).await;
        assert_eq!(result.overall_status, OverallStatus::Warning);

        let cycle = result.cycle("8h").unwrap();
        assert_eq!(cycle.status, CycleStatus::Warning);
        assert_eq!(cycle.missing, vec!["B".to_string()]);
        assert!(cycle.alert_sent);
        assert_eq!(channel.sends.load(Ordering::SeqCst), 1);
        assert!(result.message.contains("8h: 1 symbols missing"));
    }

    #[tokio::test]
    async fn test_outside_window_skips_store_entirely() {
        let (monitor, store, channel) = build(config_8h(&["A", "B"]), vec![], false);

        let result = monitor.run_all_at(at(8, 45, 1)).await;
        let cycle = result.cycle("8h").unwrap();
        assert_eq!(cycle.status, CycleStatus::NoCheckNeeded);
        assert_eq!(cycle.schedule.time.format("%H:%M:%S").to_string(), "16:00:00");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(channel.sends.load(Ordering::SeqCst), 0);
        assert_eq!(result.overall_status, OverallStatus::Ok);
        assert_eq!(result.message, "No active snapshot checks at this time");
    }

    #[tokio::test]
    async fn test_all_fresh_is_ok() {
        let (monitor, _, channel) = build(
            config_8h(&["A", "B"]),
            vec![
                record("A", "2025-06-15", "08:00:00"),
                record("B", "2025-06-15", "08:10:00"),
            ],
            false,
        );

        let result = monitor.run_all_at(at(8, 15, 0)).await;
        assert_eq!(result.overall_status, OverallStatus::Ok);
        let cycle = result.cycle("8h").unwrap();
        assert_eq!(cycle.status, CycleStatus::Ok);
        assert!(cycle.missing.is_empty());
        assert_eq!(channel.sends.load(Ordering::SeqCst), 0);
        assert!(result.message.contains("active cycles: 8h"));
    }

    #[tokio::test]
    async fn test_store_failure_is_cycle_error_not_crash() {
        let (monitor, _, channel) = build(config_8h(&["A"]), vec![], true);

        let result = monitor.run_all_at(at(8, 15, 0)).await;
        assert_eq!(result.overall_status, OverallStatus::Error);
        let cycle = result.cycle("8h").unwrap();
        assert_eq!(cycle.status, CycleStatus::Error);
        assert!(cycle.message.contains("store timeout"));
        // Error path sends a system-status notice, not a missing-data alert
        assert_eq!(channel.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_cadence_error_does_not_abort_others() {
        // Two cadences share the failing store; both report independently
        let mut config = config_8h(&["A"]);
        config.cadences = vec![
            CadenceDefinition::every_hours("8h", 8),
            CadenceDefinition::every_hours("1h", 1),
        ];
        let (monitor, store, _) = build(config, vec![], true);

        let result = monitor.run_all_at(at(8, 15, 0)).await;
        assert_eq!(result.cycles.len(), 2);
        assert_eq!(result.cycle("8h").unwrap().status, CycleStatus::Error);
        assert_eq!(result.cycle("1h").unwrap().status, CycleStatus::Error);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cycles_keep_configured_order() {
        let mut config = config_8h(&["A"]);
        config.cadences = vec![
            CadenceDefinition::every_hours("8h", 8),
            CadenceDefinition::every_hours("4h", 4),
            CadenceDefinition::every_hours("1h", 1),
        ];
        let (monitor, _, _) = build(config, vec![record("A", "2025-06-15", "08:00:00")], false);

        let result = monitor.run_all_at(at(8, 15, 0)).await;
        let ids: Vec<&str> = result.cycles.iter().map(|c| c.cadence_id.as_str()).collect();
        assert_eq!(ids, vec!["8h", "4h", "1h"]);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_idempotent() {
        let (monitor, _, _) = build(
            config_8h(&["A", "B"]),
            vec![record("A", "2025-06-15", "08:05:00")],
            false,
        );

        let first = monitor.run_all_at(at(8, 15, 0)).await;
        let second = monitor.run_all_at(at(8, 15, 0)).await;

        assert_eq!(first.message, second.message);
        assert_eq!(first.overall_status, second.overall_status);
        let (a, b) = (first.cycle("8h").unwrap(), second.cycle("8h").unwrap());
        assert_eq!(a.missing, b.missing);
        assert_eq!(a.status, b.status);
        // Second run's alert is deduplicated, contents otherwise identical
        assert!(a.alert_sent);
        assert!(!b.alert_sent);
    }
}
