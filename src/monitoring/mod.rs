//! Snapshot freshness monitoring engine
//!
//! Watches the snapshot store for expected periodic market data across
//! overlapping cadences (8h, 4h, 1h) and raises deduplicated alerts when an
//! occurrence's data has not landed within the tolerance window.
//!
//! Pipeline: scheduler -> cycle monitor -> {cycle classification, freshness
//! check against the store} -> alert dispatcher -> notification channel.
//! Collaborators sit behind the `SnapshotStore` and `NotificationChannel`
//! traits so the whole engine is testable with substitutes.

pub mod alert;
pub mod config;
pub mod cycle;
pub mod daily;
pub mod freshness;
pub mod monitor;
pub mod scheduler;

pub use alert::{AlertDispatcher, NotificationChannel};
pub use config::MonitoringConfig;
pub use daily::{DailyCheckResult, DailyPresence, DailyPresenceMonitor};
pub use cycle::{classify, CadenceDefinition, ScheduleClassification, ScheduleState};
pub use freshness::{EntityFreshness, FreshnessChecker, SnapshotRecord, SnapshotStore};
pub use monitor::{CycleCheckResult, CycleMonitor, CycleStatus, OverallCheckResult, OverallStatus};
pub use scheduler::{MonitoringScheduler, SchedulerState};
