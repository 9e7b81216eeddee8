//! Alert dispatch
//!
//! Turns missing-data findings into fixed-structure notifications and
//! forwards them to the configured channel. Channel failures are logged and
//! reported as `false`, never raised. Repeat alerts for the same
//! `(cadence, occurrence)` are suppressed for one tolerance window so a
//! check interval shorter than the window does not spam the channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Best-effort outbound notification channel.
///
/// May be unconfigured, in which case `send` returns `false` without doing
/// anything. Implementations must not panic on delivery failure.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, text: &str) -> bool;
}

/// Formats and dispatches monitoring alerts.
pub struct AlertDispatcher {
    channel: Arc<dyn NotificationChannel>,
    /// (cadence_id, occurrence) -> first alert time, for dedup
    recent_alerts: Mutex<HashMap<(String, String), Instant>>,
    dedup_ttl: Duration,
}

impl AlertDispatcher {
    /// `dedup_ttl` should span the tolerance window so one missed occurrence
    /// alerts at most once per process lifetime.
    pub fn new(channel: Arc<dyn NotificationChannel>, dedup_ttl: Duration) -> Self {
        Self {
            channel,
            recent_alerts: Mutex::new(HashMap::new()),
            dedup_ttl,
        }
    }

    /// Send a missing-data alert for one cadence occurrence.
    ///
    /// Returns whether the channel accepted the message. Suppressed
    /// duplicates and channel failures both come back `false`.
    pub async fn notify_missing(
        &self,
        cadence_id: &str,
        missing_symbols: &[String],
        expected_instant: &str,
    ) -> bool {
        if missing_symbols.is_empty() {
            return false;
        }

        if !self.should_alert(cadence_id, expected_instant) {
            debug!(
                cadence = cadence_id,
                expected = expected_instant,
                "Duplicate alert suppressed"
            );
            return false;
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        let symbols_list = missing_symbols.join("\n");
        let message = format!(
            "SNAPSHOT FRESHNESS ALERT ({cadence_id})\n\n\
             Time: {now}\n\
             Expected snapshot time: {expected_instant}\n\n\
             Missing data symbols:\n{symbols_list}\n\n\
             Status: store does not have fresh snapshot data\n\
             Action: please check the data collection pipeline\n\n\
             #Snapshot #DataMissing #Alert"
        );

        let sent = self.channel.send(&message).await;
        if !sent {
            warn!(
                cadence = cadence_id,
                "Failed to deliver missing-data alert"
            );
        }
        sent
    }

    /// Send a generic system-status notice (startup, errors).
    pub async fn notify_status(&self, status: &str, details: &str) -> bool {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        let message = format!(
            "SYSTEM MONITORING STATUS\n\n\
             Time: {now}\n\
             Status: {status}\n\n\
             Details:\n{details}\n\n\
             #SystemStatus #Monitoring"
        );

        let sent = self.channel.send(&message).await;
        if !sent {
            warn!(status, "Failed to deliver status notice");
        }
        sent
    }

    /// Record the event key, pruning expired entries; false when the same
    /// occurrence already alerted within the TTL.
    fn should_alert(&self, cadence_id: &str, expected_instant: &str) -> bool {
        let key = (cadence_id.to_string(), expected_instant.to_string());
        let now = Instant::now();
        let mut recent = self.recent_alerts.lock();
        recent.retain(|_, sent_at| now.duration_since(*sent_at) < self.dedup_ttl);
        if recent.contains_key(&key) {
            return false;
        }
        recent.insert(key, now);
        true
    }
}
