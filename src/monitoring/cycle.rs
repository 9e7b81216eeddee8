//! Cadence cycle calculation
//!
//! Pure schedule math: given a cadence (a named set of times-of-day at which
//! snapshots are expected) and "now", decide whether we are inside a check
//! window, ahead of the next occurrence today, or past everything until
//! tomorrow. Callers supply `now` so everything here is deterministic and
//! testable without the wall clock.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A named set of local times-of-day at which a snapshot is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceDefinition {
    /// Short label, e.g. "8h"
    pub id: String,
    /// Expected occurrence times, sorted ascending, distinct
    pub times: Vec<NaiveTime>,
}

impl CadenceDefinition {
    pub fn new(id: impl Into<String>, mut times: Vec<NaiveTime>) -> Self {
        times.sort();
        times.dedup();
        Self {
            id: id.into(),
            times,
        }
    }

    /// Standard funding-style cadence: every `hours` hours starting at midnight.
    pub fn every_hours(id: impl Into<String>, hours: u32) -> Self {
        let times = (0..24)
            .step_by(hours.max(1) as usize)
            .filter_map(|h| NaiveTime::from_hms_opt(h, 0, 0))
            .collect();
        Self::new(id, times)
    }
}

/// Where "now" sits relative to a cadence's occurrences today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// Inside `[occurrence, occurrence + tolerance]` for some occurrence today
    InWindow,
    /// Before the next occurrence today
    Upcoming,
    /// All of today's occurrences have passed; next one is tomorrow
    NextDay,
}

/// Result of classifying "now" against one cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleClassification {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub state: ScheduleState,
}

impl ScheduleClassification {
    /// The occurrence as a full datetime.
    pub fn occurrence(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn is_in_window(&self) -> bool {
        self.state == ScheduleState::InWindow
    }
}

/// Classify `now` against a cadence with the given tolerance.
///
/// Both window boundaries are inclusive. When the tolerance spans more than
/// one occurrence (dense cadence, wide tolerance) the earliest in-window
/// occurrence wins, so a late-started monitor reports the slot it was meant
/// to check rather than skipping ahead.
pub fn classify(
    cadence: &CadenceDefinition,
    now: NaiveDateTime,
    tolerance_minutes: i64,
) -> ScheduleClassification {
    let today = now.date();
    let tolerance = Duration::minutes(tolerance_minutes.max(0));

    // Earliest occurrence whose window contains now. Times are sorted, so the
    // first hit is the earliest.
    for &time in &cadence.times {
        let occurrence = today.and_time(time);
        if occurrence <= now && now <= occurrence + tolerance {
            return ScheduleClassification {
                date: today,
                time,
                state: ScheduleState::InWindow,
            };
        }
    }

    // Earliest occurrence strictly in the future today.
    for &time in &cadence.times {
        if now < today.and_time(time) {
            return ScheduleClassification {
                date: today,
                time,
                state: ScheduleState::Upcoming,
            };
        }
    }

    // Everything today has passed (or the cadence is empty): first slot tomorrow.
    ScheduleClassification {
        date: today + Duration::days(1),
        time: cadence.times.first().copied().unwrap_or(NaiveTime::MIN),
        state: ScheduleState::NextDay,
    }
}
