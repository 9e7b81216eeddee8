//! Monitoring configuration
//!
//! Defaults mirror the exchange funding schedule: overlapping 8h, 4h and 1h
//! cadences, a 30-minute tolerance window, hourly scheduler runs. Everything
//! is overridable from the environment.

use std::env;

use serde::{Deserialize, Serialize};

use super::cycle::CadenceDefinition;

pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Seconds between scheduled full runs
    pub check_interval_secs: u64,
    /// Symbols expected to have a snapshot at every occurrence
    pub expected_symbols: Vec<String>,
    /// Minutes after an occurrence during which data still counts as on-time
    pub tolerance_minutes: i64,
    /// Cadences to evaluate, in reporting order
    pub cadences: Vec<CadenceDefinition>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            expected_symbols: vec![
                "BTCUSDT".into(),
                "ETHUSDT".into(),
                "SOLUSDT".into(),
                "XRPUSDT".into(),
            ],
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            cadences: default_cadences(),
        }
    }
}

impl MonitoringConfig {
    /// Load from environment, falling back to defaults per field.
    ///
    /// Recognized: `EXPECTED_SYMBOLS` (comma-separated),
    /// `CHECK_INTERVAL_SECS`, `TOLERANCE_MINUTES`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("EXPECTED_SYMBOLS") {
            let symbols: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !symbols.is_empty() {
                config.expected_symbols = symbols;
            }
        }

        config.check_interval_secs = env::var("CHECK_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);

        config.tolerance_minutes = env::var("TOLERANCE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_TOLERANCE_MINUTES);

        config
    }
}

fn default_cadences() -> Vec<CadenceDefinition> {
    vec![
        CadenceDefinition::every_hours("8h", 8),
        CadenceDefinition::every_hours("4h", 4),
        CadenceDefinition::every_hours("1h", 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_default_cadences() {
        let config = MonitoringConfig::default();
        assert_eq!(config.cadences.len(), 3);
        assert_eq!(config.cadences[0].id, "8h");
        assert_eq!(
            config.cadences[0].times,
            vec![
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            ]
        );
        assert_eq!(config.cadences[1].times.len(), 6);
        assert_eq!(config.cadences[2].times.len(), 24);
    }

    #[test]
    fn test_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.check_interval_secs, 3600);
        assert_eq!(config.tolerance_minutes, 30);
        assert!(!config.expected_symbols.is_empty());
    }
}
