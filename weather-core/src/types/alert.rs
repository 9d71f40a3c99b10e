//! Temperature alert classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HIGH_TEMP_THRESHOLD, DEFAULT_LOW_TEMP_THRESHOLD};

/// Alert attached to a live weather report.
///
/// Serialized as the human-readable warning shown to API clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureAlert {
    /// Temperature above the high threshold.
    #[serde(rename = "High temperature warning!")]
    High,
    /// Temperature below the low threshold.
    #[serde(rename = "Low temperature warning!")]
    Low,
}

impl TemperatureAlert {
    /// Returns the warning message.
    pub fn message(&self) -> &'static str {
        match self {
            TemperatureAlert::High => "High temperature warning!",
            TemperatureAlert::Low => "Low temperature warning!",
        }
    }
}

impl fmt::Display for TemperatureAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Alert level stored with archived snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    /// Above the high threshold.
    Hot,
    /// Below the low threshold.
    Cold,
    /// Within bounds.
    Normal,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::Hot => "HOT",
            AlertLevel::Cold => "COLD",
            AlertLevel::Normal => "NORMAL",
        };
        f.write_str(s)
    }
}

/// High/low temperature boundaries in °C.
///
/// Both comparisons are strict: a reading exactly on a threshold is normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureThresholds {
    /// Readings above this raise a high alert
    pub high: f64,
    /// Readings below this raise a low alert
    pub low: f64,
}

impl Default for TemperatureThresholds {
    fn default() -> Self {
        Self {
            high: DEFAULT_HIGH_TEMP_THRESHOLD,
            low: DEFAULT_LOW_TEMP_THRESHOLD,
        }
    }
}

impl TemperatureThresholds {
    /// Creates thresholds with explicit bounds.
    pub fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// Returns the alert for a reading, if any.
    pub fn check_alert(&self, temp: f64) -> Option<TemperatureAlert> {
        if temp > self.high {
            Some(TemperatureAlert::High)
        } else if temp < self.low {
            Some(TemperatureAlert::Low)
        } else {
            None
        }
    }

    /// Classifies a reading for snapshot storage.
    pub fn alert_level(&self, temp: f64) -> AlertLevel {
        match self.check_alert(temp) {
            Some(TemperatureAlert::High) => AlertLevel::Hot,
            Some(TemperatureAlert::Low) => AlertLevel::Cold,
            None => AlertLevel::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(40.0, AlertLevel::Hot ; "above high")]
    #[test_case(35.0, AlertLevel::Normal ; "exactly high")]
    #[test_case(20.0, AlertLevel::Normal ; "mild")]
    #[test_case(5.0, AlertLevel::Normal ; "exactly low")]
    #[test_case(-3.5, AlertLevel::Cold ; "below low")]
    fn test_alert_level(temp: f64, expected: AlertLevel) {
        assert_eq!(TemperatureThresholds::default().alert_level(temp), expected);
    }

    #[test]
    fn test_check_alert_custom_bounds() {
        let thresholds = TemperatureThresholds::new(25.0, 10.0);
        assert_eq!(thresholds.check_alert(26.0), Some(TemperatureAlert::High));
        assert_eq!(thresholds.check_alert(9.9), Some(TemperatureAlert::Low));
        assert_eq!(thresholds.check_alert(18.0), None);
    }

    #[test]
    fn test_alert_serialization() {
        let json = serde_json::to_string(&TemperatureAlert::High).unwrap();
        assert_eq!(json, "\"High temperature warning!\"");
        assert_eq!(serde_json::to_string(&AlertLevel::Cold).unwrap(), "\"COLD\"");
        assert_eq!(AlertLevel::Normal.to_string(), "NORMAL");
    }
}
