use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Discrete alertness bucket derived from a confidence in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertnessLevel {
    VeryAlert,
    Alert,
    SlightlyDrowsy,
    Drowsy,
    VeryDrowsy,
}

/// Inclusive lower bounds, highest first.
const THRESHOLDS: [(f32, AlertnessLevel); 4] = [
    (80.0, AlertnessLevel::VeryAlert),
    (60.0, AlertnessLevel::Alert),
    (40.0, AlertnessLevel::SlightlyDrowsy),
    (20.0, AlertnessLevel::Drowsy),
];

/// Map a confidence to its alertness level.
///
/// Total over `f32`; performs no clamping. NaN compares false against every
/// bound and lands on [`AlertnessLevel::VeryDrowsy`].
pub fn classify(confidence: f32) -> AlertnessLevel {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| confidence >= *bound)
        .map(|(_, level)| *level)
        .unwrap_or(AlertnessLevel::VeryDrowsy)
}

impl AlertnessLevel {
    pub const ALL: [AlertnessLevel; 5] = [
        AlertnessLevel::VeryAlert,
        AlertnessLevel::Alert,
        AlertnessLevel::SlightlyDrowsy,
        AlertnessLevel::Drowsy,
        AlertnessLevel::VeryDrowsy,
    ];

    /// Human-readable label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertnessLevel::VeryAlert => "Very Alert",
            AlertnessLevel::Alert => "Alert",
            AlertnessLevel::SlightlyDrowsy => "Slightly Drowsy",
            AlertnessLevel::Drowsy => "Drowsy",
            AlertnessLevel::VeryDrowsy => "Very Drowsy",
        }
    }
}

impl fmt::Display for AlertnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown alertness label: {0:?}")]
pub struct ParseAlertnessError(pub String);

impl FromStr for AlertnessLevel {
    type Err = ParseAlertnessError;

    /// Case-insensitive; words may be separated by spaces, `_` or `-`, or
    /// run together (`VeryAlert`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "veryalert" => Ok(AlertnessLevel::VeryAlert),
            "alert" => Ok(AlertnessLevel::Alert),
            "slightlydrowsy" => Ok(AlertnessLevel::SlightlyDrowsy),
            "drowsy" => Ok(AlertnessLevel::Drowsy),
            "verydrowsy" => Ok(AlertnessLevel::VeryDrowsy),
            _ => Err(ParseAlertnessError(s.to_string())),
        }
    }
}

impl Serialize for AlertnessLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlertnessLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
