//! Robot position samples
//!
//! The position service returns a plain-text location key every poll tick.
//! Samples are ephemeral; only the staging-point classification matters to
//! the pickup workflow.

use serde::{Deserialize, Serialize};

/// Location keys the robot reports while parked at the pickup staging point.
const STAGING_POINT_KEYS: [&str; 3] = ["starting", "start", "start_point"];

/// One poll tick's worth of position data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionSample {
    /// Normalized key: trimmed and lowercased
    pub key: String,
    /// Raw body as returned by the service
    pub raw: String,
}

impl PositionSample {
    /// Build a sample from the plain-text response body
    pub fn from_raw(body: &str) -> Self {
        let raw = body.trim().to_string();
        Self {
            key: raw.to_lowercase(),
            raw,
        }
    }

    /// Whether the robot is parked at the staging point
    pub fn is_staging_point(&self) -> bool {
        STAGING_POINT_KEYS.contains(&self.key.as_str())
    }

    /// Extract a table number from keys like `table3` or `table 3`
    pub fn table_number(&self) -> Option<u32> {
        let rest = self.key.strip_prefix("table")?;
        let digits = rest.trim_start();
        if digits.is_empty() {
            return None;
        }
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_point_vocabulary_is_case_insensitive() {
        for raw in ["Starting", "START", "start_point", "  starting  "] {
            assert!(
                PositionSample::from_raw(raw).is_staging_point(),
                "expected {raw:?} to classify as staging point"
            );
        }
    }

    #[test]
    fn test_table_keys_are_not_staging_points() {
        assert!(!PositionSample::from_raw("table3").is_staging_point());
        assert!(!PositionSample::from_raw("").is_staging_point());
        assert!(!PositionSample::from_raw("startled").is_staging_point());
    }

    #[test]
    fn test_table_number_extraction() {
        assert_eq!(PositionSample::from_raw("table3").table_number(), Some(3));
        assert_eq!(PositionSample::from_raw("Table 12").table_number(), Some(12));
        assert_eq!(PositionSample::from_raw("starting").table_number(), None);
        assert_eq!(PositionSample::from_raw("tablex").table_number(), None);
    }
}
