//! Career rank thresholds over lifetime leg volumes.

use serde::{Deserialize, Serialize};

/// One rung of the career ladder: a rank requires BOTH lifetime leg
/// volumes to meet their minimums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankThreshold {
    pub name: String,
    pub min_left: i64,
    pub min_right: i64,
}

/// Ordered (ascending) rank threshold table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTable(Vec<RankThreshold>);

impl RankTable {
    /// Build a table from thresholds already sorted ascending.
    pub fn new(thresholds: Vec<RankThreshold>) -> Self {
        RankTable(thresholds)
    }

    /// The career ladder shipped with the standard plan.
    pub fn standard() -> Self {
        let ladder: [(&str, i64); 12] = [
            ("Distributor", 0),
            ("Platinum", 5_000),
            ("Pearl", 15_000),
            ("Sapphire", 50_000),
            ("Ruby", 100_000),
            ("Emerald", 250_000),
            ("Diamond", 500_000),
            ("Double Diamond", 1_000_000),
            ("Triple Diamond", 2_500_000),
            ("President", 5_000_000),
            ("Double President", 10_000_000),
            ("Triple President", 25_000_000),
        ];
        RankTable(
            ladder
                .iter()
                .map(|(name, min)| RankThreshold {
                    name: name.to_string(),
                    min_left: *min,
                    min_right: *min,
                })
                .collect(),
        )
    }

    /// Highest rank whose both thresholds are met by the given lifetime
    /// volumes. Scans ascending and keeps the last qualifying entry.
    pub fn evaluate(&self, lifetime_left: i64, lifetime_right: i64) -> Option<&str> {
        let mut current = None;
        for threshold in &self.0 {
            if lifetime_left >= threshold.min_left && lifetime_right >= threshold.min_right {
                current = Some(threshold.name.as_str());
            }
        }
        current
    }
}
