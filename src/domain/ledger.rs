//! Append-only ledger of cash movements.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{Decimal, MemberId, TimeMs};

/// Why a cash movement (or informational entry) was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerCategory {
    /// Flat one-hop bonus to the sponsor of a freshly placed member.
    Referral,
    /// Short-leg matching payout.
    Matching,
    /// Generational override on a downline's matching earning.
    Generation,
    /// Informational, zero-amount rank change marker.
    RankUp,
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Referral => "REFERRAL",
            LedgerCategory::Matching => "MATCHING",
            LedgerCategory::Generation => "GENERATION",
            LedgerCategory::RankUp => "RANK_UP",
        }
    }
}

impl FromStr for LedgerCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REFERRAL" => Ok(LedgerCategory::Referral),
            "MATCHING" => Ok(LedgerCategory::Matching),
            "GENERATION" => Ok(LedgerCategory::Generation),
            "RANK_UP" => Ok(LedgerCategory::RankUp),
            other => Err(format!("invalid ledger category: {}", other)),
        }
    }
}

impl std::fmt::Display for LedgerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable cash-movement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub member_id: MemberId,
    pub amount: Decimal,
    pub category: LedgerCategory,
    pub note: String,
    pub created_at: TimeMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for c in [
            LedgerCategory::Referral,
            LedgerCategory::Matching,
            LedgerCategory::Generation,
            LedgerCategory::RankUp,
        ] {
            assert_eq!(c.as_str().parse::<LedgerCategory>().unwrap(), c);
        }
        assert!("WITHDRAWAL".parse::<LedgerCategory>().is_err());
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&LedgerCategory::RankUp).unwrap(),
            "\"RANK_UP\""
        );
    }
}
