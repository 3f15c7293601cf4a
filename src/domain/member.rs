//! Member: a node in the placement tree plus the sponsor chain.

use serde::{Deserialize, Serialize};

use super::{Decimal, Leg, MemberId, MemberNo, TimeMs};

/// A member row.
///
/// Placement (`placement_parent_id` + `leg`) and sponsorship (`sponsor_id`)
/// are independent relations: who placed me under which slot vs. who
/// referred me. The two chains are never walked through a single link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub member_no: MemberNo,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub national_id: Option<String>,

    /// Referring sponsor. None only for the root member.
    pub sponsor_id: Option<MemberId>,
    /// Placement parent. None while the member waits unplaced.
    pub placement_parent_id: Option<MemberId>,
    /// Occupied slot under the placement parent. None iff unplaced.
    pub leg: Option<Leg>,

    /// Unsettled volume per leg, consumed by matching.
    pub leg_volume_left: i64,
    pub leg_volume_right: i64,
    /// Cumulative volume per leg; never decremented, drives rank.
    pub lifetime_volume_left: i64,
    pub lifetime_volume_right: i64,

    pub cash_balance: Decimal,
    pub rank: String,

    pub created_at: TimeMs,
    pub placed_at: Option<TimeMs>,
}

impl Member {
    /// True once the member occupies a slot, or is the tree root.
    pub fn is_placed(&self) -> bool {
        self.placement_parent_id.is_some() || self.sponsor_id.is_none()
    }

    /// Unsettled volume on the given leg.
    pub fn leg_volume(&self, leg: Leg) -> i64 {
        match leg {
            Leg::Left => self.leg_volume_left,
            Leg::Right => self.leg_volume_right,
        }
    }

    /// Cumulative volume on the given leg.
    pub fn lifetime_volume(&self, leg: Leg) -> i64 {
        match leg {
            Leg::Left => self.lifetime_volume_left,
            Leg::Right => self.lifetime_volume_right,
        }
    }
}

/// Registration input, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub national_id: Option<String>,
}
