//! Rank reevaluation over lifetime leg volumes.

use tracing::info;

use crate::domain::{Member, TimeMs};

use super::{retry_on_busy, CompEngine, EngineError};

impl CompEngine {
    /// Recompute a member's rank: the highest table entry whose BOTH leg
    /// thresholds are met by the lifetime volumes. Lifetime volumes are
    /// monotone, so rank never regresses; only upgrades are recorded.
    pub async fn reevaluate_rank(&self, member: &Member) -> Result<(), EngineError> {
        let new_rank = match self.plan().rank_table.evaluate(
            member.lifetime_volume_left,
            member.lifetime_volume_right,
        ) {
            Some(rank) => rank,
            None => return Ok(()),
        };

        if new_rank != member.rank {
            retry_on_busy(|| self.repo().update_rank(member.id, new_rank, TimeMs::now())).await?;
            info!(
                member_id = %member.id,
                from = %member.rank,
                to = new_rank,
                "Rank advanced"
            );
        }

        Ok(())
    }
}
