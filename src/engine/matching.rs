//! Short-leg matching settlement.

use tracing::info;

use crate::db::repo::MatchingPayout;
use crate::domain::{MemberId, TimeMs};

use super::{retry_on_busy, CompEngine, EngineError};

impl CompEngine {
    /// Settle matching at one member: convert min(left, right) unsettled
    /// volume into cash at the plan's matching rate, carrying the heavy
    /// leg's excess forward. A payout triggers generational distribution.
    ///
    /// The read-subtract-credit-ledger sequence is one transaction in the
    /// repository, so racing propagation paths cannot double-pay.
    pub async fn settle(&self, member_id: MemberId) -> Result<Option<MatchingPayout>, EngineError> {
        let rate = self.plan().matching_rate;

        let payout =
            retry_on_busy(|| self.repo().settle_matching(member_id, rate, TimeMs::now())).await?;

        if let Some(payout) = payout {
            info!(
                member_id = %member_id,
                matched_units = payout.matched_units,
                earned = %payout.earned,
                "Matching settled"
            );
            self.distribute(member_id, payout.earned).await?;
        }

        Ok(payout)
    }
}
