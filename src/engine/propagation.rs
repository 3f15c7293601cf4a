//! Upward point propagation along the placement tree.
//!
//! Each ancestor step is its own committed unit: apply volume, reevaluate
//! rank, settle matching, then move up. A failure mid-walk leaves lower
//! ancestors committed and upper ancestors untouched (see DESIGN.md).

use tracing::{debug, error};

use crate::domain::{Decimal, Leg, MemberId};

use super::{retry_on_busy, CompEngine, EngineError};

impl CompEngine {
    /// Entry point for a finalized volume event (order or registration).
    ///
    /// `monetary_value` rides along for bookkeeping only; the compensation
    /// math is driven purely by `volume_units` and the plan rates.
    pub async fn record_volume_event(
        &self,
        member_id: MemberId,
        volume_units: i64,
        monetary_value: Decimal,
    ) -> Result<(), EngineError> {
        if volume_units <= 0 {
            return Err(EngineError::InvalidVolume(volume_units));
        }
        if self.repo().get_member(member_id).await?.is_none() {
            return Err(EngineError::MemberNotFound(member_id));
        }
        self.propagate(member_id, volume_units, monetary_value).await
    }

    /// Walk strictly along placement-parent links from `start`, applying
    /// `units` to the joining leg of each ancestor, reevaluating rank and
    /// settling matching at every step.
    ///
    /// The walk is iterative with a configured hop guard: exceeding it is
    /// a data-integrity fault, never a silent truncation.
    pub(crate) async fn propagate(
        &self,
        start: MemberId,
        units: i64,
        monetary_value: Decimal,
    ) -> Result<(), EngineError> {
        let mut current = self
            .repo()
            .get_member(start)
            .await?
            .ok_or(EngineError::MemberNotFound(start))?;

        debug!(
            member_id = %start,
            units,
            monetary_value = %monetary_value,
            "Propagating volume event"
        );

        let max_hops = self.plan().max_propagation_hops;
        let mut hops = 0u32;

        while let (Some(parent_id), Some(leg)) = (current.placement_parent_id, current.leg) {
            if hops >= max_hops {
                error!(
                    member_id = %start,
                    max_hops,
                    "Propagation hop guard exceeded; lower ancestors already committed"
                );
                return Err(EngineError::DataIntegrity(format!(
                    "propagation from member {} exceeded {} hops",
                    start, max_hops
                )));
            }

            self.apply_with_retry(parent_id, leg, units).await?;

            let parent = self.repo().get_member(parent_id).await?.ok_or_else(|| {
                EngineError::DataIntegrity(format!(
                    "placement parent {} vanished during propagation",
                    parent_id
                ))
            })?;

            self.reevaluate_rank(&parent).await?;
            self.settle(parent_id).await?;

            current = parent;
            hops += 1;
        }

        Ok(())
    }

    /// Apply leg volume with a bounded retry on SQLITE_BUSY before the
    /// contention is surfaced as fatal.
    async fn apply_with_retry(
        &self,
        parent_id: MemberId,
        leg: Leg,
        units: i64,
    ) -> Result<(), EngineError> {
        let applied =
            retry_on_busy(|| self.repo().apply_leg_volume(parent_id, leg, units)).await?;
        if !applied {
            return Err(EngineError::DataIntegrity(format!(
                "placement parent {} missing while applying volume",
                parent_id
            )));
        }
        Ok(())
    }
}
