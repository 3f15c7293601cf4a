//! Generational overrides up the sponsor chain.
//!
//! Walks `sponsor_id` links, never placement links: who referred me, not
//! who placed me.

use tracing::debug;

use crate::domain::{Decimal, LedgerCategory, MemberId, TimeMs};

use super::{retry_on_busy, CompEngine, EngineError};

impl CompEngine {
    /// Pay each of the first N sponsor generations its configured share of
    /// a matching earning. Stops at the first unconfigured generation or
    /// missing sponsor, whichever comes first.
    ///
    /// The hard depth cap is independent of configured rates; hitting it
    /// with payouts still owed is a data-integrity fault (a malformed or
    /// cyclic sponsor chain), never a silent stop.
    pub async fn distribute(
        &self,
        origin: MemberId,
        earned: Decimal,
    ) -> Result<(), EngineError> {
        let mut current = self
            .repo()
            .get_member(origin)
            .await?
            .ok_or(EngineError::MemberNotFound(origin))?;

        let plan = self.plan();
        let mut generation = 1u32;

        while generation <= plan.max_generation_depth {
            let rate = match plan.generation_rates.get(&generation) {
                Some(rate) => *rate,
                None => return Ok(()),
            };
            let sponsor_id = match current.sponsor_id {
                Some(id) => id,
                None => return Ok(()),
            };
            let sponsor = self.repo().get_member(sponsor_id).await?.ok_or_else(|| {
                EngineError::DataIntegrity(format!(
                    "sponsor {} of member {} missing during distribution",
                    sponsor_id, current.id
                ))
            })?;

            let bonus = earned * rate;
            let note = format!(
                "Generation {} override from {}'s matching earning",
                generation, current.full_name
            );
            let credited = retry_on_busy(|| {
                self.repo().credit_cash(
                    sponsor.id,
                    bonus,
                    LedgerCategory::Generation,
                    &note,
                    TimeMs::now(),
                )
            })
            .await?;
            if !credited {
                return Err(EngineError::DataIntegrity(format!(
                    "sponsor {} vanished before the override credit",
                    sponsor.id
                )));
            }

            debug!(
                sponsor_id = %sponsor.id,
                generation,
                bonus = %bonus,
                "Paid generational override"
            );

            current = sponsor;
            generation += 1;
        }

        // Rates configured past the cap with sponsors still above: the
        // chain is longer than any legitimate tree allows.
        if plan.generation_rates.contains_key(&generation) && current.sponsor_id.is_some() {
            return Err(EngineError::DataIntegrity(format!(
                "generation walk from member {} exceeded depth cap {}",
                origin, plan.max_generation_depth
            )));
        }

        Ok(())
    }
}
