//! Registration, open-slot resolution, and one-time tree placement.

use tracing::{info, warn};

use crate::db::repo::PlaceOutcome;
use crate::domain::{LedgerCategory, Leg, Member, MemberId, MemberProfile, TimeMs};

use super::{retry_on_busy, CompEngine, EngineError};

impl CompEngine {
    /// Register a new member into the waiting room.
    ///
    /// The member gets a "90…" member number and a sponsor link, but no
    /// placement: the sponsor places them later via [`CompEngine::place`].
    pub async fn register(
        &self,
        profile: MemberProfile,
        sponsor_id: MemberId,
    ) -> Result<Member, EngineError> {
        if self.repo().get_member(sponsor_id).await?.is_none() {
            return Err(EngineError::SponsorNotFound(sponsor_id));
        }
        self.insert_new_member(profile, Some(sponsor_id)).await
    }

    /// Seed the tree origin: no sponsor, no placement parent, yet placed
    /// by definition. Used by setup tooling and tests.
    pub async fn create_root(&self, profile: MemberProfile) -> Result<Member, EngineError> {
        self.insert_new_member(profile, None).await
    }

    async fn insert_new_member(
        &self,
        profile: MemberProfile,
        sponsor_id: Option<MemberId>,
    ) -> Result<Member, EngineError> {
        if let Some(field) = self.repo().find_duplicate_contact(&profile).await? {
            return Err(EngineError::DuplicateContact(field.to_string()));
        }

        let member_no = self.repo().next_member_no().await?;
        let entry_rank = self
            .plan()
            .rank_table
            .evaluate(0, 0)
            .unwrap_or("Distributor")
            .to_string();

        let id = match self
            .repo()
            .insert_member(&profile, sponsor_id, &member_no, &entry_rank, TimeMs::now())
            .await
        {
            Ok(id) => id,
            // A racing registration can slip past the pre-check; the UNIQUE
            // indexes on contact fields settle it.
            Err(e) if crate::db::repo::is_unique_violation(&e) => {
                return Err(EngineError::DuplicateContact("contact".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        info!(member_id = %id, member_no = %member_no, "Registered member into waiting room");

        self.repo()
            .get_member(id)
            .await?
            .ok_or(EngineError::MemberNotFound(id))
    }

    /// Resolve the unique open slot on the outer edge of `leg` below the
    /// anchor: descend strictly along the same leg, never crossing into
    /// the sibling leg.
    pub async fn find_open_slot(
        &self,
        anchor: MemberId,
        leg: Leg,
    ) -> Result<MemberId, EngineError> {
        let max_depth = self.plan().max_propagation_hops;
        match self.repo().find_open_slot(anchor, leg, max_depth).await? {
            None => Err(EngineError::AnchorNotFound(anchor)),
            Some((_, depth)) if depth >= max_depth => Err(EngineError::DataIntegrity(format!(
                "leg chain below anchor {} exceeds {} levels",
                anchor, max_depth
            ))),
            Some((slot, _)) => Ok(slot),
        }
    }

    /// Place a waiting-room member under `(anchor, leg)`, then run the
    /// registration economics: propagate the configured registration
    /// volume from the new member and pay the sponsor the flat referral
    /// bonus.
    ///
    /// Placement is irreversible; the slot check is re-run at commit time.
    pub async fn place(
        &self,
        member_id: MemberId,
        anchor_id: MemberId,
        leg: Leg,
    ) -> Result<(), EngineError> {
        match self
            .repo()
            .place_member(member_id, anchor_id, leg, TimeMs::now())
            .await?
        {
            PlaceOutcome::Placed => {}
            PlaceOutcome::MemberNotFound => return Err(EngineError::MemberNotFound(member_id)),
            PlaceOutcome::AlreadyPlaced => return Err(EngineError::AlreadyPlaced(member_id)),
            PlaceOutcome::AnchorNotFound => return Err(EngineError::AnchorNotFound(anchor_id)),
            PlaceOutcome::SlotOccupied => return Err(EngineError::SlotOccupied(anchor_id, leg)),
        }

        let member = self
            .repo()
            .get_member(member_id)
            .await?
            .ok_or(EngineError::MemberNotFound(member_id))?;

        info!(member_id = %member_id, anchor_id = %anchor_id, leg = %leg, "Placed member");

        let plan = self.plan();
        self.propagate(
            member_id,
            plan.registration_volume_units,
            plan.registration_monetary_value,
        )
        .await?;

        if let Some(sponsor_id) = member.sponsor_id {
            let bonus = plan.registration_monetary_value * plan.referral_bonus_rate;
            if bonus.is_positive() {
                let note = format!("Referral bonus for new member {}", member.full_name);
                let credited = retry_on_busy(|| {
                    self.repo().credit_cash(
                        sponsor_id,
                        bonus,
                        LedgerCategory::Referral,
                        &note,
                        TimeMs::now(),
                    )
                })
                .await?;
                if !credited {
                    warn!(
                        member_id = %member_id,
                        sponsor_id = %sponsor_id,
                        "Sponsor row missing, referral bonus skipped"
                    );
                }
            }
        }

        Ok(())
    }
}
