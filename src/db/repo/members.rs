//! Member directory, placement, and volume operations for the repository.

use sqlx::Row;

use crate::domain::{
    Decimal, LedgerCategory, Leg, Member, MemberId, MemberNo, MemberProfile, TimeMs,
};

use super::{is_unique_violation, row_to_member, MatchingPayout, PlaceOutcome, Repository};

const MEMBER_COLUMNS: &str = "id, member_no, full_name, email, phone, national_id, sponsor_id, \
     placement_parent_id, leg, leg_volume_left, leg_volume_right, \
     lifetime_volume_left, lifetime_volume_right, cash_balance, rank, created_at, placed_at";

impl Repository {
    /// Fetch a member by id.
    pub async fn get_member(&self, id: MemberId) -> Result<Option<Member>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members WHERE id = ?",
            MEMBER_COLUMNS
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_member))
    }

    /// Which contact field of the profile is already registered, if any.
    pub async fn find_duplicate_contact(
        &self,
        profile: &MemberProfile,
    ) -> Result<Option<&'static str>, sqlx::Error> {
        let email_taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM members WHERE email = ?")
            .bind(&profile.email)
            .fetch_optional(&self.pool)
            .await?;
        if email_taken.is_some() {
            return Ok(Some("email"));
        }

        let phone_taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM members WHERE phone = ?")
            .bind(&profile.phone)
            .fetch_optional(&self.pool)
            .await?;
        if phone_taken.is_some() {
            return Ok(Some("phone"));
        }

        if let Some(national_id) = &profile.national_id {
            let id_taken: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM members WHERE national_id = ?")
                    .bind(national_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if id_taken.is_some() {
                return Ok(Some("national id"));
            }
        }

        Ok(None)
    }

    /// Allocate the next external member number in the "90…" series.
    pub async fn next_member_no(&self) -> Result<MemberNo, sqlx::Error> {
        let row =
            sqlx::query("SELECT MAX(member_no) AS max_no FROM members WHERE member_no LIKE '90%'")
                .fetch_one(&self.pool)
                .await?;

        let max_no: Option<String> = row.get("max_no");
        let next = match max_no.and_then(|n| n.parse::<i64>().ok()) {
            Some(n) => (n + 1).to_string(),
            None => "900000001".to_string(),
        };
        Ok(MemberNo::new(next))
    }

    /// Insert a new member into the waiting room (no placement yet).
    pub async fn insert_member(
        &self,
        profile: &MemberProfile,
        sponsor_id: Option<MemberId>,
        member_no: &MemberNo,
        rank: &str,
        created_at: TimeMs,
    ) -> Result<MemberId, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO members
                (member_no, full_name, email, phone, national_id, sponsor_id, rank, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(member_no.as_str())
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(profile.national_id.as_deref())
        .bind(sponsor_id.map(|s| s.as_i64()))
        .bind(rank)
        .bind(created_at.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(MemberId::new(result.last_insert_rowid()))
    }

    /// Walk the same-leg outer edge from the anchor in one recursive query.
    ///
    /// Returns the deepest occupant of the `leg`-chain (the open slot) and
    /// its depth, or None when the anchor does not exist. A walk that hits
    /// `max_depth` is reported at that depth so the caller can treat it as
    /// a data-integrity fault rather than placing at a truncated position.
    pub async fn find_open_slot(
        &self,
        anchor: MemberId,
        leg: Leg,
        max_depth: u32,
    ) -> Result<Option<(MemberId, u32)>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            WITH RECURSIVE leg_chain(id, depth) AS (
                SELECT id, 0 FROM members WHERE id = ?
                UNION ALL
                SELECT m.id, c.depth + 1
                FROM members m
                JOIN leg_chain c ON m.placement_parent_id = c.id
                WHERE m.leg = ? AND c.depth < ?
            )
            SELECT id, depth FROM leg_chain ORDER BY depth DESC LIMIT 1
            "#,
        )
        .bind(anchor.as_i64())
        .bind(leg.as_str())
        .bind(max_depth as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let id: i64 = r.get("id");
            let depth: i64 = r.get("depth");
            (MemberId::new(id), depth as u32)
        }))
    }

    /// Place a waiting-room member under `(anchor, leg)`.
    ///
    /// The occupancy check is re-run inside the committing transaction and
    /// additionally enforced by the UNIQUE index on
    /// `(placement_parent_id, leg)`, so two racing placements resolve to
    /// exactly one success and one `SlotOccupied`.
    pub async fn place_member(
        &self,
        member_id: MemberId,
        anchor_id: MemberId,
        leg: Leg,
        placed_at: TimeMs,
    ) -> Result<PlaceOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let member: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT placement_parent_id FROM members WHERE id = ?")
                .bind(member_id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        let member = match member {
            None => return Ok(PlaceOutcome::MemberNotFound),
            Some(m) => m,
        };
        if member.0.is_some() {
            return Ok(PlaceOutcome::AlreadyPlaced);
        }

        let anchor: Option<(i64,)> = sqlx::query_as("SELECT id FROM members WHERE id = ?")
            .bind(anchor_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        if anchor.is_none() {
            return Ok(PlaceOutcome::AnchorNotFound);
        }

        let occupant: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM members WHERE placement_parent_id = ? AND leg = ?",
        )
        .bind(anchor_id.as_i64())
        .bind(leg.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        if occupant.is_some() {
            return Ok(PlaceOutcome::SlotOccupied);
        }

        let update = sqlx::query(
            "UPDATE members SET placement_parent_id = ?, leg = ?, placed_at = ? WHERE id = ?",
        )
        .bind(anchor_id.as_i64())
        .bind(leg.as_str())
        .bind(placed_at.as_i64())
        .bind(member_id.as_i64())
        .execute(&mut *tx)
        .await;

        match update {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(PlaceOutcome::SlotOccupied),
            Err(e) => return Err(e),
        }

        match tx.commit().await {
            Ok(()) => Ok(PlaceOutcome::Placed),
            Err(e) if is_unique_violation(&e) => Ok(PlaceOutcome::SlotOccupied),
            Err(e) => Err(e),
        }
    }

    /// Add volume to one leg of a member: unsettled and lifetime counters
    /// move together in a single statement.
    ///
    /// Returns false when the member does not exist.
    pub async fn apply_leg_volume(
        &self,
        member_id: MemberId,
        leg: Leg,
        units: i64,
    ) -> Result<bool, sqlx::Error> {
        let sql = match leg {
            Leg::Left => {
                "UPDATE members SET leg_volume_left = leg_volume_left + ?, \
                 lifetime_volume_left = lifetime_volume_left + ? WHERE id = ?"
            }
            Leg::Right => {
                "UPDATE members SET leg_volume_right = leg_volume_right + ?, \
                 lifetime_volume_right = lifetime_volume_right + ? WHERE id = ?"
            }
        };

        let result = sqlx::query(sql)
            .bind(units)
            .bind(units)
            .bind(member_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Settle matching at one member atomically.
    ///
    /// Reads both leg volumes, subtracts the matched minimum from both,
    /// credits the earning and appends the MATCHING ledger entry - all in
    /// one transaction, so concurrent propagation paths can never
    /// double-subtract or double-pay.
    pub async fn settle_matching(
        &self,
        member_id: MemberId,
        rate: Decimal,
        at: TimeMs,
    ) -> Result<Option<MatchingPayout>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT leg_volume_left, leg_volume_right, cash_balance FROM members WHERE id = ?",
        )
        .bind(member_id.as_i64())
        .fetch_optional(&mut *tx)
        .await?;
        let row = match row {
            None => return Ok(None),
            Some(r) => r,
        };

        let left: i64 = row.get("leg_volume_left");
        let right: i64 = row.get("leg_volume_right");
        if left == 0 || right == 0 {
            return Ok(None);
        }

        let matched_units = left.min(right);
        if matched_units <= 0 {
            // Guards against negative residue from upstream bugs.
            return Ok(None);
        }

        let earned = Decimal::from(matched_units) * rate;
        let cash_str: String = row.get("cash_balance");
        let cash = Decimal::from_str_canonical(&cash_str).unwrap_or_else(|_| Decimal::zero());
        let new_cash = cash + earned;

        sqlx::query(
            "UPDATE members SET leg_volume_left = leg_volume_left - ?, \
             leg_volume_right = leg_volume_right - ?, cash_balance = ? WHERE id = ?",
        )
        .bind(matched_units)
        .bind(matched_units)
        .bind(new_cash.to_canonical_string())
        .bind(member_id.as_i64())
        .execute(&mut *tx)
        .await?;

        let note = format!(
            "Matching on short-leg volume of {} PV at rate {}",
            matched_units, rate
        );
        sqlx::query(
            "INSERT INTO ledger_entries (member_id, amount, category, note, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(member_id.as_i64())
        .bind(earned.to_canonical_string())
        .bind(LedgerCategory::Matching.as_str())
        .bind(&note)
        .bind(at.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(MatchingPayout {
            matched_units,
            earned,
        }))
    }

    /// Credit cash to a member and append the matching ledger entry in one
    /// transaction. Used for referral bonuses and generational overrides.
    ///
    /// Returns false when the member does not exist.
    pub async fn credit_cash(
        &self,
        member_id: MemberId,
        amount: Decimal,
        category: LedgerCategory,
        note: &str,
        at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT cash_balance FROM members WHERE id = ?")
            .bind(member_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        let row = match row {
            None => return Ok(false),
            Some(r) => r,
        };

        let cash_str: String = row.get("cash_balance");
        let cash = Decimal::from_str_canonical(&cash_str).unwrap_or_else(|_| Decimal::zero());
        let new_cash = cash + amount;

        sqlx::query("UPDATE members SET cash_balance = ? WHERE id = ?")
            .bind(new_cash.to_canonical_string())
            .bind(member_id.as_i64())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO ledger_entries (member_id, amount, category, note, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(member_id.as_i64())
        .bind(amount.to_canonical_string())
        .bind(category.as_str())
        .bind(note)
        .bind(at.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Record a rank change together with its informational ledger entry.
    pub async fn update_rank(
        &self,
        member_id: MemberId,
        new_rank: &str,
        at: TimeMs,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE members SET rank = ? WHERE id = ?")
            .bind(new_rank)
            .bind(member_id.as_i64())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO ledger_entries (member_id, amount, category, note, created_at) \
             VALUES (?, '0', ?, ?, ?)",
        )
        .bind(member_id.as_i64())
        .bind(LedgerCategory::RankUp.as_str())
        .bind(format!("New career rank: {}", new_rank))
        .bind(at.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Count of all placement-tree descendants under one leg of a member.
    /// Depth-bounded like the other recursive walks, so malformed cyclic
    /// placement data cannot spin the query forever.
    pub async fn team_size(
        &self,
        member_id: MemberId,
        leg: Leg,
        max_depth: u32,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            WITH RECURSIVE team(id, depth) AS (
                SELECT id, 1 FROM members WHERE placement_parent_id = ? AND leg = ?
                UNION ALL
                SELECT m.id, t.depth + 1
                FROM members m
                JOIN team t ON m.placement_parent_id = t.id
                WHERE t.depth < ?
            )
            SELECT COUNT(*) AS n FROM team
            "#,
        )
        .bind(member_id.as_i64())
        .bind(leg.as_str())
        .bind(max_depth as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("n"))
    }

    /// How many members name this member as their sponsor.
    pub async fn direct_referral_count(&self, member_id: MemberId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM members WHERE sponsor_id = ?")
            .bind(member_id.as_i64())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// How many of this member's referrals still wait unplaced.
    pub async fn pending_referral_count(&self, member_id: MemberId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM members \
             WHERE sponsor_id = ? AND placement_parent_id IS NULL",
        )
        .bind(member_id.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    /// The member's referrals still waiting for placement, oldest first.
    pub async fn pending_referrals(&self, member_id: MemberId) -> Result<Vec<Member>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members \
             WHERE sponsor_id = ? AND placement_parent_id IS NULL \
             ORDER BY created_at ASC, id ASC",
            MEMBER_COLUMNS
        ))
        .bind(member_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_member).collect())
    }

    /// Placement subtree rooted at a member, depth-bounded, as flat rows.
    ///
    /// One set-oriented query; the caller assembles the nested view.
    pub async fn subtree(
        &self,
        root: MemberId,
        max_depth: u32,
    ) -> Result<Vec<(Member, u32)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            WITH RECURSIVE tree(id, depth) AS (
                SELECT id, 0 FROM members WHERE id = ?
                UNION ALL
                SELECT m.id, t.depth + 1
                FROM members m
                JOIN tree t ON m.placement_parent_id = t.id
                WHERE t.depth < ?
            )
            SELECT members.*, tree.depth AS tree_depth
            FROM members JOIN tree ON members.id = tree.id
            ORDER BY tree.depth ASC, members.id ASC
            "#,
        )
        .bind(root.as_i64())
        .bind(max_depth as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let depth: i64 = row.get("tree_depth");
                (row_to_member(row), depth as u32)
            })
            .collect())
    }
}
