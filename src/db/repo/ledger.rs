//! Append-only ledger operations for the repository.

use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use crate::domain::{Decimal, LedgerCategory, LedgerEntry, MemberId, TimeMs};

use super::Repository;

impl Repository {
    /// A member's statement: every ledger entry, newest first.
    pub async fn list_ledger(&self, member_id: MemberId) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, member_id, amount, category, note, created_at
            FROM ledger_entries
            WHERE member_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(member_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .filter_map(|row| {
                let id: i64 = row.get("id");
                let amount_str: String = row.get("amount");
                let category_str: String = row.get("category");

                let amount = Decimal::from_str(&amount_str).unwrap_or_else(|e| {
                    warn!(
                        entry_id = id,
                        amount = %amount_str,
                        error = %e,
                        "Failed to parse ledger amount decimal, using zero"
                    );
                    Decimal::zero()
                });

                let category = match LedgerCategory::from_str(&category_str) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(entry_id = id, error = %e, "Skipping ledger entry with unknown category");
                        return None;
                    }
                };

                Some(LedgerEntry {
                    id,
                    member_id: MemberId::new(row.get("member_id")),
                    amount,
                    category,
                    note: row.get("note"),
                    created_at: TimeMs::new(row.get("created_at")),
                })
            })
            .collect();

        Ok(entries)
    }
}
