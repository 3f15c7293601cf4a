//! Repository layer for database operations.
//!
//! All SQL lives behind the `Repository` struct. Methods are organized
//! across submodules by domain:
//! - `members.rs` - member directory, placement, and volume operations
//! - `ledger.rs` - append-only ledger operations

mod ledger;
mod members;

use crate::domain::{Decimal, Leg, Member, MemberId, MemberNo, TimeMs};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Outcome of a placement attempt, resolved inside one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    MemberNotFound,
    AlreadyPlaced,
    AnchorNotFound,
    SlotOccupied,
}

/// Result of a matching settlement round at one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingPayout {
    pub matched_units: i64,
    pub earned: Decimal,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

/// Map a `members` row into the domain type.
///
/// A malformed cash balance is logged and read as zero rather than failing
/// the whole query, matching how other stored decimals are handled.
pub(crate) fn row_to_member(row: &SqliteRow) -> Member {
    let id: i64 = row.get("id");
    let cash_str: String = row.get("cash_balance");
    let cash_balance = Decimal::from_str(&cash_str).unwrap_or_else(|e| {
        warn!(
            member_id = id,
            cash_balance = %cash_str,
            error = %e,
            "Failed to parse cash balance decimal, using zero"
        );
        Decimal::zero()
    });

    let leg: Option<String> = row.get("leg");
    let leg = leg.and_then(|s| Leg::from_str(&s).ok());

    Member {
        id: MemberId::new(id),
        member_no: MemberNo::new(row.get("member_no")),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        national_id: row.get("national_id"),
        sponsor_id: row.get::<Option<i64>, _>("sponsor_id").map(MemberId::new),
        placement_parent_id: row
            .get::<Option<i64>, _>("placement_parent_id")
            .map(MemberId::new),
        leg,
        leg_volume_left: row.get("leg_volume_left"),
        leg_volume_right: row.get("leg_volume_right"),
        lifetime_volume_left: row.get("lifetime_volume_left"),
        lifetime_volume_right: row.get("lifetime_volume_right"),
        cash_balance,
        rank: row.get("rank"),
        created_at: TimeMs::new(row.get("created_at")),
        placed_at: row.get::<Option<i64>, _>("placed_at").map(TimeMs::new),
    }
}

/// True when the error is a SQLite UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| code == "2067" || code == "1555")
            .unwrap_or(false),
        _ => false,
    }
}

/// True when the error is SQLITE_BUSY (writer contention).
pub(crate) fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| code == "5" || code == "517")
            .unwrap_or(false),
        _ => false,
    }
}
