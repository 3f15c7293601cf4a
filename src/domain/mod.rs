//! Domain types for the binary compensation engine.

pub mod decimal;
pub mod ledger;
pub mod member;
pub mod primitives;
pub mod rank;

pub use decimal::Decimal;
pub use ledger::{LedgerCategory, LedgerEntry};
pub use member::{Member, MemberProfile};
pub use primitives::{Leg, MemberId, MemberNo, TimeMs};
pub use rank::{RankTable, RankThreshold};
