pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::{CompPlan, Config};
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, LedgerCategory, LedgerEntry, Leg, Member, MemberId, MemberNo, MemberProfile,
    RankTable, RankThreshold, TimeMs,
};
pub use engine::{CompEngine, EngineError};
pub use error::AppError;
