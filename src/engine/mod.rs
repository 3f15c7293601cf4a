//! Compensation engine: placement, point propagation, matching,
//! generational overrides, and rank evaluation.
//!
//! Every operation takes the plan snapshot the engine was built with;
//! nothing reads ambient configuration.

pub mod generation;
pub mod matching;
pub mod placement;
pub mod propagation;
pub mod rank;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::CompPlan;
use crate::db::repo::is_busy;
use crate::db::Repository;
use crate::domain::{Leg, MemberId};

/// Bounded retries when a concurrent writer holds the database.
const BUSY_RETRIES: u32 = 3;

/// Run a repository write, retrying a bounded number of times on
/// SQLITE_BUSY before the contention is surfaced as fatal.
///
/// The connection `busy_timeout` does not cover WAL snapshot upgrades: a
/// deferred transaction that read under one snapshot and then tries to
/// write after another writer committed fails immediately with code 517.
/// Re-running the operation re-begins the transaction and re-reads under
/// a fresh snapshot, so the retry is safe.
pub(crate) async fn retry_on_busy<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempts = 0u32;
    loop {
        match op().await {
            Err(e) if is_busy(&e) && attempts < BUSY_RETRIES => {
                attempts += 1;
                debug!(attempts, "Retrying write after busy");
                tokio::time::sleep(Duration::from_millis(25 * u64::from(attempts))).await;
            }
            other => return other,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Contact already registered: {0}")]
    DuplicateContact(String),
    #[error("Member {0} is already placed in the tree")]
    AlreadyPlaced(MemberId),
    #[error("Slot ({0}, {1}) is already occupied")]
    SlotOccupied(MemberId, Leg),
    #[error("Anchor member {0} not found")]
    AnchorNotFound(MemberId),
    #[error("Member {0} not found")]
    MemberNotFound(MemberId),
    #[error("Sponsor member {0} not found")]
    SponsorNotFound(MemberId),
    #[error("Volume units must be positive, got {0}")]
    InvalidVolume(i64),
    #[error("Data integrity fault: {0}")]
    DataIntegrity(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// The compensation engine over the member directory.
pub struct CompEngine {
    repo: Arc<Repository>,
    plan: CompPlan,
}

impl CompEngine {
    pub fn new(repo: Arc<Repository>, plan: CompPlan) -> Self {
        Self { repo, plan }
    }

    pub fn plan(&self) -> &CompPlan {
        &self.plan
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }
}
