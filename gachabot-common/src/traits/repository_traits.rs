// File: gachabot-common/src/traits/repository_traits.rs

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{Banner, ClaimOutcome, Medal, MedalTier, PackHistory, ThreadBinding};

#[async_trait]
pub trait BannerRepository: Send + Sync {
    async fn get(&self, pack_id: i64) -> Result<Option<Banner>, Error>;

    /// Insert-or-replace keyed on pack_id. Intentionally a full-row replace:
    /// every reconcile pass supplies a complete record, so the write
    /// enumerates every field rather than diffing.
    async fn upsert(&self, banner: &Banner) -> Result<(), Error>;

    async fn update_stock(&self, pack_id: i64, new_stock: i32) -> Result<(), Error>;
    async fn update_daily_limit(&self, pack_id: i64, daily_limit: Option<i32>) -> Result<(), Error>;

    /// Terminal: an inactive banner is never reactivated.
    async fn mark_inactive(&self, pack_id: i64) -> Result<(), Error>;

    async fn list_active(&self) -> Result<Vec<Banner>, Error>;
    async fn reset_not_found(&self, pack_id: i64) -> Result<(), Error>;

    /// Increments the consecutive-absence counter and returns the new value.
    async fn increment_not_found(&self, pack_id: i64) -> Result<i32, Error>;

    async fn count_active(&self) -> Result<i64, Error>;
}

#[async_trait]
pub trait ThreadBindingRepository: Send + Sync {
    /// Fails with `Error::Duplicate(DuplicateKind::ThreadBinding)` when the
    /// thread_id or banner_id is already bound.
    async fn create(&self, binding: &ThreadBinding) -> Result<(), Error>;

    async fn get_by_banner(&self, banner_id: i64) -> Result<Option<ThreadBinding>, Error>;
    async fn get_by_thread(&self, thread_id: i64) -> Result<Option<ThreadBinding>, Error>;
    async fn set_probability_message(&self, banner_id: i64, message_id: i64) -> Result<(), Error>;
    async fn mark_expired(&self, banner_id: i64) -> Result<(), Error>;
    async fn count_unexpired(&self) -> Result<i64, Error>;
}

#[async_trait]
pub trait MedalRepository: Send + Sync {
    /// One atomic insert against the (thread_id, tier) uniqueness
    /// constraint. Claim races are decided here, by the store, never by a
    /// check-then-insert sequence in the caller.
    async fn try_claim(
        &self,
        thread_id: i64,
        tier: MedalTier,
        user_id: i64,
    ) -> Result<ClaimOutcome, Error>;

    async fn get(&self, thread_id: i64, tier: MedalTier) -> Result<Option<Medal>, Error>;
    async fn count_for_thread(&self, thread_id: i64) -> Result<i64, Error>;
    async fn count(&self) -> Result<i64, Error>;
}

#[async_trait]
pub trait PackHistoryRepository: Send + Sync {
    async fn append(&self, entry: &PackHistory) -> Result<(), Error>;
    async fn list_for_banner(&self, banner_id: i64) -> Result<Vec<PackHistory>, Error>;
}
