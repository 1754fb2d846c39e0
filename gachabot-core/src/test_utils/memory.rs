// gachabot-core/src/test_utils/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use gachabot_common::models::{Banner, ClaimOutcome, Medal, MedalTier, PackHistory, ThreadBinding};
use gachabot_common::traits::repository_traits::{
    BannerRepository, MedalRepository, PackHistoryRepository, ThreadBindingRepository,
};
use gachabot_common::{DuplicateKind, Error};

#[derive(Default)]
pub struct MemoryBannerRepository {
    rows: Mutex<HashMap<i64, Banner>>,
}

impl MemoryBannerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row directly, bypassing the trait. For test setup only.
    pub fn insert_raw(&self, banner: Banner) {
        self.rows.lock().unwrap().insert(banner.pack_id, banner);
    }
}

#[async_trait]
impl BannerRepository for MemoryBannerRepository {
    async fn get(&self, pack_id: i64) -> Result<Option<Banner>, Error> {
        Ok(self.rows.lock().unwrap().get(&pack_id).cloned())
    }

    async fn upsert(&self, banner: &Banner) -> Result<(), Error> {
        self.rows
            .lock()
            .unwrap()
            .insert(banner.pack_id, banner.clone());
        Ok(())
    }

    async fn update_stock(&self, pack_id: i64, new_stock: i32) -> Result<(), Error> {
        if let Some(b) = self.rows.lock().unwrap().get_mut(&pack_id) {
            b.current_stock = Some(new_stock);
            b.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_daily_limit(&self, pack_id: i64, daily_limit: Option<i32>) -> Result<(), Error> {
        if let Some(b) = self.rows.lock().unwrap().get_mut(&pack_id) {
            b.daily_limit = daily_limit;
            b.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_inactive(&self, pack_id: i64) -> Result<(), Error> {
        if let Some(b) = self.rows.lock().unwrap().get_mut(&pack_id) {
            b.is_active = false;
            b.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Banner>, Error> {
        let mut out: Vec<Banner> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.is_active)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.pack_id);
        Ok(out)
    }

    async fn reset_not_found(&self, pack_id: i64) -> Result<(), Error> {
        if let Some(b) = self.rows.lock().unwrap().get_mut(&pack_id) {
            b.not_found_count = 0;
        }
        Ok(())
    }

    async fn increment_not_found(&self, pack_id: i64) -> Result<i32, Error> {
        let mut rows = self.rows.lock().unwrap();
        let b = rows
            .get_mut(&pack_id)
            .ok_or_else(|| Error::NotFound(format!("banner {pack_id}")))?;
        b.not_found_count += 1;
        Ok(b.not_found_count)
    }

    async fn count_active(&self) -> Result<i64, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.is_active)
            .count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryThreadBindingRepository {
    rows: Mutex<Vec<ThreadBinding>>,
}

impl MemoryThreadBindingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&self, binding: ThreadBinding) {
        self.rows.lock().unwrap().push(binding);
    }

    pub fn all(&self) -> Vec<ThreadBinding> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadBindingRepository for MemoryThreadBindingRepository {
    async fn create(&self, binding: &ThreadBinding) -> Result<(), Error> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.thread_id == binding.thread_id || r.banner_id == binding.banner_id)
        {
            return Err(Error::Duplicate(DuplicateKind::ThreadBinding));
        }
        rows.push(binding.clone());
        Ok(())
    }

    async fn get_by_banner(&self, banner_id: i64) -> Result<Option<ThreadBinding>, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.banner_id == banner_id)
            .cloned())
    }

    async fn get_by_thread(&self, thread_id: i64) -> Result<Option<ThreadBinding>, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.thread_id == thread_id)
            .cloned())
    }

    async fn set_probability_message(&self, banner_id: i64, message_id: i64) -> Result<(), Error> {
        if let Some(r) = self
            .rows
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.banner_id == banner_id)
        {
            r.probability_message_id = Some(message_id);
        }
        Ok(())
    }

    async fn mark_expired(&self, banner_id: i64) -> Result<(), Error> {
        if let Some(r) = self
            .rows
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.banner_id == banner_id)
        {
            r.is_expired = true;
        }
        Ok(())
    }

    async fn count_unexpired(&self) -> Result<i64, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_expired)
            .count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryMedalRepository {
    rows: Mutex<Vec<Medal>>,
}

impl MemoryMedalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Medal> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MedalRepository for MemoryMedalRepository {
    async fn try_claim(
        &self,
        thread_id: i64,
        tier: MedalTier,
        user_id: i64,
    ) -> Result<ClaimOutcome, Error> {
        // One lock for check + insert mirrors the database constraint:
        // exactly one concurrent claimant wins.
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows
            .iter()
            .find(|m| m.thread_id == thread_id && m.tier == tier)
        {
            return Ok(ClaimOutcome::AlreadyClaimed {
                user_id: existing.user_id,
            });
        }
        rows.push(Medal::new(thread_id, tier, user_id));
        Ok(ClaimOutcome::Claimed)
    }

    async fn get(&self, thread_id: i64, tier: MedalTier) -> Result<Option<Medal>, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.thread_id == thread_id && m.tier == tier)
            .cloned())
    }

    async fn count_for_thread(&self, thread_id: i64) -> Result<i64, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .count() as i64)
    }

    async fn count(&self) -> Result<i64, Error> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

#[derive(Default)]
pub struct MemoryPackHistoryRepository {
    rows: Mutex<Vec<PackHistory>>,
}

impl MemoryPackHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<PackHistory> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackHistoryRepository for MemoryPackHistoryRepository {
    async fn append(&self, entry: &PackHistory) -> Result<(), Error> {
        self.rows.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_for_banner(&self, banner_id: i64) -> Result<Vec<PackHistory>, Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.banner_id == banner_id)
            .cloned()
            .collect())
    }
}
