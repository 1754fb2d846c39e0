// gachabot-core/src/services/reconcile.rs
//
// One reconcile pass converges the store and the chat platform with one
// storefront snapshot. The pass is built to survive partial failure: a
// failed Discord call skips that banner only, and only a store failure
// aborts the pass (the scrape job counts that as a failed attempt).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use gachabot_common::models::{Banner, BannerSnapshot, MedalTier, MessageBody, PackHistory, ThreadBinding};
use gachabot_common::traits::repository_traits::{
    BannerRepository, MedalRepository, PackHistoryRepository, ThreadBindingRepository,
};
use gachabot_common::traits::Notifier;
use gachabot_common::Error;

use super::admin::AdminNotifier;
use super::cards;
use crate::probability;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    SoldOut,
    ExpiredByAbsence,
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Snapshots smaller than this switch the pass to degraded mode:
    /// absence tracking is suspended so a broken scrape cannot mass-retire
    /// healthy banners.
    pub min_viable_snapshot: usize,
    /// Consecutive absences before a banner is retired.
    pub not_found_threshold: i32,
    pub mention_on_new_thread: bool,
    pub mention_on_stock_update: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            min_viable_snapshot: 60,
            not_found_threshold: 20,
            mention_on_new_thread: true,
            mention_on_stock_update: true,
        }
    }
}

/// Outcome counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub new: u32,
    pub updated: u32,
    pub retired_soldout: u32,
    pub retired_expired: u32,
    pub skipped_inactive: u32,
    pub skipped_empty: u32,
    pub degraded: bool,
}

pub struct ReconcileService {
    banners: Arc<dyn BannerRepository>,
    bindings: Arc<dyn ThreadBindingRepository>,
    medals: Arc<dyn MedalRepository>,
    history: Arc<dyn PackHistoryRepository>,
    notifier: Arc<dyn Notifier>,
    admin: Arc<AdminNotifier>,
    channel_ids: HashMap<String, i64>,
    settings: ReconcileSettings,
}

/// Store failures abort the pass; everything else is isolated per banner.
fn is_fatal(e: &Error) -> bool {
    matches!(e, Error::Database(_) | Error::Migration(_))
}

impl ReconcileService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        banners: Arc<dyn BannerRepository>,
        bindings: Arc<dyn ThreadBindingRepository>,
        medals: Arc<dyn MedalRepository>,
        history: Arc<dyn PackHistoryRepository>,
        notifier: Arc<dyn Notifier>,
        admin: Arc<AdminNotifier>,
        channel_ids: HashMap<String, i64>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            banners,
            bindings,
            medals,
            history,
            notifier,
            admin,
            channel_ids,
            settings,
        }
    }

    pub async fn reconcile(&self, snapshot: &[BannerSnapshot]) -> Result<ReconcileReport, Error> {
        let mut report = ReconcileReport {
            degraded: snapshot.len() < self.settings.min_viable_snapshot,
            ..ReconcileReport::default()
        };
        if report.degraded {
            warn!(
                "snapshot has {} records (minimum {}); absence tracking suspended for this pass",
                snapshot.len(),
                self.settings.min_viable_snapshot
            );
            self.admin
                .low_banner_count(snapshot.len(), self.settings.min_viable_snapshot)
                .await;
        }

        // 1) Per-record pass.
        for s in snapshot {
            if let Err(e) = self.reconcile_one(s, &mut report).await {
                if is_fatal(&e) {
                    return Err(e);
                }
                warn!("pack {}: record skipped: {e}", s.pack_id);
            }
        }

        // 2) Absence sweep. Works off the id-set of the *full* snapshot,
        //    collected up front, so record order cannot affect the result.
        if !report.degraded {
            let present: HashSet<i64> = snapshot.iter().map(|s| s.pack_id).collect();
            for banner in self.banners.list_active().await? {
                if present.contains(&banner.pack_id) {
                    self.banners.reset_not_found(banner.pack_id).await?;
                    continue;
                }
                let misses = self.banners.increment_not_found(banner.pack_id).await?;
                if misses >= self.settings.not_found_threshold {
                    match self.retire(&banner, RetireReason::ExpiredByAbsence).await {
                        Ok(()) => report.retired_expired += 1,
                        Err(e) if is_fatal(&e) => return Err(e),
                        Err(e) => warn!(
                            "pack {}: retirement failed, will retry next pass: {e}",
                            banner.pack_id
                        ),
                    }
                }
            }
        }

        Ok(report)
    }

    async fn reconcile_one(
        &self,
        s: &BannerSnapshot,
        report: &mut ReconcileReport,
    ) -> Result<(), Error> {
        match self.banners.get(s.pack_id).await? {
            None => {
                if s.current_stock <= 0 {
                    // Never create a banner that is already dead.
                    report.skipped_empty += 1;
                    return Ok(());
                }
                self.create_banner(s).await?;
                report.new += 1;
            }
            Some(existing) if !existing.is_active => {
                // Terminal state: a retired pack_id stays retired even if
                // the storefront re-lists it.
                report.skipped_inactive += 1;
            }
            Some(existing) if s.current_stock <= 0 => {
                self.retire(&existing, RetireReason::SoldOut).await?;
                report.retired_soldout += 1;
            }
            Some(existing) => {
                self.update_banner(&existing, s).await?;
                report.updated += 1;
            }
        }
        Ok(())
    }

    async fn create_banner(&self, s: &BannerSnapshot) -> Result<(), Error> {
        let Some(channel_id) = self.channel_ids.get(&s.category).copied() else {
            return Err(Error::Actuation(format!(
                "no channel configured for category '{}'",
                s.category
            )));
        };

        let banner = Banner::from_snapshot(s);
        let title = banner.thread_title();
        let body = cards::new_thread_body(&banner, self.settings.mention_on_new_thread);

        // Thread before store writes: if the process dies in between,
        // startup recovery re-associates the orphaned thread by its
        // structured title.
        let (thread_id, starter_message_id) = self
            .notifier
            .create_thread(&s.category, &title, &body)
            .await?;

        self.banners.upsert(&banner).await?;

        let binding = ThreadBinding::new(banner.pack_id, thread_id, channel_id, starter_message_id);
        match self.bindings.create(&binding).await {
            Ok(()) => {}
            Err(Error::Duplicate(kind)) => {
                warn!(
                    "pack {}: binding already present ({kind}); keeping the existing one",
                    banner.pack_id
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        self.upsert_probability_message(&banner, &binding).await?;
        info!(
            "pack {}: new banner in '{}', thread {}",
            banner.pack_id, s.category, thread_id
        );
        Ok(())
    }

    async fn update_banner(&self, existing: &Banner, s: &BannerSnapshot) -> Result<(), Error> {
        let binding = self.bindings.get_by_banner(existing.pack_id).await?;
        let mut banner = existing.clone();

        // 1) Daily-limit change, including to/from unlimited: persist and
        //    rename the thread so the title's x<limit> segment stays true.
        if existing.daily_limit != s.daily_limit {
            self.banners
                .update_daily_limit(existing.pack_id, s.daily_limit)
                .await?;
            banner.daily_limit = s.daily_limit;
            if let Some(b) = &binding {
                self.notifier
                    .rename_thread(b.thread_id, &banner.thread_title())
                    .await?;
            }
        }

        // 2) Stock change: persist always. Ledger row and thread comment
        //    only when the previous value was known; a recovery-origin NULL
        //    must never produce a synthetic change announcement.
        if existing.current_stock != Some(s.current_stock) {
            self.banners
                .update_stock(existing.pack_id, s.current_stock)
                .await?;
            if let Some(old) = existing.current_stock {
                self.history
                    .append(&PackHistory::new(existing.pack_id, old, s.current_stock))
                    .await?;
                if let Some(b) = &binding {
                    let comment = cards::stock_change_comment(
                        old,
                        s.current_stock,
                        self.settings.mention_on_stock_update,
                    );
                    self.notifier.post_message(b.thread_id, &comment).await?;
                }
            }
            banner.current_stock = Some(s.current_stock);
        }

        if let Some(b) = &binding {
            // 3) Card refresh every pass; cheap and idempotent.
            self.notifier
                .edit_message(b.thread_id, b.starter_message_id, &cards::card_refresh_body(&banner))
                .await?;

            // 4) Fresh odds.
            self.upsert_probability_message(&banner, b).await?;
        } else {
            warn!(
                "pack {}: no thread binding; stock persisted but nothing to refresh",
                existing.pack_id
            );
        }
        Ok(())
    }

    /// Posts the hit-chance line once per thread, then edits it in place.
    /// Banners with unknown stock (recovery origin) get no odds until a
    /// snapshot supplies a concrete value.
    async fn upsert_probability_message(
        &self,
        banner: &Banner,
        binding: &ThreadBinding,
    ) -> Result<(), Error> {
        let Some(stock) = banner.current_stock else {
            return Ok(());
        };
        let claimed = self.medals.count_for_thread(binding.thread_id).await?;
        let hits_remaining = MedalTier::ALL.len() as i32 - claimed as i32;
        let chance = probability::hit_chance(stock, hits_remaining, banner.daily_limit);
        let body = MessageBody::text(cards::probability_line(chance, hits_remaining));

        match binding.probability_message_id {
            Some(message_id) => {
                self.notifier
                    .edit_message(binding.thread_id, message_id, &body)
                    .await?;
            }
            None => {
                let message_id = self.notifier.post_message(binding.thread_id, &body).await?;
                self.bindings
                    .set_probability_message(banner.pack_id, message_id)
                    .await?;
            }
        }
        Ok(())
    }

    /// Shared retirement path: close out the thread, then flip the banner
    /// and binding to their terminal states. If the actuation half fails
    /// the store is left untouched and the retirement retries next pass.
    async fn retire(&self, banner: &Banner, reason: RetireReason) -> Result<(), Error> {
        if let Some(binding) = self.bindings.get_by_banner(banner.pack_id).await? {
            if !binding.is_expired {
                self.notifier
                    .rename_thread(binding.thread_id, &banner.expired_thread_title())
                    .await?;
                self.notifier
                    .archive_thread(binding.thread_id, &cards::closing_message(reason))
                    .await?;
            }
        }
        self.banners.mark_inactive(banner.pack_id).await?;
        self.bindings.mark_expired(banner.pack_id).await?;
        info!("pack {}: retired ({:?})", banner.pack_id, reason);
        Ok(())
    }
}
