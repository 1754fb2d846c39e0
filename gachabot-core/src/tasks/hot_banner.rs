// gachabot-core/src/tasks/hot_banner.rs
//
// Maintains the "hot banners" board: one message listing the top banners by
// hit chance, refreshed on an interval. Banners with unknown stock
// (recovery origin) carry no odds and never rank.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use gachabot_common::models::MedalTier;
use gachabot_common::traits::repository_traits::{
    BannerRepository, MedalRepository, ThreadBindingRepository,
};
use gachabot_common::traits::Notifier;
use gachabot_common::Error;

use crate::probability::{self, RankEntry};
use crate::services::cards;

pub struct HotBannerBoard {
    banners: Arc<dyn BannerRepository>,
    bindings: Arc<dyn ThreadBindingRepository>,
    medals: Arc<dyn MedalRepository>,
    notifier: Arc<dyn Notifier>,
    channel_id: i64,
    exclude_category: String,
    /// The board message, once posted; edited in place afterwards.
    board_message_id: tokio::sync::Mutex<Option<i64>>,
}

impl HotBannerBoard {
    pub fn new(
        banners: Arc<dyn BannerRepository>,
        bindings: Arc<dyn ThreadBindingRepository>,
        medals: Arc<dyn MedalRepository>,
        notifier: Arc<dyn Notifier>,
        channel_id: i64,
        exclude_category: String,
    ) -> Self {
        Self {
            banners,
            bindings,
            medals,
            notifier,
            channel_id,
            exclude_category,
            board_message_id: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn refresh(&self) -> Result<(), Error> {
        let mut entries = Vec::new();
        for b in self.banners.list_active().await? {
            let Some(stock) = b.current_stock else {
                continue;
            };
            let Some(binding) = self.bindings.get_by_banner(b.pack_id).await? else {
                continue;
            };
            let claimed = self.medals.count_for_thread(binding.thread_id).await?;
            entries.push(RankEntry {
                pack_id: b.pack_id,
                category: b.category.clone(),
                title: b.title.clone(),
                stock,
                hits_remaining: MedalTier::ALL.len() as i32 - claimed as i32,
                daily_limit: b.daily_limit,
            });
        }

        let ranked = probability::rank_banners(&entries, &self.exclude_category);
        let body = cards::ranking_message(&ranked);

        let mut board = self.board_message_id.lock().await;
        match *board {
            Some(message_id) => {
                self.notifier
                    .edit_message(self.channel_id, message_id, &body)
                    .await?;
            }
            None => {
                *board = Some(self.notifier.post_message(self.channel_id, &body).await?);
            }
        }
        Ok(())
    }
}

pub fn spawn_hot_banner_task(board: Arc<HotBannerBoard>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = board.refresh().await {
                warn!("hot banner refresh failed: {e}");
            }
        }
    })
}
