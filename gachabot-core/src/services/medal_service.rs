// gachabot-core/src/services/medal_service.rs
//
// The claim game. Claims arrive as plain "T1"/"T2"/"T3" messages inside a
// bound thread, concurrently with reconcile passes and with each other, so
// the winner is decided by the store's uniqueness constraint — never by a
// check here.

use std::sync::Arc;

use tracing::{info, warn};

use gachabot_common::models::{ClaimOutcome, Medal, MedalTier, MessageBody, ThreadBinding};
use gachabot_common::traits::repository_traits::{MedalRepository, ThreadBindingRepository};
use gachabot_common::traits::Notifier;
use gachabot_common::Error;

pub struct MedalService {
    medals: Arc<dyn MedalRepository>,
    bindings: Arc<dyn ThreadBindingRepository>,
    notifier: Arc<dyn Notifier>,
}

impl MedalService {
    pub fn new(
        medals: Arc<dyn MedalRepository>,
        bindings: Arc<dyn ThreadBindingRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            medals,
            bindings,
            notifier,
        }
    }

    /// One atomic claim attempt.
    pub async fn claim(
        &self,
        thread_id: i64,
        tier: MedalTier,
        user_id: i64,
    ) -> Result<ClaimOutcome, Error> {
        self.medals.try_claim(thread_id, tier, user_id).await
    }

    /// Entry point for inbound chat messages. Returns `None` when the
    /// message is not a claim (wrong content, or a thread we don't track).
    pub async fn handle_claim_message(
        &self,
        thread_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<ClaimOutcome>, Error> {
        let Some(tier) = MedalTier::parse(content) else {
            return Ok(None);
        };
        let Some(binding) = self.bindings.get_by_thread(thread_id).await? else {
            return Ok(None);
        };

        let outcome = self.medals.try_claim(thread_id, tier, user_id).await?;
        match &outcome {
            ClaimOutcome::Claimed => {
                info!("medal {tier} in thread {thread_id} goes to user {user_id}");
                // Marker on the starter message is what reaction resync
                // reads back if claim history is ever lost.
                if let Err(e) = self
                    .notifier
                    .add_reaction(thread_id, binding.starter_message_id, tier.emoji())
                    .await
                {
                    warn!("thread {thread_id}: could not add {tier} marker: {e}");
                }
                let reply =
                    MessageBody::text(format!("{} {tier} goes to <@{user_id}>!", tier.emoji()));
                if let Err(e) = self.notifier.post_message(thread_id, &reply).await {
                    warn!("thread {thread_id}: could not announce claim: {e}");
                }
            }
            ClaimOutcome::AlreadyClaimed { user_id: holder } => {
                let reply =
                    MessageBody::text(format!("{tier} was already claimed by <@{holder}>!"));
                if let Err(e) = self.notifier.post_message(thread_id, &reply).await {
                    warn!("thread {thread_id}: could not answer duplicate claim: {e}");
                }
            }
        }
        Ok(Some(outcome))
    }

    /// Rebuilds lost claim rows from the marker reactions on the starter
    /// message. Recovered medals carry the sentinel user id: the marker
    /// proves a claim happened, not who made it. Returns how many rows were
    /// inserted.
    pub async fn resync_from_reactions(&self, binding: &ThreadBinding) -> Result<u32, Error> {
        let markers = self
            .notifier
            .read_reactions(binding.thread_id, binding.starter_message_id)
            .await?;

        let mut inserted = 0;
        for marker in &markers {
            let Some(tier) = MedalTier::from_emoji(marker) else {
                continue;
            };
            if self.medals.get(binding.thread_id, tier).await?.is_some() {
                continue;
            }
            match self
                .medals
                .try_claim(binding.thread_id, tier, Medal::UNKNOWN_USER)
                .await?
            {
                ClaimOutcome::Claimed => {
                    info!(
                        "thread {}: medal {tier} resynthesized from reaction marker",
                        binding.thread_id
                    );
                    inserted += 1;
                }
                // A real claim won the race between our read and our
                // insert; that row wins.
                ClaimOutcome::AlreadyClaimed { .. } => {}
            }
        }
        Ok(inserted)
    }
}
