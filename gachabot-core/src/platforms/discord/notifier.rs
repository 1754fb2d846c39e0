// gachabot-core/src/platforms/discord/notifier.rs
//
// The twilight-http implementation of the Notifier trait. Every call claims
// a rate-limiter slot for its operation kind before touching the wire, and
// every wire failure is mapped to Error::Actuation so the engine can skip
// the affected banner and keep the pass going.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_http::Client as HttpClient;
use twilight_model::channel::message::{Embed, EmojiReactionType};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::{
    EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource,
};

use gachabot_common::models::{MessageBody, ThreadInfo};
use gachabot_common::traits::Notifier;
use gachabot_common::Error;

use super::rate_limiter::{OpKind, RateLimiter};

/// Discord caps thread names at 100 characters.
const MAX_THREAD_NAME: usize = 100;

pub struct DiscordNotifier {
    http: Arc<HttpClient>,
    guild_id: Id<GuildMarker>,
    /// Category name -> forum channel id.
    channel_ids: HashMap<String, i64>,
    limiter: RateLimiter,
}

impl DiscordNotifier {
    pub fn new(
        http: Arc<HttpClient>,
        guild_id: u64,
        channel_ids: HashMap<String, i64>,
        ops_per_second: f64,
    ) -> Self {
        Self {
            http,
            guild_id: Id::new(guild_id),
            channel_ids,
            limiter: RateLimiter::new(ops_per_second),
        }
    }

    fn channel(&self, category: &str) -> Result<Id<ChannelMarker>, Error> {
        let id = self.channel_ids.get(category).copied().ok_or_else(|| {
            Error::Actuation(format!("no channel configured for category '{category}'"))
        })?;
        Ok(Id::new(id as u64))
    }
}

fn actuation(context: &str, e: impl std::fmt::Debug) -> Error {
    Error::Actuation(format!("{context}: {e:?}"))
}

fn truncate_name(title: &str) -> String {
    if title.chars().count() <= MAX_THREAD_NAME {
        return title.to_string();
    }
    let head: String = title.chars().take(MAX_THREAD_NAME - 3).collect();
    format!("{head}...")
}

fn render_embeds(body: &MessageBody) -> Vec<Embed> {
    let Some(card) = &body.card else {
        return Vec::new();
    };
    let mut eb = EmbedBuilder::new().title(card.title.clone()).color(0xF1C40F);
    if let Some(url) = &card.url {
        eb = eb.url(url.clone());
    }
    for f in &card.fields {
        let fb = EmbedFieldBuilder::new(f.name.clone(), f.value.clone());
        eb = eb.field(if f.inline { fb.inline() } else { fb });
    }
    if let Some(img) = &card.image_url {
        match ImageSource::url(img.clone()) {
            Ok(src) => eb = eb.image(src),
            Err(e) => warn!("dropping invalid embed image url: {e}"),
        }
    }
    if let Some(footer) = &card.footer {
        eb = eb.footer(EmbedFooterBuilder::new(footer.clone()));
    }
    vec![eb.build()]
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn create_thread(
        &self,
        category: &str,
        title: &str,
        body: &MessageBody,
    ) -> Result<(i64, i64), Error> {
        let channel = self.channel(category)?;
        self.limiter.acquire(OpKind::CreateThread).await;

        let name = truncate_name(title);
        let embeds = render_embeds(body);
        let mut req = self.http.create_forum_thread(channel, &name).message();
        if let Some(content) = &body.content {
            req = req.content(content);
        }
        if !embeds.is_empty() {
            req = req.embeds(&embeds);
        }
        let thread = req
            .await
            .map_err(|e| actuation("create_forum_thread", e))?
            .model()
            .await
            .map_err(|e| actuation("create_forum_thread response", e))?;

        Ok((
            thread.channel.id.get() as i64,
            thread.message.id.get() as i64,
        ))
    }

    async fn rename_thread(&self, thread_id: i64, new_title: &str) -> Result<(), Error> {
        self.limiter.acquire(OpKind::RenameThread).await;
        let name = truncate_name(new_title);
        self.http
            .update_thread(Id::new(thread_id as u64))
            .name(&name)
            .await
            .map_err(|e| actuation("update_thread name", e))?;
        Ok(())
    }

    async fn archive_thread(&self, thread_id: i64, closing_message: &str) -> Result<(), Error> {
        // Closing message first; an archived thread refuses posts.
        self.post_message(thread_id, &MessageBody::text(closing_message))
            .await?;

        self.limiter.acquire(OpKind::ArchiveThread).await;
        self.http
            .update_thread(Id::new(thread_id as u64))
            .locked(true)
            .archived(true)
            .await
            .map_err(|e| actuation("update_thread archive", e))?;
        Ok(())
    }

    async fn post_message(&self, thread_id: i64, body: &MessageBody) -> Result<i64, Error> {
        self.limiter.acquire(OpKind::PostMessage).await;
        let channel: Id<ChannelMarker> = Id::new(thread_id as u64);
        let embeds = render_embeds(body);
        let mut req = self.http.create_message(channel);
        if let Some(content) = &body.content {
            req = req.content(content);
        }
        if !embeds.is_empty() {
            req = req.embeds(&embeds);
        }
        let message = req
            .await
            .map_err(|e| actuation("create_message", e))?
            .model()
            .await
            .map_err(|e| actuation("create_message response", e))?;
        Ok(message.id.get() as i64)
    }

    async fn edit_message(
        &self,
        thread_id: i64,
        message_id: i64,
        body: &MessageBody,
    ) -> Result<(), Error> {
        self.limiter.acquire(OpKind::EditMessage).await;
        let channel: Id<ChannelMarker> = Id::new(thread_id as u64);
        let message: Id<MessageMarker> = Id::new(message_id as u64);
        let embeds = render_embeds(body);
        let mut req = self.http.update_message(channel, message);
        if body.content.is_some() {
            req = req.content(body.content.as_deref());
        }
        if !embeds.is_empty() {
            req = req.embeds(Some(&embeds));
        }
        req.await.map_err(|e| actuation("update_message", e))?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        thread_id: i64,
        message_id: i64,
        marker: &str,
    ) -> Result<(), Error> {
        self.limiter.acquire(OpKind::AddReaction).await;
        self.http
            .create_reaction(
                Id::new(thread_id as u64),
                Id::new(message_id as u64),
                &RequestReactionType::Unicode { name: marker },
            )
            .await
            .map_err(|e| actuation("create_reaction", e))?;
        Ok(())
    }

    async fn read_reactions(
        &self,
        thread_id: i64,
        message_id: i64,
    ) -> Result<HashSet<String>, Error> {
        self.limiter.acquire(OpKind::ReadReactions).await;
        let message = self
            .http
            .message(Id::new(thread_id as u64), Id::new(message_id as u64))
            .await
            .map_err(|e| actuation("message", e))?
            .model()
            .await
            .map_err(|e| actuation("message response", e))?;

        let markers = message
            .reactions
            .iter()
            .filter_map(|r| match &r.emoji {
                EmojiReactionType::Unicode { name } => Some(name.clone()),
                EmojiReactionType::Custom { .. } => None,
            })
            .collect();
        Ok(markers)
    }

    async fn list_threads(
        &self,
        channel_id: i64,
        include_archived: bool,
    ) -> Result<Vec<ThreadInfo>, Error> {
        let parent: Id<ChannelMarker> = Id::new(channel_id as u64);
        let mut out = Vec::new();

        // Active threads are listed guild-wide and filtered to the channel.
        self.limiter.acquire(OpKind::ListThreads).await;
        let active = self
            .http
            .active_threads(self.guild_id)
            .await
            .map_err(|e| actuation("active_threads", e))?
            .model()
            .await
            .map_err(|e| actuation("active_threads response", e))?;
        for ch in active.threads {
            if ch.parent_id == Some(parent) {
                out.push(ThreadInfo {
                    thread_id: ch.id.get() as i64,
                    name: ch.name.unwrap_or_default(),
                    parent_id: channel_id,
                });
            }
        }

        if include_archived {
            self.limiter.acquire(OpKind::ListThreads).await;
            let archived = self
                .http
                .public_archived_threads(parent)
                .await
                .map_err(|e| actuation("public_archived_threads", e))?
                .model()
                .await
                .map_err(|e| actuation("public_archived_threads response", e))?;
            for ch in archived.threads {
                out.push(ThreadInfo {
                    thread_id: ch.id.get() as i64,
                    name: ch.name.unwrap_or_default(),
                    parent_id: channel_id,
                });
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_titles_are_truncated_on_char_boundaries() {
        let long = "ID: 1 / ".to_string() + &"あ".repeat(120);
        let name = truncate_name(&long);
        assert_eq!(name.chars().count(), MAX_THREAD_NAME);
        assert!(name.ends_with("..."));
        assert!(truncate_name("short").eq("short"));
    }
}
