// File: gachabot-common/src/traits/collaborators.rs
//
// The two external collaborators the engine talks to: the chat-platform
// actuation surface and the storefront snapshot source. Both are
// constructor-injected wherever they are used; there is no process-wide
// client reference.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::banner::BannerSnapshot;
use crate::models::message::MessageBody;
use crate::models::thread::ThreadInfo;

/// Chat-platform actuation surface. Implementations are expected to pass
/// every call through a per-operation-kind rate limiter before it hits the
/// wire.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Opens a discussion thread in the forum channel configured for
    /// `category`. Returns (thread_id, starter_message_id).
    async fn create_thread(
        &self,
        category: &str,
        title: &str,
        body: &MessageBody,
    ) -> Result<(i64, i64), Error>;

    async fn rename_thread(&self, thread_id: i64, new_title: &str) -> Result<(), Error>;

    /// Posts the closing message, then locks and archives the thread.
    async fn archive_thread(&self, thread_id: i64, closing_message: &str) -> Result<(), Error>;

    /// Returns the new message id.
    async fn post_message(&self, thread_id: i64, body: &MessageBody) -> Result<i64, Error>;

    async fn edit_message(
        &self,
        thread_id: i64,
        message_id: i64,
        body: &MessageBody,
    ) -> Result<(), Error>;

    /// Adds a reaction marker to one message. Markers on the starter
    /// message are what `read_reactions` recovers claims from.
    async fn add_reaction(&self, thread_id: i64, message_id: i64, marker: &str)
        -> Result<(), Error>;

    /// The set of distinct reaction markers on one message.
    async fn read_reactions(&self, thread_id: i64, message_id: i64)
        -> Result<HashSet<String>, Error>;

    async fn list_threads(
        &self,
        channel_id: i64,
        include_archived: bool,
    ) -> Result<Vec<ThreadInfo>, Error>;
}

/// The storefront poll. One `fetch` returns the complete set of currently
/// observed banners; it may fail, and it may return an implausibly small
/// list (the engine handles that via degraded mode).
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<BannerSnapshot>, Error>;

    /// Releases any session resources held by the current attempt. The
    /// scrape job calls this on every exit path, including timeout
    /// cancellation, so it must be safe to call repeatedly.
    async fn close(&self);
}
