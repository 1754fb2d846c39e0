// File: gachabot-common/src/models/thread.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Binds one banner to its Discord forum thread. One binding per banner and
/// per thread_id; both columns carry unique indexes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThreadBinding {
    pub id: Uuid,
    /// FK to banners.pack_id. One-directional; reverse lookup goes through
    /// the unique index, never through an in-memory back-pointer.
    pub banner_id: i64,
    pub thread_id: i64,
    pub channel_id: i64,
    pub starter_message_id: i64,
    /// Message carrying the hit-chance line, once one has been posted.
    pub probability_message_id: Option<i64>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
}

impl ThreadBinding {
    pub fn new(banner_id: i64, thread_id: i64, channel_id: i64, starter_message_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            banner_id,
            thread_id,
            channel_id,
            starter_message_id,
            probability_message_id: None,
            is_expired: false,
            created_at: Utc::now(),
        }
    }
}

/// One row of a thread listing as returned by the chat platform.
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub thread_id: i64,
    pub name: String,
    pub parent_id: i64,
}
