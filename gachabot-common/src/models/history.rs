// File: gachabot-common/src/models/history.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only stock-change ledger. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PackHistory {
    pub id: Uuid,
    pub banner_id: i64,
    pub old_count: i32,
    pub new_count: i32,
    pub changed_at: DateTime<Utc>,
}

impl PackHistory {
    pub fn new(banner_id: i64, old_count: i32, new_count: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            banner_id,
            old_count,
            new_count,
            changed_at: Utc::now(),
        }
    }
}
