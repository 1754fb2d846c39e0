// File: gachabot-common/src/models/banner.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One poll's view of a single storefront listing, as produced by the
/// snapshot source. Everything except the identity and category is optional
/// because the storefront omits fields freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerSnapshot {
    pub pack_id: i64,
    pub category: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub best_hit: Option<String>,
    #[serde(default)]
    pub price: Option<i32>,
    /// Remaining purchasable packs. An unreadable counter is normalized to
    /// 0, so this is never "unknown" on the snapshot side.
    #[serde(default)]
    pub current_stock: i32,
    #[serde(default)]
    pub total_stock: Option<i32>,
    /// Draws allowed per day; `None` means unlimited.
    #[serde(default)]
    pub daily_limit: Option<i32>,
    #[serde(default)]
    pub sale_end_date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub detail_url: Option<String>,
}

/// A tracked listing. `pack_id` is the storefront's stable identity and our
/// primary key. Rows are never deleted; retirement flips `is_active` off,
/// and that state is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Banner {
    pub pack_id: i64,
    pub category: String,
    pub title: Option<String>,
    pub best_hit: Option<String>,
    pub price: Option<i32>,
    /// `None` means "explicitly unknown": the row was synthesized by startup
    /// recovery and no snapshot has supplied a stock value yet. A `None`
    /// here suppresses stock-change announcements and probability posts.
    pub current_stock: Option<i32>,
    pub total_stock: Option<i32>,
    pub daily_limit: Option<i32>,
    pub sale_end_date: Option<String>,
    pub image_url: Option<String>,
    pub detail_url: Option<String>,
    pub is_active: bool,
    /// Consecutive non-degraded passes this banner was absent from the
    /// snapshot. Reset to 0 whenever it shows up again.
    pub not_found_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Banner {
    /// Build a fresh Active banner from a snapshot record.
    pub fn from_snapshot(s: &BannerSnapshot) -> Self {
        let now = Utc::now();
        Self {
            pack_id: s.pack_id,
            category: s.category.clone(),
            title: s.title.clone(),
            best_hit: s.best_hit.clone(),
            price: s.price,
            current_stock: Some(s.current_stock),
            total_stock: s.total_stock,
            daily_limit: s.daily_limit,
            sale_end_date: s.sale_end_date.clone(),
            image_url: s.image_url.clone(),
            detail_url: s.detail_url.clone(),
            is_active: true,
            not_found_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Structured thread title. The leading `ID:` segment is what startup
    /// recovery parses to re-associate threads with banners, so its shape is
    /// load-bearing.
    pub fn thread_title(&self) -> String {
        let limit = match self.daily_limit {
            Some(n) if n > 0 => n.to_string(),
            _ => "∞".to_string(),
        };
        format!(
            "ID: {} / {}c {} / x{} / {}",
            self.pack_id,
            self.price.unwrap_or(0),
            self.best_hit.as_deref().unwrap_or("Unknown"),
            limit,
            self.total_stock.unwrap_or(0),
        )
    }

    pub fn expired_thread_title(&self) -> String {
        format!("[ENDED] {}", self.thread_title())
    }
}
