// gachabot-core/src/test_utils/mod.rs
//
// In-memory trait implementations so engine, service and task tests run
// without Postgres or Discord. The memory stores enforce the same
// uniqueness rules as the real schema.

pub mod fakes;
pub mod memory;

pub use fakes::{RecordingNotifier, ScriptedSource, SourceScript};
pub use memory::{
    MemoryBannerRepository, MemoryMedalRepository, MemoryPackHistoryRepository,
    MemoryThreadBindingRepository,
};

use gachabot_common::models::BannerSnapshot;

/// A snapshot record with sensible defaults for tests.
pub fn snapshot(pack_id: i64, category: &str, current_stock: i32) -> BannerSnapshot {
    BannerSnapshot {
        pack_id,
        category: category.to_string(),
        title: Some(format!("Banner {pack_id}")),
        best_hit: Some("Chase Card".to_string()),
        price: Some(100),
        current_stock,
        total_stock: Some(500),
        daily_limit: Some(3),
        sale_end_date: Some("2026-12-31".to_string()),
        image_url: None,
        detail_url: Some(format!("https://example.test/packs/{pack_id}")),
    }
}
