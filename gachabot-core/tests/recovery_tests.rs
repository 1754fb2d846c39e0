// tests/recovery_tests.rs

use std::collections::HashMap;
use std::sync::Arc;

use gachabot_core::models::{Banner, ThreadInfo};
use gachabot_core::services::RecoveryService;
use gachabot_core::test_utils::{
    MemoryBannerRepository, MemoryThreadBindingRepository, RecordingNotifier,
};
use gachabot_core::traits::repository_traits::{BannerRepository, ThreadBindingRepository};

fn thread(thread_id: i64, name: &str) -> ThreadInfo {
    ThreadInfo {
        thread_id,
        name: name.to_string(),
        parent_id: 111,
    }
}

fn harness() -> (
    Arc<MemoryBannerRepository>,
    Arc<MemoryThreadBindingRepository>,
    Arc<RecordingNotifier>,
    RecoveryService,
) {
    let banners = Arc::new(MemoryBannerRepository::new());
    let bindings = Arc::new(MemoryThreadBindingRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let mut channel_ids = HashMap::new();
    channel_ids.insert("Pokémon".to_string(), 111);
    let service = RecoveryService::new(
        banners.clone(),
        bindings.clone(),
        notifier.clone(),
        channel_ids,
    );
    (banners, bindings, notifier, service)
}

#[tokio::test]
async fn rebuilds_bindings_from_structured_titles() {
    let (banners, bindings, notifier, service) = harness();
    notifier.prime_listing(
        111,
        vec![
            thread(9001, "ID: 123 / 100c Chase Card / x3 / 500"),
            thread(9002, "general talk"),
            thread(9003, "[ENDED] ID: 99 / 50c Foo / x1 / 10"),
        ],
    );

    let report = service.rebuild_from_notifier().await.unwrap();
    assert_eq!(report.rebuilt, 2);
    assert_eq!(report.unmatched, 1);

    // Live thread: active banner with explicitly unknown stock.
    let live = banners.get(123).await.unwrap().unwrap();
    assert!(live.is_active);
    assert_eq!(live.current_stock, None);
    assert_eq!(live.price, Some(100));
    assert_eq!(live.daily_limit, Some(3));
    assert_eq!(live.total_stock, Some(500));
    let live_binding = bindings.get_by_thread(9001).await.unwrap().unwrap();
    assert_eq!(live_binding.banner_id, 123);
    assert!(!live_binding.is_expired);

    // Ended thread: the banner comes back already retired.
    let ended = banners.get(99).await.unwrap().unwrap();
    assert!(!ended.is_active);
    assert!(bindings.get_by_thread(9003).await.unwrap().unwrap().is_expired);
}

#[tokio::test]
async fn running_twice_equals_running_once() {
    let (banners, bindings, notifier, service) = harness();
    notifier.prime_listing(
        111,
        vec![
            thread(9001, "ID: 123 / 100c Chase Card / x3 / 500"),
            thread(9003, "[ENDED] ID: 99 / 50c Foo / x1 / 10"),
        ],
    );

    service.rebuild_from_notifier().await.unwrap();
    let bindings_after_first = bindings.all();
    let stock_after_first = banners.get(123).await.unwrap().unwrap().current_stock;

    let report = service.rebuild_from_notifier().await.unwrap();
    assert_eq!(report.rebuilt, 0);
    assert_eq!(report.already_bound, 2);

    let after_second = bindings.all();
    assert_eq!(after_second.len(), bindings_after_first.len());
    let ids_first: Vec<_> = bindings_after_first.iter().map(|b| b.id).collect();
    let ids_second: Vec<_> = after_second.iter().map(|b| b.id).collect();
    assert_eq!(ids_first, ids_second);
    assert_eq!(
        banners.get(123).await.unwrap().unwrap().current_stock,
        stock_after_first
    );
}

#[tokio::test]
async fn existing_banner_rows_are_not_overwritten() {
    let (banners, bindings, notifier, service) = harness();
    notifier.prime_listing(111, vec![thread(9001, "ID: 123 / 100c Chase Card / x3 / 500")]);

    // The banner row survived; only the binding was lost.
    let mut survivor = Banner::from_snapshot(&gachabot_core::test_utils::snapshot(
        123, "Pokémon", 42,
    ));
    survivor.current_stock = Some(42);
    banners.insert_raw(survivor);

    service.rebuild_from_notifier().await.unwrap();

    // Known stock stays known; recovery only fills the binding gap.
    assert_eq!(banners.get(123).await.unwrap().unwrap().current_stock, Some(42));
    assert!(bindings.get_by_thread(9001).await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_pack_ids_across_threads_bind_once() {
    let (_banners, bindings, notifier, service) = harness();
    notifier.prime_listing(
        111,
        vec![
            thread(9001, "ID: 123 / 100c Chase Card / x3 / 500"),
            thread(9002, "ID: 123 / 100c Chase Card / x3 / 500"),
        ],
    );

    let report = service.rebuild_from_notifier().await.unwrap();
    assert_eq!(report.rebuilt, 1);
    assert_eq!(report.already_bound, 1);
    assert_eq!(bindings.all().len(), 1);
}
