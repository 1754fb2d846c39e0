// tests/reconcile_tests.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use gachabot_core::models::{Banner, BannerSnapshot, ThreadBinding};
use gachabot_core::services::{AdminNotifier, ReconcileService, ReconcileSettings};
use gachabot_core::test_utils::{
    snapshot, MemoryBannerRepository, MemoryMedalRepository, MemoryPackHistoryRepository,
    MemoryThreadBindingRepository, RecordingNotifier,
};
use gachabot_core::traits::repository_traits::{BannerRepository, ThreadBindingRepository};

struct Harness {
    banners: Arc<MemoryBannerRepository>,
    bindings: Arc<MemoryThreadBindingRepository>,
    history: Arc<MemoryPackHistoryRepository>,
    notifier: Arc<RecordingNotifier>,
    service: ReconcileService,
}

fn harness(settings: ReconcileSettings) -> Harness {
    let banners = Arc::new(MemoryBannerRepository::new());
    let bindings = Arc::new(MemoryThreadBindingRepository::new());
    let medals = Arc::new(MemoryMedalRepository::new());
    let history = Arc::new(MemoryPackHistoryRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let admin = Arc::new(AdminNotifier::disabled(notifier.clone()));

    let mut channel_ids = HashMap::new();
    channel_ids.insert("Pokémon".to_string(), 111);
    channel_ids.insert("MIX".to_string(), 222);

    let service = ReconcileService::new(
        banners.clone(),
        bindings.clone(),
        medals,
        history.clone(),
        notifier.clone(),
        admin,
        channel_ids,
        settings,
    );
    Harness {
        banners,
        bindings,
        history,
        notifier,
        service,
    }
}

/// Settings that keep every pass non-degraded regardless of snapshot size.
fn lax() -> ReconcileSettings {
    ReconcileSettings {
        min_viable_snapshot: 0,
        not_found_threshold: 20,
        mention_on_new_thread: false,
        mention_on_stock_update: false,
    }
}

/// A banner as startup recovery would synthesize it: stock unknown.
fn recovered_banner(pack_id: i64, category: &str) -> Banner {
    let now = Utc::now();
    Banner {
        pack_id,
        category: category.to_string(),
        title: None,
        best_hit: None,
        price: Some(100),
        current_stock: None,
        total_stock: Some(500),
        daily_limit: Some(3),
        sale_end_date: None,
        image_url: None,
        detail_url: None,
        is_active: true,
        not_found_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn identical_snapshot_twice_creates_one_binding() {
    let h = harness(lax());
    let snap = vec![snapshot(1, "Pokémon", 50)];

    let r1 = h.service.reconcile(&snap).await.unwrap();
    assert_eq!(r1.new, 1);
    assert!(!r1.degraded);

    let r2 = h.service.reconcile(&snap).await.unwrap();
    assert_eq!(r2.new, 0);
    assert_eq!(r2.updated, 1);

    assert_eq!(h.notifier.created_count(), 1);
    assert_eq!(h.bindings.all().len(), 1);
}

#[tokio::test]
async fn zero_stock_record_never_creates_a_banner() {
    let h = harness(lax());
    let r = h.service.reconcile(&[snapshot(7, "Pokémon", 0)]).await.unwrap();
    assert_eq!(r.skipped_empty, 1);
    assert_eq!(r.new, 0);
    assert_eq!(h.notifier.created_count(), 0);
    assert!(h.banners.get(7).await.unwrap().is_none());
}

#[tokio::test]
async fn soldout_retires_immediately_and_is_terminal() {
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    let thread_id = h.bindings.all()[0].thread_id;

    // Stock hits zero: retire regardless of not_found_count.
    let r = h.service.reconcile(&[snapshot(1, "Pokémon", 0)]).await.unwrap();
    assert_eq!(r.retired_soldout, 1);
    assert!(h.notifier.was_archived(thread_id));
    assert!(!h.banners.get(1).await.unwrap().unwrap().is_active);
    assert!(h.bindings.get_by_banner(1).await.unwrap().unwrap().is_expired);

    // The pack_id coming back with stock does not resurrect anything.
    let r = h.service.reconcile(&[snapshot(1, "Pokémon", 60)]).await.unwrap();
    assert_eq!(r.skipped_inactive, 1);
    assert_eq!(r.new, 0);
    assert_eq!(h.notifier.created_count(), 1);
    assert!(!h.banners.get(1).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn absence_retires_on_the_twentieth_pass_exactly() {
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();

    for pass in 1..=19 {
        let r = h.service.reconcile(&[]).await.unwrap();
        assert_eq!(r.retired_expired, 0, "retired early on pass {pass}");
    }
    let after_19 = h.banners.get(1).await.unwrap().unwrap();
    assert!(after_19.is_active);
    assert_eq!(after_19.not_found_count, 19);

    let r = h.service.reconcile(&[]).await.unwrap();
    assert_eq!(r.retired_expired, 1);
    assert!(!h.banners.get(1).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn reappearing_banner_resets_the_absence_counter() {
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();

    for _ in 0..10 {
        h.service.reconcile(&[]).await.unwrap();
    }
    assert_eq!(h.banners.get(1).await.unwrap().unwrap().not_found_count, 10);

    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    assert_eq!(h.banners.get(1).await.unwrap().unwrap().not_found_count, 0);
}

#[tokio::test]
async fn degraded_pass_leaves_absence_counters_untouched() {
    let mut settings = lax();
    settings.min_viable_snapshot = 60;
    let h = harness(settings);

    // Small snapshots are degraded, but per-record logic still runs.
    let r = h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    assert!(r.degraded);
    assert_eq!(r.new, 1);

    for _ in 0..30 {
        let r = h.service.reconcile(&[snapshot(2, "MIX", 10)]).await.unwrap();
        assert!(r.degraded);
        assert_eq!(r.retired_expired, 0);
    }

    let banner = h.banners.get(1).await.unwrap().unwrap();
    assert!(banner.is_active);
    assert_eq!(banner.not_found_count, 0);
}

#[tokio::test]
async fn stock_change_appends_ledger_and_comments() {
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    h.service.reconcile(&[snapshot(1, "Pokémon", 40)]).await.unwrap();

    let history = h.history.all();
    assert_eq!(history.len(), 1);
    assert_eq!((history[0].old_count, history[0].new_count), (50, 40));

    let thread_id = h.bindings.all()[0].thread_id;
    let posts = h.notifier.text_posts(thread_id);
    assert!(
        posts.iter().any(|p| p.contains("50 -> 40")),
        "no stock comment in {posts:?}"
    );
}

#[tokio::test]
async fn unchanged_stock_appends_nothing() {
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    assert!(h.history.all().is_empty());
}

#[tokio::test]
async fn recovery_origin_stock_is_updated_silently() {
    let h = harness(lax());
    h.banners.insert_raw(recovered_banner(1, "Pokémon"));
    h.bindings.insert_raw(ThreadBinding::new(1, 500, 111, 500));

    let r = h.service.reconcile(&[snapshot(1, "Pokémon", 40)]).await.unwrap();
    assert_eq!(r.updated, 1);

    // Stock is now known, but the unknown->known transition produced no
    // ledger row and no announcement.
    assert_eq!(h.banners.get(1).await.unwrap().unwrap().current_stock, Some(40));
    assert!(h.history.all().is_empty());
    let posts = h.notifier.text_posts(500);
    assert!(
        !posts.iter().any(|p| p.contains("->")),
        "synthetic change announcement in {posts:?}"
    );

    // The next change is announced normally.
    h.service.reconcile(&[snapshot(1, "Pokémon", 30)]).await.unwrap();
    assert_eq!(h.history.all().len(), 1);
}

#[tokio::test]
async fn daily_limit_change_renames_the_thread() {
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();
    let thread_id = h.bindings.all()[0].thread_id;

    let mut changed: BannerSnapshot = snapshot(1, "Pokémon", 50);
    changed.daily_limit = None; // now unlimited

    h.service.reconcile(&[changed]).await.unwrap();
    let renames = h.notifier.renames.lock().unwrap().clone();
    assert!(
        renames.iter().any(|(t, title)| *t == thread_id && title.contains("x∞")),
        "no unlimited rename in {renames:?}"
    );
}

#[tokio::test]
async fn one_failed_actuation_does_not_abort_the_pass() {
    let h = harness(lax());
    h.notifier.fail_next_creates(1);

    let r = h
        .service
        .reconcile(&[snapshot(1, "Pokémon", 50), snapshot(2, "MIX", 30)])
        .await
        .unwrap();

    // Pack 1's thread creation failed and was skipped; pack 2 went through.
    assert_eq!(r.new, 1);
    assert!(h.banners.get(1).await.unwrap().is_none());
    assert!(h.banners.get(2).await.unwrap().is_some());

    // The failed banner is simply picked up on the next pass.
    let r = h
        .service
        .reconcile(&[snapshot(1, "Pokémon", 50), snapshot(2, "MIX", 30)])
        .await
        .unwrap();
    assert_eq!(r.new, 1);
    assert_eq!(h.bindings.all().len(), 2);
}

#[tokio::test]
async fn unmapped_category_is_skipped_not_fatal() {
    let h = harness(lax());
    let r = h
        .service
        .reconcile(&[snapshot(1, "Hobby", 50), snapshot(2, "MIX", 30)])
        .await
        .unwrap();
    assert_eq!(r.new, 1);
    assert!(h.banners.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn absence_sweep_sees_the_whole_snapshot() {
    // The banner appears late in the snapshot while an unrelated record is
    // processed first; the sweep must still count it as present.
    let h = harness(lax());
    h.service.reconcile(&[snapshot(1, "Pokémon", 50)]).await.unwrap();

    let r = h
        .service
        .reconcile(&[snapshot(2, "MIX", 10), snapshot(1, "Pokémon", 50)])
        .await
        .unwrap();
    assert_eq!(r.retired_expired, 0);
    assert_eq!(h.banners.get(1).await.unwrap().unwrap().not_found_count, 0);
}
