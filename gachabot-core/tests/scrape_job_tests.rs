// tests/scrape_job_tests.rs
//
// Runs under paused time: sleeps and timeouts auto-advance, so the 180s
// timeout and 30s retry delays cost nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gachabot_core::services::{AdminNotifier, ReconcileService, ReconcileSettings};
use gachabot_core::tasks::{spawn_scrape_task, JobState, ScrapeJobRunner, ScrapeJobSettings};
use gachabot_core::test_utils::{
    snapshot, MemoryBannerRepository, MemoryMedalRepository, MemoryPackHistoryRepository,
    MemoryThreadBindingRepository, RecordingNotifier, ScriptedSource, SourceScript,
};

fn runner(steps: Vec<SourceScript>) -> (Arc<ScrapeJobRunner>, Arc<ScriptedSource>) {
    let banners = Arc::new(MemoryBannerRepository::new());
    let bindings = Arc::new(MemoryThreadBindingRepository::new());
    let medals = Arc::new(MemoryMedalRepository::new());
    let history = Arc::new(MemoryPackHistoryRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let admin = Arc::new(AdminNotifier::disabled(notifier.clone()));

    let mut channel_ids = HashMap::new();
    channel_ids.insert("Pokémon".to_string(), 111);

    let reconciler = Arc::new(ReconcileService::new(
        banners.clone(),
        bindings,
        medals,
        history,
        notifier,
        admin.clone(),
        channel_ids,
        ReconcileSettings {
            min_viable_snapshot: 0,
            ..ReconcileSettings::default()
        },
    ));

    let source = Arc::new(ScriptedSource::new(steps));
    let runner = Arc::new(ScrapeJobRunner::new(
        source.clone(),
        reconciler,
        banners,
        admin,
        ScrapeJobSettings::default(),
    ));
    (runner, source)
}

#[tokio::test(start_paused = true)]
async fn successful_run_reconciles_and_releases_the_source() {
    let (runner, source) = runner(vec![SourceScript::Ok(vec![snapshot(1, "Pokémon", 50)])]);

    let report = runner.run_scrape_job().await.expect("run should succeed");
    assert_eq!(report.new, 1);
    assert_eq!(runner.state(), JobState::Succeeded);
    assert_eq!(source.closed_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn source_failures_retry_then_exhaust() {
    let (runner, source) = runner(vec![
        SourceScript::Fail("boom 1".into()),
        SourceScript::Fail("boom 2".into()),
        SourceScript::Fail("boom 3".into()),
    ]);

    let report = runner.run_scrape_job().await;
    assert!(report.is_none());
    assert_eq!(runner.state(), JobState::Failed);
    // Session released after every attempt, not only the last.
    assert_eq!(source.closed_count(), 3);
    // A terminal Failed state still accepts the next trigger.
    assert!(runner.state().can_begin());
}

#[tokio::test(start_paused = true)]
async fn second_attempt_can_recover_a_failed_run() {
    let (runner, source) = runner(vec![
        SourceScript::Fail("boom".into()),
        SourceScript::Ok(vec![snapshot(1, "Pokémon", 50)]),
    ]);

    let report = runner.run_scrape_job().await.expect("retry should succeed");
    assert_eq!(report.new, 1);
    assert_eq!(runner.state(), JobState::Succeeded);
    assert_eq!(source.closed_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_cancels_the_attempt_and_releases_the_source() {
    let (runner, source) = runner(vec![
        SourceScript::Hang,
        SourceScript::Ok(vec![snapshot(1, "Pokémon", 50)]),
    ]);

    let report = runner.run_scrape_job().await.expect("retry after timeout");
    assert_eq!(report.new, 1);
    // The hung attempt was cancelled and its session still released.
    assert_eq!(source.closed_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn triggers_during_a_run_are_dropped_not_queued() {
    let (runner, _source) = runner(vec![SourceScript::Hang, SourceScript::Hang, SourceScript::Hang]);

    let background = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run_scrape_job().await })
    };
    tokio::task::yield_now().await;
    assert_eq!(runner.state(), JobState::Running);

    // Second trigger while in flight: refused immediately.
    assert!(runner.run_scrape_job().await.is_none());
    assert_eq!(runner.state(), JobState::Running);

    // Cancelling the in-flight run must release the single-flight flag.
    background.abort();
    let _ = background.await;
    assert_eq!(runner.state(), JobState::Failed);
    assert!(runner.state().can_begin());
}

#[tokio::test(start_paused = true)]
async fn scheduled_ticks_drive_the_runner() {
    let (runner, source) = runner(vec![SourceScript::Ok(vec![snapshot(1, "Pokémon", 50)])]);

    let handle = spawn_scrape_task(
        runner.clone(),
        Duration::from_secs(60),
        Duration::from_secs(300),
    );

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(runner.state(), JobState::Succeeded);
    assert!(source.closed_count() >= 1);
    handle.abort();
}
