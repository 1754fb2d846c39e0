// tests/medal_tests.rs

use std::sync::Arc;

use gachabot_core::models::{ClaimOutcome, Medal, MedalTier, ThreadBinding};
use gachabot_core::services::MedalService;
use gachabot_core::test_utils::{
    MemoryMedalRepository, MemoryThreadBindingRepository, RecordingNotifier,
};
use gachabot_core::traits::repository_traits::MedalRepository;

fn service() -> (
    Arc<MemoryMedalRepository>,
    Arc<MemoryThreadBindingRepository>,
    Arc<RecordingNotifier>,
    MedalService,
) {
    let medals = Arc::new(MemoryMedalRepository::new());
    let bindings = Arc::new(MemoryThreadBindingRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let svc = MedalService::new(medals.clone(), bindings.clone(), notifier.clone());
    (medals, bindings, notifier, svc)
}

#[tokio::test]
async fn concurrent_claims_yield_exactly_one_winner() {
    let medals = Arc::new(MemoryMedalRepository::new());

    let mut handles = Vec::new();
    for user_id in 1..=5 {
        let medals = medals.clone();
        handles.push(tokio::spawn(async move {
            medals.try_claim(500, MedalTier::T1, user_id).await.unwrap()
        }));
    }

    let mut claimed = 0;
    let mut already = 0;
    for h in handles {
        match h.await.unwrap() {
            ClaimOutcome::Claimed => claimed += 1,
            ClaimOutcome::AlreadyClaimed { .. } => already += 1,
        }
    }
    assert_eq!(claimed, 1);
    assert_eq!(already, 4);
    assert_eq!(medals.count().await.unwrap(), 1);
}

#[tokio::test]
async fn each_tier_is_claimable_once_per_thread() {
    let (medals, _bindings, _notifier, svc) = service();
    for (tier, user) in [(MedalTier::T1, 1), (MedalTier::T2, 2), (MedalTier::T3, 3)] {
        assert_eq!(svc.claim(500, tier, user).await.unwrap(), ClaimOutcome::Claimed);
    }
    // Same tiers on a different thread are independent.
    assert_eq!(
        svc.claim(501, MedalTier::T1, 9).await.unwrap(),
        ClaimOutcome::Claimed
    );
    assert_eq!(
        svc.claim(500, MedalTier::T2, 9).await.unwrap(),
        ClaimOutcome::AlreadyClaimed { user_id: 2 }
    );
    assert_eq!(medals.count().await.unwrap(), 4);
}

#[tokio::test]
async fn claim_messages_only_count_in_bound_threads() {
    let (_medals, bindings, notifier, svc) = service();
    bindings.insert_raw(ThreadBinding::new(1, 500, 111, 600));

    // Unbound thread: not our game.
    assert_eq!(svc.handle_claim_message(999, 42, "T1").await.unwrap(), None);
    // Non-claim content: ignored.
    assert_eq!(svc.handle_claim_message(500, 42, "hello").await.unwrap(), None);

    // A real claim: marker reaction on the starter message plus a reply.
    let outcome = svc.handle_claim_message(500, 42, " t1 ").await.unwrap();
    assert_eq!(outcome, Some(ClaimOutcome::Claimed));
    let reactions = notifier.reactions_added.lock().unwrap().clone();
    assert!(reactions.contains(&(500, 600, "🥇".to_string())));

    // Losing claimant learns who holds the tier.
    let outcome = svc.handle_claim_message(500, 43, "T1").await.unwrap();
    assert_eq!(outcome, Some(ClaimOutcome::AlreadyClaimed { user_id: 42 }));
}

#[tokio::test]
async fn reaction_resync_restores_lost_claims_with_sentinel_owner() {
    let (medals, bindings, notifier, svc) = service();
    let binding = ThreadBinding::new(1, 500, 111, 600);
    bindings.insert_raw(binding.clone());

    // Two tier markers plus an unrelated reaction on the starter message.
    notifier.prime_reactions(500, 600, &["🥇", "🥈", "🚀"]);

    let inserted = svc.resync_from_reactions(&binding).await.unwrap();
    assert_eq!(inserted, 2);

    let t1 = medals.get(500, MedalTier::T1).await.unwrap().unwrap();
    assert_eq!(t1.user_id, Medal::UNKNOWN_USER);
    assert!(medals.get(500, MedalTier::T3).await.unwrap().is_none());

    // Idempotent on the second run.
    assert_eq!(svc.resync_from_reactions(&binding).await.unwrap(), 0);
}

#[tokio::test]
async fn resync_never_overwrites_a_real_claim() {
    let (medals, bindings, notifier, svc) = service();
    let binding = ThreadBinding::new(1, 500, 111, 600);
    bindings.insert_raw(binding.clone());

    medals.try_claim(500, MedalTier::T1, 42).await.unwrap();
    notifier.prime_reactions(500, 600, &["🥇"]);

    assert_eq!(svc.resync_from_reactions(&binding).await.unwrap(), 0);
    assert_eq!(medals.get(500, MedalTier::T1).await.unwrap().unwrap().user_id, 42);
}
