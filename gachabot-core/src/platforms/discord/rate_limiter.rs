// gachabot-core/src/platforms/discord/rate_limiter.rs
//
// Self-imposed spacing of Discord API calls, bucketed per operation kind.
// Slots are reserved under the lock and slept on outside it, so two
// concurrent calls of the same kind still space themselves correctly.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    CreateThread,
    RenameThread,
    ArchiveThread,
    PostMessage,
    EditMessage,
    AddReaction,
    ReadReactions,
    ListThreads,
}

pub struct RateLimiter {
    min_interval: Duration,
    next_free: Mutex<HashMap<OpKind, Instant>>,
}

impl RateLimiter {
    pub fn new(ops_per_second: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / ops_per_second),
            next_free: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until this operation kind's next free slot, then claims it.
    pub async fn acquire(&self, kind: OpKind) {
        let wait = {
            let mut slots = self.next_free.lock().await;
            let now = Instant::now();
            let slot = match slots.get(&kind) {
                Some(free_at) if *free_at > now => *free_at,
                _ => now,
            };
            slots.insert(kind, slot + self.min_interval);
            slot.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            debug!("rate limit: waiting {:?} for {:?}", wait, kind);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_calls_of_the_same_kind() {
        let limiter = RateLimiter::new(2.0);
        let start = Instant::now();
        limiter.acquire(OpKind::PostMessage).await;
        limiter.acquire(OpKind::PostMessage).await;
        limiter.acquire(OpKind::PostMessage).await;
        // 2 ops/sec => 500ms between calls, 1s across three.
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_do_not_interfere() {
        let limiter = RateLimiter::new(2.0);
        let start = Instant::now();
        limiter.acquire(OpKind::PostMessage).await;
        limiter.acquire(OpKind::CreateThread).await;
        limiter.acquire(OpKind::ListThreads).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
