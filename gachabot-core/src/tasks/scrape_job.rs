// gachabot-core/src/tasks/scrape_job.rs
//
// The envelope around one reconcile pass: single-flight, per-attempt
// timeout, bounded retries, and scoped release of the snapshot source's
// session on every exit path. The scheduler tick and the manual trigger
// both enter through `run_scrape_job`; there is no second code path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use gachabot_common::traits::repository_traits::BannerRepository;
use gachabot_common::traits::SnapshotSource;
use gachabot_common::Error;

use crate::services::admin::AdminNotifier;
use crate::services::reconcile::{ReconcileReport, ReconcileService};

/// Scheduler states. Running and RetryWait refuse new triggers (single
/// flight); Idle and the two terminal states accept them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    RetryWait,
    Failed,
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    Trigger,
    AttemptFailed,
    RetryDelayElapsed,
    Completed,
    Exhausted,
}

impl JobState {
    pub fn can_begin(self) -> bool {
        matches!(self, JobState::Idle | JobState::Failed | JobState::Succeeded)
    }

    /// The one transition table. `None` means the event is refused in that
    /// state; the refused `Trigger` in Running/RetryWait *is* the
    /// single-flight guarantee.
    pub fn apply(self, event: JobEvent) -> Option<JobState> {
        use JobEvent::*;
        use JobState::*;
        match (self, event) {
            (Idle | Failed | Succeeded, Trigger) => Some(Running),
            (Running, AttemptFailed) => Some(RetryWait),
            (RetryWait, RetryDelayElapsed) => Some(Running),
            (Running, Completed) => Some(Succeeded),
            (Running, Exhausted) => Some(Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeJobSettings {
    pub timeout: Duration,
    pub retry_delay: Duration,
    /// Additional attempts after the first one fails.
    pub max_retries: u32,
}

impl Default for ScrapeJobSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            retry_delay: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

pub struct ScrapeJobRunner {
    source: Arc<dyn SnapshotSource>,
    reconciler: Arc<ReconcileService>,
    banners: Arc<dyn BannerRepository>,
    admin: Arc<AdminNotifier>,
    state: Mutex<JobState>,
    settings: ScrapeJobSettings,
}

/// Restores a begin-able state if the run unwinds without reaching one —
/// through an error path or task cancellation. A stuck Running flag would
/// permanently stop scheduling.
struct FlightGuard<'a> {
    runner: &'a ScrapeJobRunner,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.runner.state.lock().unwrap();
        if !st.can_begin() {
            *st = JobState::Failed;
        }
    }
}

impl ScrapeJobRunner {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        reconciler: Arc<ReconcileService>,
        banners: Arc<dyn BannerRepository>,
        admin: Arc<AdminNotifier>,
        settings: ScrapeJobSettings,
    ) -> Self {
        Self {
            source,
            reconciler,
            banners,
            admin,
            state: Mutex::new(JobState::Idle),
            settings,
        }
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap()
    }

    fn advance(&self, event: JobEvent) -> bool {
        let mut st = self.state.lock().unwrap();
        match st.apply(event) {
            Some(next) => {
                *st = next;
                true
            }
            None => false,
        }
    }

    /// Runs one scrape job: fetch, reconcile, retry on failure. A trigger
    /// arriving while a run is in flight is a no-op, never queued. Returns
    /// the report of the successful pass, if any.
    pub async fn run_scrape_job(&self) -> Option<ReconcileReport> {
        if !self.advance(JobEvent::Trigger) {
            info!("scrape job already in flight; trigger ignored");
            return None;
        }
        let _guard = FlightGuard { runner: self };

        let max = self.settings.max_retries;
        let mut attempt = 0u32;
        loop {
            let started = Instant::now();
            let outcome = tokio::time::timeout(self.settings.timeout, self.attempt()).await;
            // The source session is released here on success, failure and
            // timeout cancellation alike.
            self.source.close().await;

            match outcome {
                Ok(Ok(report)) => {
                    info!(
                        "scrape finished in {:.1}s: {:?}",
                        started.elapsed().as_secs_f64(),
                        report
                    );
                    let total = self.banners.count_active().await.unwrap_or(0);
                    self.admin
                        .scrape_success(&report, started.elapsed(), total)
                        .await;
                    self.advance(JobEvent::Completed);
                    return Some(report);
                }
                Ok(Err(e)) => {
                    warn!("scrape attempt {} failed: {e}", attempt + 1);
                    self.admin
                        .scrape_error("scrape failed", &e.to_string(), attempt, max)
                        .await;
                }
                Err(_) => {
                    warn!(
                        "scrape attempt {} timed out after {:?}",
                        attempt + 1,
                        self.settings.timeout
                    );
                    self.admin
                        .scrape_error("timeout", "the scrape did not finish in time", attempt, max)
                        .await;
                }
            }

            if attempt >= max {
                self.admin.all_retries_failed().await;
                self.advance(JobEvent::Exhausted);
                return None;
            }
            attempt += 1;
            self.advance(JobEvent::AttemptFailed);
            tokio::time::sleep(self.settings.retry_delay).await;
            self.advance(JobEvent::RetryDelayElapsed);
        }
    }

    async fn attempt(&self) -> Result<ReconcileReport, Error> {
        let snapshot = self.source.fetch().await?;
        self.reconciler.reconcile(&snapshot).await
    }
}

/// Drives the runner on a fixed interval. A late tick within the grace
/// window still runs — once; any backlog of missed intervals is collapsed
/// into that single run. A tick later than the grace window is dropped and
/// the schedule resumes at the next interval.
pub fn spawn_scrape_task(
    runner: Arc<ScrapeJobRunner>,
    period: Duration,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut next = Instant::now() + period;
        loop {
            tokio::time::sleep_until(next).await;
            let now = Instant::now();
            let late = now.duration_since(next);

            next += period;
            while next <= now {
                next += period;
            }

            if late > grace {
                warn!(
                    "scheduled trigger was {}s late (grace {}s); waiting for the next interval",
                    late.as_secs(),
                    grace.as_secs()
                );
                continue;
            }
            runner.run_scrape_job().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_accepted_only_outside_flight() {
        assert_eq!(JobState::Idle.apply(JobEvent::Trigger), Some(JobState::Running));
        assert_eq!(JobState::Failed.apply(JobEvent::Trigger), Some(JobState::Running));
        assert_eq!(JobState::Succeeded.apply(JobEvent::Trigger), Some(JobState::Running));
        assert_eq!(JobState::Running.apply(JobEvent::Trigger), None);
        assert_eq!(JobState::RetryWait.apply(JobEvent::Trigger), None);
    }

    #[test]
    fn retry_cycle_transitions() {
        assert_eq!(
            JobState::Running.apply(JobEvent::AttemptFailed),
            Some(JobState::RetryWait)
        );
        assert_eq!(
            JobState::RetryWait.apply(JobEvent::RetryDelayElapsed),
            Some(JobState::Running)
        );
        assert_eq!(JobState::Running.apply(JobEvent::Completed), Some(JobState::Succeeded));
        assert_eq!(JobState::Running.apply(JobEvent::Exhausted), Some(JobState::Failed));
    }

    #[test]
    fn nonsense_events_are_refused() {
        assert_eq!(JobState::Idle.apply(JobEvent::Completed), None);
        assert_eq!(JobState::Idle.apply(JobEvent::AttemptFailed), None);
        assert_eq!(JobState::Succeeded.apply(JobEvent::RetryDelayElapsed), None);
    }

    #[test]
    fn begin_predicate_matches_table() {
        for state in [
            JobState::Idle,
            JobState::Running,
            JobState::RetryWait,
            JobState::Failed,
            JobState::Succeeded,
        ] {
            assert_eq!(state.can_begin(), state.apply(JobEvent::Trigger).is_some());
        }
    }
}
