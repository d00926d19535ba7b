//! Scheduler loop: lifecycle and the cancellable single-shot timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::AppResult;
use crate::modules::config::PollerConfig;
use crate::modules::fetcher::UsageFetcher;
use crate::modules::relay::RelayGateway;
use crate::modules::store::AccountStore;
use crate::modules::token::TokenGateway;
use crate::scheduler::pass::UpdatePass;
use crate::scheduler::planner::IntervalPlanner;
use crate::scheduler::prober::WindowProber;
use windkeep_types::{PassCounts, SchedulerStatus};

/// The armed timer: a stop signal for the pending sleep plus the loop task.
struct LoopHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct ServiceInner {
    pass: UpdatePass,
    planner: IntervalPlanner,
    config: PollerConfig,
    running: AtomicBool,
    loop_task: Mutex<Option<LoopHandle>>,
}

impl ServiceInner {
    fn base_interval(&self) -> Duration {
        Duration::from_secs(self.config.base_interval_minutes * 60)
    }

    /// One cycle: update pass, then plan the next wake-up.
    ///
    /// An aborted pass (enumeration failure) falls back to the base
    /// interval so the loop never stalls permanently.
    async fn run_cycle(&self) -> Duration {
        match self.pass.run().await {
            Ok(_counts) => self.planner.next_interval().await,
            Err(e) => {
                tracing::error!(
                    "[Scheduler] Update pass aborted: {}, re-arming with base interval",
                    e
                );
                self.base_interval()
            },
        }
    }
}

async fn run_loop(
    inner: Arc<ServiceInner>,
    mut stop_rx: watch::Receiver<bool>,
    first_delay: Duration,
) {
    let mut delay = first_delay;
    loop {
        tracing::debug!("[Scheduler] Next cycle in {:?}", delay);
        let deadline = Instant::now() + delay;
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => {},
            _ = stop_rx.changed() => break,
        }
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
        delay = inner.run_cycle().await;
        // A stop() issued mid-cycle is observed here, before re-arming
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
    }
    tracing::debug!("[Scheduler] Loop task exited");
}

/// Adaptive usage poller: repeated (update pass -> planner -> sleep)
/// cycles driven by one cancellable deadline.
///
/// An explicit instance, constructed once by the process entry point and
/// shared by handle; `start`/`stop` are idempotent.
#[derive(Clone)]
pub struct PollerService {
    inner: Arc<ServiceInner>,
}

impl PollerService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        fetcher: Arc<dyn UsageFetcher>,
        tokens: Arc<dyn TokenGateway>,
        relay: Arc<dyn RelayGateway>,
        config: PollerConfig,
    ) -> Self {
        let prober = Arc::new(WindowProber::new(
            store.clone(),
            fetcher.clone(),
            tokens,
            relay,
            config.clone(),
        ));
        let pass = UpdatePass::new(store.clone(), fetcher, prober, config.clone());
        let planner = IntervalPlanner::new(store, config.clone());
        Self {
            inner: Arc::new(ServiceInner {
                pass,
                planner,
                config,
                running: AtomicBool::new(false),
                loop_task: Mutex::new(None),
            }),
        }
    }

    /// Start the poller. The first update pass runs inline before the timer
    /// is armed; calling start while running is a no-op.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("[Scheduler] start() called while already running");
            return;
        }
        tracing::info!("[Scheduler] Usage poller started");

        let first_delay = self.inner.run_cycle().await;
        if !self.inner.running.load(Ordering::SeqCst) {
            tracing::debug!("[Scheduler] Stopped during initial cycle, not arming timer");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(self.inner.clone(), stop_rx, first_delay));

        let mut guard = self.inner.loop_task.lock().await;
        *guard = Some(LoopHandle { stop: stop_tx, task });
        // stop() may have raced us between the run flag and the handle
        if !self.inner.running.load(Ordering::SeqCst) {
            if let Some(handle) = guard.take() {
                let _ = handle.stop.send(true);
            }
        }
    }

    /// Stop the poller. Cancels the pending timer; a cycle already in
    /// progress drains and will not re-arm. Calling stop while stopped is a
    /// no-op.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            tracing::warn!("[Scheduler] stop() called while not running");
            return;
        }

        if let Some(handle) = self.inner.loop_task.lock().await.take() {
            let _ = handle.stop.send(true);
            // The task is left to drain; it exits on the run flag
            drop(handle.task);
        }
        tracing::info!("[Scheduler] Usage poller stopped");
    }

    /// Run a single update pass outside the loop (one-shot CLI use).
    pub async fn run_pass(&self) -> AppResult<PassCounts> {
        self.inner.pass.run().await
    }

    /// Current run flag and tunables. Pure read.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            is_running: self.inner.running.load(Ordering::SeqCst),
            base_interval_minutes: self.inner.config.base_interval_minutes,
            after_reset_minutes: self.inner.config.after_reset_minutes,
            reset_threshold_minutes: self.inner.config.reset_threshold_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::test_support::{
        test_config, trackable_account, MockRelay, MockStore, MockTokens, StaticFetcher,
    };
    use windkeep_types::UsageSnapshot;

    fn service_with_counters() -> (PollerService, Arc<StaticFetcher>) {
        let store = Arc::new(MockStore::new(vec![trackable_account("acc-1", "a@example.com")]));
        let fetcher = Arc::new(StaticFetcher::new(UsageSnapshot::default()));
        let tokens = Arc::new(MockTokens { token: Some("tok".to_string()) });
        let relay = Arc::new(MockRelay::ok());
        let service =
            PollerService::new(store, fetcher.clone(), tokens, relay, test_config());
        (service, fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_first_pass_inline() {
        let (service, fetcher) = service_with_counters();

        service.start().await;
        assert!(service.status().is_running);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_noop() {
        let (service, fetcher) = service_with_counters();

        service.start().await;
        service.start().await;
        // The second start did not run another inline pass
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_is_noop_and_leaves_no_timer() {
        let (service, _fetcher) = service_with_counters();

        service.start().await;
        service.stop().await;
        assert!(!service.status().is_running);
        assert!(service.inner.loop_task.lock().await.is_none());

        // Second stop: no-op
        service.stop().await;
        assert!(!service.status().is_running);
        assert!(service.inner.loop_task.lock().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_passes_after_stop() {
        let (service, fetcher) = service_with_counters();

        service.start().await;
        service.stop().await;
        let calls_at_stop = fetcher.calls.load(Ordering::SeqCst);

        // Well past several base intervals
        tokio::time::sleep(Duration::from_secs(90 * 60)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_subsequent_cycles() {
        let (service, fetcher) = service_with_counters();

        service.start().await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // One base interval later the armed timer runs the second pass
        tokio::time::sleep(Duration::from_secs(20 * 60 + 30)).await;
        assert!(fetcher.calls.load(Ordering::SeqCst) >= 2);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enumeration_failure_rearms_with_base_interval() {
        let store = Arc::new(MockStore::new(vec![]));
        store.fail_listing.store(true, Ordering::SeqCst);
        let fetcher = Arc::new(StaticFetcher::new(UsageSnapshot::default()));
        let tokens = Arc::new(MockTokens { token: None });
        let relay = Arc::new(MockRelay::ok());
        let service = PollerService::new(
            store.clone(),
            fetcher,
            tokens,
            relay,
            test_config(),
        );

        service.start().await;
        // The failed cycle must still arm a timer
        assert!(service.status().is_running);
        assert!(service.inner.loop_task.lock().await.is_some());

        service.stop().await;
    }

    #[tokio::test]
    async fn test_status_reports_tunables() {
        let (service, _fetcher) = service_with_counters();

        let status = service.status();
        assert!(!status.is_running);
        assert_eq!(status.base_interval_minutes, 20);
        assert_eq!(status.after_reset_minutes, 5);
        assert_eq!(status.reset_threshold_minutes, 10);
    }
}
