//! Timer task that keeps the article store fresh.
//!
//! One tokio task owns the interval and runs one pass per tick, so passes
//! never overlap. Ticks that come due while a pass is running collapse into
//! a single follow-up pass. A stop request is honoured between passes: the
//! pass in progress always finishes first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::pipeline::{Ingestor, PassError};

enum Control {
    Stop,
}

/// Work run by the timer task on every tick.
pub trait PeriodicTask: Send + 'static {
    fn period(&self) -> Duration;

    /// Shown in log lines.
    fn label(&self) -> &'static str;

    fn run(&mut self) -> impl Future<Output = ()> + Send;
}

/// Owner's handle on a running timer task.
pub struct SchedulerHandle {
    control: mpsc::Sender<Control>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the timer and wait for the task to exit.
    ///
    /// A pass already in progress runs to completion first.
    pub async fn shutdown(self) {
        let _ = self.control.send(Control::Stop).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

/// Run `task` every `task.period()`, starting one period from now.
pub fn spawn_periodic<T: PeriodicTask>(mut task: T) -> SchedulerHandle {
    let (control, mut inbox) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut timer = tokio::time::interval(task.period());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the boot sequence already ran a pass
        timer.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = inbox.recv() => {
                    tracing::info!(task = task.label(), "Scheduler stopped");
                    break;
                }
                _ = timer.tick() => task.run().await,
            }
        }
    });

    SchedulerHandle {
        control,
        task: handle,
    }
}

/// Runs [`Ingestor::run_pass`] on every tick.
pub struct IngestTask {
    ingestor: Arc<Ingestor>,
    period: Duration,
}

impl IngestTask {
    pub fn new(ingestor: Arc<Ingestor>, period: Duration) -> Self {
        Self { ingestor, period }
    }
}

impl PeriodicTask for IngestTask {
    fn period(&self) -> Duration {
        self.period
    }

    fn label(&self) -> &'static str {
        "ingest"
    }

    async fn run(&mut self) {
        // The pipeline already logged the cause; the next tick retries
        if let Err(PassError::Store(_)) = self.ingestor.run_pass().await {
            tracing::debug!("Scheduled pass aborted, waiting for next tick");
        }
    }
}

/// Start periodic ingestion for `ingestor`.
pub fn spawn_ingest_scheduler(ingestor: Arc<Ingestor>, period: Duration) -> SchedulerHandle {
    tracing::info!(
        interval_secs = period.as_secs(),
        feeds = ingestor.feeds().len(),
        "Starting ingestion scheduler"
    );
    spawn_periodic(IngestTask::new(ingestor, period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTask {
        runs: Arc<AtomicUsize>,
        pass_time: Duration,
    }

    impl PeriodicTask for CountingTask {
        fn period(&self) -> Duration {
            Duration::from_secs(60)
        }

        fn label(&self) -> &'static str {
            "counting"
        }

        async fn run(&mut self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.pass_time).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_run_waits_one_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(CountingTask {
            runs: runs.clone(),
            pass_time: Duration::ZERO,
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_during_long_pass_are_skipped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(CountingTask {
            runs: runs.clone(),
            // Each pass outlasts two and a half intervals
            pass_time: Duration::from_secs(150),
        });

        // First pass runs from t=60 to t=210. The ticks due at 120 and 180
        // collapse into a single pass starting at 210.
        tokio::time::sleep(Duration::from_secs(205)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // The second pass ends at 360; nothing else has started before then
        tokio::time::sleep(Duration::from_secs(140)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(CountingTask {
            runs: runs.clone(),
            pass_time: Duration::ZERO,
        });

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_running_pass() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(CountingTask {
            runs: runs.clone(),
            pass_time: Duration::from_secs(150),
        });

        // Pass in progress from t=60 to t=210; ticks at 120 and 180 are pending
        tokio::time::sleep(Duration::from_secs(100)).await;
        let started = tokio::time::Instant::now();
        handle.shutdown().await;

        assert!(started.elapsed() >= Duration::from_secs(110));
        // The stop request wins over the overdue tick
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
