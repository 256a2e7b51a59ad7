//! Periodic task scheduler
//!
//! Every background job in the pipeline (analytics capture, broadcast,
//! agent tick, security cleanup, log scanning, traffic simulation) is a
//! [`PeriodicTask`] driven by its own tokio timer. A failing or panicking
//! iteration is logged and counted; the task runs again on its next tick.

use crate::observability::DashboardMetrics;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A unit of work run on a fixed period
#[async_trait]
pub trait PeriodicTask: Send + 'static {
    /// Stable name used in logs and the failure metric label
    fn name(&self) -> &'static str;

    async fn run_once(&mut self) -> anyhow::Result<()>;
}

/// Timing for one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub initial_delay: Duration,
    pub period: Duration,
}

impl Schedule {
    pub fn every(period: Duration) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            period,
        }
    }

    pub fn after(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }
}

/// Owns the task loops and stops them together
pub struct Scheduler {
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
    metrics: DashboardMetrics,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            handles: Vec::new(),
            metrics: DashboardMetrics::new(),
        }
    }

    /// Start `task` on its own timer
    pub fn spawn<T: PeriodicTask>(&mut self, task: T, schedule: Schedule) {
        let name = task.name();
        let shutdown = self.shutdown_tx.subscribe();
        let metrics = self.metrics.clone();
        let handle = tokio::spawn(run_task(task, schedule, shutdown, metrics));
        self.handles.push((name, handle));
    }

    /// Names of the spawned tasks in spawn order
    pub fn task_names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|(name, _)| *name).collect()
    }

    /// Signal every loop and wait for them to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Periodic task did not stop cleanly");
            }
        }
        info!("Scheduler stopped");
    }
}

async fn run_task<T: PeriodicTask>(
    mut task: T,
    schedule: Schedule,
    mut shutdown: broadcast::Receiver<()>,
    metrics: DashboardMetrics,
) {
    let name = task.name();
    info!(
        task = name,
        period_secs = schedule.period.as_secs_f64(),
        initial_delay_secs = schedule.initial_delay.as_secs_f64(),
        "Starting periodic task"
    );

    if !schedule.initial_delay.is_zero() {
        tokio::select! {
            _ = sleep(schedule.initial_delay) => {}
            _ = shutdown.recv() => {
                debug!(task = name, "Stopped before first run");
                return;
            }
        }
    }

    let mut ticker = interval(schedule.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match AssertUnwindSafe(task.run_once()).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(task = name, error = %e, "Periodic task iteration failed");
                        metrics.inc_task_failure(name);
                    }
                    Err(_) => {
                        warn!(task = name, "Periodic task iteration panicked");
                        metrics.inc_task_failure(name);
                    }
                }
            }
            _ = shutdown.recv() => {
                info!(task = name, "Stopping periodic task");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PeriodicTask for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_once(&mut self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails on the second run and panics on the third
    struct Flaky {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PeriodicTask for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn run_once(&mut self) -> anyhow::Result<()> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            match run {
                2 => anyhow::bail!("transient failure"),
                3 => panic!("iteration panic"),
                _ => Ok(()),
            }
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_delay_then_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.spawn(
            Counting { runs: runs.clone() },
            Schedule::every(Duration::from_secs(60)).after(Duration::from_secs(5)),
        );

        settle().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_and_panics_do_not_stop_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.spawn(
            Flaky { runs: runs.clone() },
            Schedule::every(Duration::from_secs(5)),
        );

        settle().await;
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(5)).await;
            settle().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 5);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_tasks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.spawn(Counting { runs: runs.clone() }, Schedule::every(Duration::from_secs(1)));
        scheduler.spawn(
            Counting { runs: runs.clone() },
            Schedule::every(Duration::from_secs(1)).after(Duration::from_secs(30)),
        );
        assert_eq!(scheduler.task_names(), vec!["counting", "counting"]);

        settle().await;
        scheduler.shutdown().await;

        let after = runs.load(Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }
}
