use crate::pipeline::{CycleReport, IngestionPipeline};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    RunningCycle,
    Sleeping,
}

/// Drives one cycle at a time, forever. Each cycle runs on its own task so
/// that a panic inside it is contained and the loop carries on.
pub struct Scheduler {
    pipeline: Arc<IngestionPipeline>,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<IngestionPipeline>, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Sleeping);
        Self {
            pipeline,
            interval,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single cycle. Errors and panics are logged and reported as
    /// `None`; they never escape.
    pub async fn run_once(&self) -> Option<CycleReport> {
        self.state.send_replace(SchedulerState::RunningCycle);

        let pipeline = self.pipeline.clone();
        let report = match tokio::spawn(async move { pipeline.run_cycle().await }).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                error!("Cycle failed: {}", e);
                None
            }
            Err(e) if e.is_panic() => {
                error!("Cycle panicked: {}", e);
                None
            }
            Err(e) => {
                error!("Cycle task aborted: {}", e);
                None
            }
        };

        self.state.send_replace(SchedulerState::Sleeping);
        report
    }

    /// Loop for the life of the process. The next cycle starts only after
    /// the previous one completed and the interval elapsed.
    pub async fn run_forever(&self) {
        info!("Scheduler started, interval {:?}", self.interval);
        loop {
            self.run_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
