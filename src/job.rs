//! Cooperative periodic jobs
//!
//! A job ticks immediately, then every `period`. The stop signal is only
//! observed between executions, so a cycle in progress always completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::error::Result;

/// Consecutive failed cycles before a job reports [`JobStatus::Failed`]
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Failed,
    Stopped,
}

/// Work executed on every tick
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self) -> Result<()>;
}

/// Handle to a spawned periodic job
pub struct JobHandle {
    stop_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<JobStatus>,
    handle: JoinHandle<()>,
}

impl JobHandle {
    pub fn status(&self) -> JobStatus {
        *self.status_rx.borrow()
    }

    /// Signal the job and wait until it has exited.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!("Periodic job ended abnormally: {}", e);
        }
    }
}

/// Spawn `job` onto the runtime.
pub fn spawn_periodic<J>(job: Arc<J>, period: Duration) -> JobHandle
where
    J: Job + ?Sized + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let (status_tx, status_rx) = watch::channel(JobStatus::Running);
    let handle = tokio::spawn(async move {
        run_periodic(job.as_ref(), period, stop_rx, status_tx).await;
    });
    JobHandle {
        stop_tx,
        status_rx,
        handle,
    }
}

/// Run `job` until `stop_rx` carries `true`.
pub async fn run_periodic<J>(
    job: &J,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<JobStatus>,
) where
    J: Job + ?Sized,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failures = 0u32;

    info!("Starting job {} every {:?}", job.name(), period);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                match job.execute().await {
                    Ok(()) => {
                        if failures > 0 {
                            info!("Job {} recovered", job.name());
                        }
                        failures = 0;
                        status_tx.send_replace(JobStatus::Running);
                    }
                    Err(e) => {
                        failures += 1;
                        warn!("Job {} failed ({} in a row): {}", job.name(), failures, e);
                        if failures >= MAX_CONSECUTIVE_FAILURES {
                            error!("Job {} marked as failed", job.name());
                            status_tx.send_replace(JobStatus::Failed);
                        }
                    }
                }
            }
        }
    }

    debug!("Job {} stopped", job.name());
    status_tx.send_replace(JobStatus::Stopped);
}
