//! Periodic workers
//!
//! Two independent loops run from process start:
//! - **update**: every `update_interval`, [`Updater::try_update`] for each
//!   record in configuration order
//! - **resync**: every `poll_interval`, [`Updater::resync`] for each record
//!
//! Each worker owns a child of one root [`CancellationToken`]. Cancelling the
//! root stops both from starting new work; a call already in flight runs to
//! completion. [`SchedulerHandle::shutdown`] waits for both workers with a
//! bounded timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{ResyncOutcome, UpdateOutcome, Updater};
use crate::config::{RecordConfig, SchedulerConfig};
use crate::error::{Error, Result};

/// Which loop a worker runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerKind {
    Update,
    Resync,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Update => f.write_str("update"),
            WorkerKind::Resync => f.write_str("resync"),
        }
    }
}

impl WorkerKind {
    /// Process one record; failures are logged, never propagated
    async fn run_once(self, updater: &Updater, record: &RecordConfig) {
        let name = &record.record_name;

        match self {
            WorkerKind::Update => match updater.try_update(record).await {
                Ok(UpdateOutcome::Unchanged { .. }) => {}
                Ok(UpdateOutcome::Updated { record_id, .. }) => {
                    debug!("Update cycle for {} wrote record {}", name, record_id);
                }
                Err(e) => {
                    error!("Update cycle failed for {}: {}. Retrying next tick.", name, e);
                }
            },
            WorkerKind::Resync => match updater.resync(record).await {
                Ok(ResyncOutcome::Reapplied { .. }) => {}
                Ok(ResyncOutcome::Corrected { previous, current }) => {
                    debug!("Resync for {} replaced {} with {}", name, previous, current);
                }
                Err(e) => {
                    error!("Resync failed for {}: {}. Retrying next tick.", name, e);
                }
            },
        }
    }
}

/// Starts the periodic workers
pub struct Scheduler;

impl Scheduler {
    /// Spawn the update and resync workers
    ///
    /// Must be called from within a tokio runtime. The first run of each
    /// loop happens one full period after start.
    pub fn start(
        updater: Arc<Updater>,
        records: Vec<RecordConfig>,
        config: SchedulerConfig,
    ) -> Result<SchedulerHandle> {
        config.validate()?;

        let records: Arc<[RecordConfig]> = records.into();
        let root = CancellationToken::new();

        info!(
            "Starting scheduler: {} record(s), update every {:?}, resync every {:?}",
            records.len(),
            config.update_interval,
            config.poll_interval
        );

        let update = tokio::spawn(run_worker(
            WorkerKind::Update,
            updater.clone(),
            records.clone(),
            config.update_interval,
            root.child_token(),
        ));

        let resync = tokio::spawn(run_worker(
            WorkerKind::Resync,
            updater,
            records,
            config.poll_interval,
            root.child_token(),
        ));

        Ok(SchedulerHandle {
            root,
            update,
            resync,
            shutdown_timeout: config.shutdown_timeout,
        })
    }
}

/// Worker loop: wait for the next tick or cancellation
async fn run_worker(
    kind: WorkerKind,
    updater: Arc<Updater>,
    records: Arc<[RecordConfig]>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!("{} worker started", kind);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                break;
            }

            _ = ticker.tick() => {
                for record in records.iter() {
                    if token.is_cancelled() {
                        debug!("{} worker cancelled mid-tick, skipping remaining records", kind);
                        break;
                    }
                    kind.run_once(&updater, record).await;
                }
            }
        }
    }

    info!("{} worker stopped", kind);
}

/// Handle to the running workers
#[derive(Debug)]
pub struct SchedulerHandle {
    root: CancellationToken,
    update: JoinHandle<()>,
    resync: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl SchedulerHandle {
    /// Signal both workers to stop
    ///
    /// Idempotent: calling it again has no further effect.
    pub fn cancel(&self) {
        self.root.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancel both workers and wait for them to acknowledge
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Both workers exited within the shutdown timeout
    /// - `Err(Error::Shutdown)`: Deadline passed; remaining workers were aborted
    pub async fn shutdown(self) -> Result<()> {
        let SchedulerHandle {
            root,
            mut update,
            mut resync,
            shutdown_timeout,
        } = self;

        root.cancel();

        let joined = tokio::time::timeout(shutdown_timeout, async {
            tokio::join!(&mut update, &mut resync)
        })
        .await;

        match joined {
            Ok((update_result, resync_result)) => {
                for (kind, result) in [
                    (WorkerKind::Update, update_result),
                    (WorkerKind::Resync, resync_result),
                ] {
                    if let Err(e) = result {
                        warn!("{} worker ended abnormally: {}", kind, e);
                    }
                }
                info!("Scheduler stopped");
                Ok(())
            }
            Err(_) => {
                update.abort();
                resync.abort();
                Err(Error::shutdown(format!(
                    "workers did not stop within {:?}",
                    shutdown_timeout
                )))
            }
        }
    }
}
