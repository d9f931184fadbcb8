use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use crate::dispatch::pool::MessageDispatchPool;
use crate::error::{DispatchError, Result};

/// Handle to the recurring flush task of a [`MessageDispatchPool`].
///
/// Dropping the handle stops the timer as well, but only [`shutdown`](Self::shutdown)
/// waits for the final flush to complete.
#[derive(Debug)]
pub struct FlushScheduler {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl FlushScheduler {
    pub(crate) fn spawn(
        pool: Arc<MessageDispatchPool>,
        interval: Duration,
        flush_on_shutdown: bool,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(DispatchError::ConfigError(
                "Flush interval must be greater than 0".to_string(),
            ));
        }
        let runtime = Handle::try_current().map_err(|_| DispatchError::RuntimeUnavailable)?;
        pool.arm_scheduler()?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let handle = runtime.spawn(run_flush_loop(
            pool,
            interval,
            flush_on_shutdown,
            shutdown_rx,
        ));

        info!(interval_ms = interval.as_millis() as u64, "Flush scheduler started");
        Ok(Self {
            shutdown_tx,
            handle,
        })
    }

    /// Stop the timer and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[instrument(skip(pool, shutdown_rx))]
async fn run_flush_loop(
    pool: Arc<MessageDispatchPool>,
    interval: Duration,
    flush_on_shutdown: bool,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            // Also fires when the FlushScheduler handle is dropped
            _ = shutdown_rx.recv() => {
                if flush_on_shutdown {
                    let report = pool.flush_all();
                    debug!(flushed = report.flushed, "Final flush before shutdown");
                }
                break;
            }

            _ = ticker.tick() => {
                pool.flush_all();
            }
        }
    }

    pool.disarm_scheduler();
    info!("Flush scheduler stopped");
}
