//! Background batch/anchor worker.
//!
//! One task per node.  Every `batching.tick_ms` it runs
//! [`VcpNode::run_pass`]; failures are logged and retried on the next
//! tick.  Shutdown is signalled over a `watch` channel and takes effect
//! between passes, so a pass in flight is never cut short.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use vcp_contracts::error::{VcpError, VcpResult};

use crate::node::VcpNode;

pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop and wait for it to finish its current pass.
    pub async fn shutdown(self) -> VcpResult<()> {
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(true);
        self.task.await.map_err(|e| VcpError::InternalFault {
            reason: format!("batch/anchor worker task failed: {}", e),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start the background worker for `node`.
pub fn spawn_worker(node: Arc<VcpNode>) -> WorkerHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let tick = node.config().batching.tick();
    node.set_worker_running(true);

    let task = tokio::spawn(async move {
        info!(tick_ms = tick.as_millis() as u64, "batch/anchor worker started");
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }

            match node.run_pass().await {
                Ok(report) if report.is_idle() => debug!("worker pass idle"),
                Ok(report) => info!(
                    sealed = report.sealed,
                    submitted = report.anchor.submitted,
                    polled = report.anchor.polled,
                    failures = report.anchor.failures,
                    "worker pass completed"
                ),
                Err(e) => warn!(error = %e, "worker pass failed, retrying next tick"),
            }
        }

        node.set_worker_running(false);
        info!("batch/anchor worker stopped");
    });

    WorkerHandle { shutdown, task }
}
