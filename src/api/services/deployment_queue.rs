//! Deployment job queue.
//!
//! One FIFO lane per architecture on top of a bounded worker pool: jobs of
//! the same architecture run strictly in submission order, jobs of different
//! architectures run concurrently up to the pool size. Lanes are background
//! tasks that retire themselves after sitting idle.

use crate::models::{Diagram, StackAction};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, Semaphore, mpsc};
use tracing::{debug, error, info};
use uuid::Uuid;

/// A unit of provider work
#[derive(Debug, Clone)]
pub struct DeploymentJob {
    pub deployment_id: Uuid,
    pub architecture_id: Uuid,
    /// Action requested when the job was queued
    pub action: StackAction,
    /// Diagram snapshot taken when the job was queued
    pub diagram: Diagram,
}

/// Executes jobs taken off a lane
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, job: DeploymentJob);
}

type Lanes = Arc<Mutex<HashMap<Uuid, mpsc::UnboundedSender<DeploymentJob>>>>;

#[derive(Default)]
struct QueueCounters {
    pending: AtomicUsize,
    completed: AtomicU64,
    panicked: AtomicU64,
    idle: Notify,
}

/// Per-architecture FIFO lanes on a bounded pool
pub struct DeploymentQueue {
    lanes: Lanes,
    permits: Arc<Semaphore>,
    runner: Arc<dyn JobRunner>,
    idle_timeout: Duration,
    counters: Arc<QueueCounters>,
}

impl DeploymentQueue {
    pub fn new(runner: Arc<dyn JobRunner>, workers: usize, idle_timeout: Duration) -> Self {
        let workers = workers.max(1);
        info!(
            "Deployment queue ready: {} workers, lanes retire after {:?} idle",
            workers, idle_timeout
        );
        Self {
            lanes: Arc::new(Mutex::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(workers)),
            runner,
            idle_timeout,
            counters: Arc::new(QueueCounters::default()),
        }
    }

    /// Append a job to its architecture's lane, opening the lane if needed
    pub async fn submit(&self, job: DeploymentJob) {
        let architecture_id = job.architecture_id;
        self.counters.pending.fetch_add(1, Ordering::SeqCst);

        let mut lanes = self.lanes.lock().await;
        let job = match lanes.get(&architecture_id) {
            Some(sender) => match sender.send(job) {
                Ok(()) => {
                    debug!(%architecture_id, "Job appended to existing lane");
                    return;
                }
                // Lane exited without deregistering; replace it
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        // A fresh receiver is alive, so this send cannot fail
        let _ = sender.send(job);
        lanes.insert(architecture_id, sender);
        debug!(%architecture_id, "Opened deployment lane");

        tokio::spawn(run_lane(
            architecture_id,
            receiver,
            self.lanes.clone(),
            self.permits.clone(),
            self.runner.clone(),
            self.idle_timeout,
            self.counters.clone(),
        ));
    }

    /// Number of lanes currently open
    pub async fn active_lanes(&self) -> usize {
        self.lanes.lock().await.len()
    }

    /// Jobs submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.counters.completed.load(Ordering::SeqCst)
    }

    /// Jobs that panicked instead of finishing
    pub fn panicked(&self) -> u64 {
        self.counters.panicked.load(Ordering::SeqCst)
    }

    /// Wait until every submitted job has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn run_lane(
    architecture_id: Uuid,
    mut receiver: mpsc::UnboundedReceiver<DeploymentJob>,
    lanes: Lanes,
    permits: Arc<Semaphore>,
    runner: Arc<dyn JobRunner>,
    idle_timeout: Duration,
    counters: Arc<QueueCounters>,
) {
    loop {
        let job = match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => {
                // Retire under the map lock so no submit can slip in unseen
                let mut lanes = lanes.lock().await;
                match receiver.try_recv() {
                    Ok(job) => job,
                    Err(_) => {
                        lanes.remove(&architecture_id);
                        debug!(%architecture_id, "Retired idle deployment lane");
                        break;
                    }
                }
            }
        };

        let deployment_id = job.deployment_id;
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(%architecture_id, "Worker pool closed, dropping lane");
                break;
            }
        };

        // Run in its own task so a panicking job cannot take the lane down
        let task_runner = runner.clone();
        let outcome = tokio::spawn(async move { task_runner.run(job).await }).await;
        drop(permit);

        if let Err(e) = outcome {
            counters.panicked.fetch_add(1, Ordering::SeqCst);
            error!(%architecture_id, %deployment_id, error = %e, "Deployment job aborted");
        }
        counters.completed.fetch_add(1, Ordering::SeqCst);
        if counters.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            counters.idle.notify_waiters();
        }
    }
}
