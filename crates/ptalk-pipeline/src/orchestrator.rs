//! Job queue and background worker.
//!
//! One unbounded FIFO channel, one consumer task. Enqueue never blocks on
//! downstream work; jobs run strictly in arrival order. Shutdown is
//! cooperative through a watch channel and can cancel an in-flight job at
//! its next await point; the cancelled job writes no terminal status.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ptalk_models::AudioJob;

use crate::error::{PipelineError, PipelineResult};
use crate::processor::{process_job, PipelineContext};

/// Single-consumer pipeline orchestrator.
pub struct Orchestrator {
    ctx: Arc<PipelineContext>,
    tx: mpsc::UnboundedSender<AudioJob>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<AudioJob>>>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    depth: Arc<AtomicUsize>,
}

impl Orchestrator {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        Self {
            ctx,
            tx,
            rx: Mutex::new(Some(rx)),
            shutdown,
            worker: Mutex::new(None),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Push a job onto the queue. Returns immediately.
    pub fn enqueue(&self, job: AudioJob) -> PipelineResult<()> {
        let session_id = job.session_id.clone();
        self.tx
            .send(job)
            .map_err(|_| PipelineError::dispatch("Job queue is closed"))?;

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("ptalk_queue_depth").set(depth as f64);
        metrics::counter!("ptalk_jobs_enqueued_total").increment(1);
        info!(session_id = %session_id, queue_depth = depth, "Job enqueued");
        Ok(())
    }

    /// Number of jobs waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Spawn the worker task. Idempotent after the first call: the receiver
    /// is consumed once.
    pub async fn start(&self) {
        let Some(mut rx) = self.rx.lock().await.take() else {
            warn!("Worker already started");
            return;
        };

        let ctx = Arc::clone(&self.ctx);
        let depth = Arc::clone(&self.depth);
        let mut shutdown_rx = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            info!("Pipeline worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Shutdown signal received, stopping worker");
                            break;
                        }
                    }
                    maybe_job = rx.recv() => {
                        let Some(job) = maybe_job else {
                            info!("Job queue closed, stopping worker");
                            break;
                        };
                        let new_depth = depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
                        metrics::gauge!("ptalk_queue_depth").set(new_depth as f64);

                        // Racing the job against shutdown lets stop() cancel
                        // an in-flight job at its next await point.
                        tokio::select! {
                            _ = process_job(Arc::clone(&ctx), job) => {}
                            _ = shutdown_rx.changed() => {
                                if *shutdown_rx.borrow() {
                                    warn!("Shutdown during job processing, abandoning job");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            info!("Pipeline worker stopped");
        });

        *self.worker.lock().await = Some(handle);
    }

    /// Signal shutdown and wait for the worker to exit.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task did not shut down cleanly");
            }
        }
    }

    /// Whether the worker task is alive. Used by the health endpoint.
    pub async fn worker_alive(&self) -> bool {
        match self.worker.lock().await.as_ref() {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }
}
