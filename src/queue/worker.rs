//! Worker loop (C6): claims `process-video` jobs and runs them through the
//! pipeline engine, reporting progress back to the queue best-effort.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::{PipelineEngine, ProgressSink};

use super::model::{Job, JobResultData, JOB_NAME};
use super::sqlite::JobQueue;

struct QueueProgressSink {
    queue: Arc<JobQueue>,
    job_id: Uuid,
}

#[async_trait]
impl ProgressSink for QueueProgressSink {
    async fn report(&self, progress: u8) {
        if let Err(e) = self.queue.set_progress(&self.job_id, progress).await {
            warn!(job_id = %self.job_id, error = %e, "failed to persist progress");
        }
    }
}

/// Polls for queued jobs until cancelled, executing at most one at a time per
/// worker task; run several of these concurrently for §6's `WORKER_CONCURRENCY`.
pub async fn run_worker_loop(
    queue: Arc<JobQueue>,
    engine: Arc<PipelineEngine>,
    lease_secs: i64,
    poll_interval: Duration,
) {
    loop {
        match queue.claim_next(lease_secs).await {
            Ok(Some(job)) => {
                process_job(&queue, &engine, job, lease_secs).await;
            }
            Ok(None) => {
                tokio::time::sleep(poll_interval).await;
            }
            Err(e) => {
                error!(error = %e, "failed to claim next job");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

async fn process_job(queue: &Arc<JobQueue>, engine: &Arc<PipelineEngine>, job: Job, lease_secs: i64) {
    if job.name != JOB_NAME {
        warn!(job_id = %job.id, name = %job.name, "rejecting unknown job name");
        let _ = queue.fail(&job.id, &format!("unknown job name: {}", job.name)).await;
        return;
    }

    info!(job_id = %job.id, "starting job");

    let heartbeat_queue = queue.clone();
    let heartbeat_id = job.id;
    let heartbeat = tokio::spawn(async move {
        let interval = Duration::from_secs((lease_secs / 2).max(1) as u64);
        loop {
            tokio::time::sleep(interval).await;
            if heartbeat_queue.heartbeat(&heartbeat_id, lease_secs).await.is_err() {
                break;
            }
        }
    });

    let sink = QueueProgressSink {
        queue: queue.clone(),
        job_id: job.id,
    };
    let input = job.data.clone().into_input();
    let outcome = engine.run(&input, &sink).await;
    heartbeat.abort();

    match outcome {
        Ok(result) => {
            let result_data = JobResultData::from(result);
            if let Err(e) = queue.complete(&job.id, &result_data).await {
                error!(job_id = %job.id, error = %e, "failed to persist job completion");
            } else {
                info!(job_id = %job.id, "job completed");
            }
        }
        Err(e) => {
            warn!(job_id = %job.id, error = %e, "job failed");
            let _ = queue.fail(&job.id, &e.to_string()).await;
        }
    }
}
