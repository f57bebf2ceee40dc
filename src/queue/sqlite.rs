//! SQLite-backed durable job queue (C6, §4.6).
//!
//! Jobs are claimed with an atomic `UPDATE ... RETURNING`, leased for
//! `lease_secs`, and renewed by periodic heartbeats; a sweeper reclaims leases
//! that expire without a heartbeat so a crashed worker never parks a job
//! forever in `active`.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{DubError, Result};

use super::model::{Job, JobData, JobResultData, JobState, JOB_NAME};

pub struct JobQueue {
    pool: SqlitePool,
}

impl JobQueue {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let queue = Self { pool };
        queue.migrate().await?;
        Ok(queue)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'queued',
                progress INTEGER NOT NULL DEFAULT 0,
                result TEXT,
                failure TEXT,
                leased_until TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Enqueues a new job and returns its id.
    pub async fn enqueue(&self, data: &JobData) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let data_json = serde_json::to_string(data)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO jobs (id, name, data, state, progress, created_at) \
             VALUES (?, ?, ?, 'queued', 0, ?)",
        )
        .bind(id.to_string())
        .bind(JOB_NAME)
        .bind(data_json)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Atomically claims the oldest queued job and leases it for `lease_secs`.
    ///
    /// The claim itself is the conditional `UPDATE ... AND state = 'queued'`:
    /// with `WORKER_CONCURRENCY>1` or multiple worker processes sharing one
    /// `DATABASE_URL`, two callers can race to claim the same id between the
    /// `SELECT` and the `UPDATE`. Only the update whose `WHERE` still matches
    /// `state = 'queued'` affects a row; the loser sees `rows_affected() == 0`
    /// and loops to try the next candidate instead of returning a job someone
    /// else already claimed.
    pub async fn claim_next(&self, lease_secs: i64) -> Result<Option<Job>> {
        let leased_until = (Utc::now() + chrono::Duration::seconds(lease_secs)).to_rfc3339();

        loop {
            let row = sqlx::query(
                "SELECT id FROM jobs WHERE state = 'queued' ORDER BY created_at ASC LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };
            let id: String = row.try_get("id")?;

            let result = sqlx::query(
                "UPDATE jobs SET state = 'active', leased_until = ? WHERE id = ? AND state = 'queued'",
            )
            .bind(&leased_until)
            .bind(&id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return self.get(&id).await;
            }
        }
    }

    /// Renews a lease so a long-running job isn't reclaimed mid-flight.
    pub async fn heartbeat(&self, id: &Uuid, lease_secs: i64) -> Result<()> {
        let leased_until = (Utc::now() + chrono::Duration::seconds(lease_secs)).to_rfc3339();
        sqlx::query("UPDATE jobs SET leased_until = ? WHERE id = ? AND state = 'active'")
            .bind(leased_until)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_progress(&self, id: &Uuid, progress: u8) -> Result<()> {
        sqlx::query("UPDATE jobs SET progress = ? WHERE id = ?")
            .bind(progress as i64)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn complete(&self, id: &Uuid, result: &JobResultData) -> Result<()> {
        let result_json = serde_json::to_string(result)?;
        sqlx::query(
            "UPDATE jobs SET state = 'completed', progress = 100, result = ?, leased_until = NULL WHERE id = ?",
        )
        .bind(result_json)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(&self, id: &Uuid, message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET state = 'failed', failure = ?, leased_until = NULL WHERE id = ?",
        )
        .bind(message)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reclaims jobs whose lease has expired without a heartbeat, returning
    /// them to `queued` so another worker can pick them up.
    pub async fn sweep_expired_leases(&self) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let res = sqlx::query(
            "UPDATE jobs SET state = 'queued', leased_until = NULL \
             WHERE state = 'active' AND leased_until IS NOT NULL AND leased_until < ?",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(
            "SELECT id, name, data, state, progress, result, failure, created_at FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(row_to_job(row)?))
    }

    pub async fn get_by_uuid(&self, id: &Uuid) -> Result<Job> {
        self.get(&id.to_string())
            .await?
            .ok_or_else(|| DubError::JobNotFound(id.to_string()))
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> Result<Job> {
    let id: String = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let data_json: String = row.try_get("data")?;
    let state: String = row.try_get("state")?;
    let progress: i64 = row.try_get("progress")?;
    let result_json: Option<String> = row.try_get("result")?;
    let failure: Option<String> = row.try_get("failure")?;
    let created_at: String = row.try_get("created_at")?;

    let data: JobData = serde_json::from_str(&data_json)?;
    let result = result_json
        .map(|s| serde_json::from_str::<JobResultData>(&s))
        .transpose()?;

    Ok(Job {
        id: Uuid::parse_str(&id).map_err(|e| DubError::Queue(sqlx::Error::Decode(Box::new(e))))?,
        name,
        data,
        state: JobState::parse(&state),
        progress: progress as u8,
        result,
        failure,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn test_queue() -> JobQueue {
        JobQueue::connect("sqlite::memory:").await.unwrap()
    }

    fn sample_data() -> JobData {
        JobData {
            source_path: "/tmp/clip.mp4".to_string(),
            original_filename: "clip.mp4".to_string(),
            merge_mode: None,
            burn_subtitles: None,
            enhance: None,
        }
    }

    #[tokio::test]
    async fn enqueue_and_claim_round_trip() {
        let queue = test_queue().await;
        let id = queue.enqueue(&sample_data()).await.unwrap();

        let claimed = queue.claim_next(60).await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.state, JobState::Active);

        let unclaimed = queue.claim_next(60).await.unwrap();
        assert!(unclaimed.is_none());
    }

    #[tokio::test]
    async fn complete_persists_result_and_progress() {
        let queue = test_queue().await;
        let id = queue.enqueue(&sample_data()).await.unwrap();
        queue.claim_next(60).await.unwrap();

        let result = JobResultData {
            dubbed: Some("/tmp/clip-dubbed.mp4".to_string()),
            ..Default::default()
        };
        queue.complete(&id, &result).await.unwrap();

        let job = queue.get_by_uuid(&id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result.unwrap().dubbed.as_deref(), Some("/tmp/clip-dubbed.mp4"));
    }

    #[tokio::test]
    async fn fail_records_failure_message() {
        let queue = test_queue().await;
        let id = queue.enqueue(&sample_data()).await.unwrap();
        queue.claim_next(60).await.unwrap();
        queue.fail(&id, "boom").await.unwrap();

        let job = queue.get_by_uuid(&id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.failure.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn concurrent_claims_never_return_the_same_job_twice() {
        let queue = Arc::new(test_queue().await);
        let id = queue.enqueue(&sample_data()).await.unwrap();

        let a = queue.clone();
        let b = queue.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.claim_next(60).await.unwrap() }),
            tokio::spawn(async move { b.claim_next(60).await.unwrap() }),
        );
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        let claimed: Vec<_> = [ra, rb].into_iter().flatten().collect();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, id);
    }

    #[tokio::test]
    async fn sweep_reclaims_expired_leases() {
        let queue = test_queue().await;
        let id = queue.enqueue(&sample_data()).await.unwrap();
        // lease in the past
        queue.claim_next(-1).await.unwrap();

        let reclaimed = queue.sweep_expired_leases().await.unwrap();
        assert_eq!(reclaimed, 1);

        let job = queue.get_by_uuid(&id).await.unwrap();
        assert_eq!(job.state, JobState::Queued);
    }

    #[tokio::test]
    async fn get_by_uuid_errors_for_unknown_id() {
        let queue = test_queue().await;
        let err = queue.get_by_uuid(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DubError::JobNotFound(_)));
    }
}
