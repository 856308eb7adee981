use facet_core::models::{JobAction, JobStatus};
use facet_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::rows::JobRow;

const JOB_COLUMNS: &str = "id, org_id, device_id, status, external_ref, client_job_id, \
     started_at, paused_at, ended_at, created_at";

/// Repository for scan jobs.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Jobs start scanning immediately; there is no idle CREATED phase on
    /// the server side.
    ///
    /// `client_job_id` is the caller's idempotency key: a start replayed
    /// with the same key returns the job the first attempt created. The
    /// no-op update lets RETURNING yield that existing row. NULL keys never
    /// collide, so keyless starts always create.
    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "insert"))]
    pub async fn create(
        &self,
        org_id: Uuid,
        device_id: Option<Uuid>,
        external_ref: Option<&str>,
        client_job_id: Option<Uuid>,
    ) -> Result<JobRow, AppError> {
        let job = sqlx::query_as::<Postgres, JobRow>(&format!(
            r#"
            INSERT INTO jobs (org_id, device_id, status, external_ref, client_job_id, started_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (org_id, client_job_id)
            DO UPDATE SET client_job_id = EXCLUDED.client_job_id
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(org_id)
        .bind(device_id)
        .bind(JobStatus::Scanning.as_str())
        .bind(external_ref)
        .bind(client_job_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "select", db.record_id = %id))]
    pub async fn find(&self, id: Uuid) -> Result<Option<JobRow>, AppError> {
        let job = sqlx::query_as::<Postgres, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Apply a lifecycle action as one guarded UPDATE. The status predicate
    /// makes concurrent actions race safely: exactly one wins, the loser
    /// sees zero rows and reports the conflict.
    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "update", db.record_id = %id))]
    pub async fn apply_action(&self, id: Uuid, action: JobAction) -> Result<JobRow, AppError> {
        let allowed: Vec<String> = action
            .allowed_from()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let timestamp_clause = match action {
            JobAction::Pause => "paused_at = NOW()",
            JobAction::Resume => "paused_at = NULL",
            JobAction::Stop => "ended_at = NOW()",
        };

        let job = sqlx::query_as::<Postgres, JobRow>(&format!(
            r#"
            UPDATE jobs SET status = $1, {timestamp_clause}
            WHERE id = $2 AND status = ANY($3)
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(action.target().as_str())
        .bind(id)
        .bind(&allowed)
        .fetch_optional(&self.pool)
        .await?;

        job.ok_or_else(|| {
            AppError::job_not_accepting(format!(
                "Job {} cannot {} from its current status",
                id,
                action.as_str()
            ))
        })
    }
}
