use facet_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::rows::RingRow;

/// Repository for ring batches.
#[derive(Clone)]
pub struct RingRepository {
    pool: PgPool,
}

impl RingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert on (job_id, ring_label) so replayed ingests converge on the
    /// same ring row. The no-op DO UPDATE makes RETURNING always yield a row.
    #[tracing::instrument(skip(self), fields(db.table = "rings", db.operation = "upsert"))]
    pub async fn get_or_create(&self, job_id: Uuid, ring_label: &str) -> Result<RingRow, AppError> {
        let ring = sqlx::query_as::<Postgres, RingRow>(
            r#"
            INSERT INTO rings (job_id, ring_label)
            VALUES ($1, $2)
            ON CONFLICT (job_id, ring_label) DO UPDATE SET ring_label = EXCLUDED.ring_label
            RETURNING id, job_id, ring_label, created_at
            "#,
        )
        .bind(job_id)
        .bind(ring_label)
        .fetch_one(&self.pool)
        .await?;

        Ok(ring)
    }

    #[tracing::instrument(skip(self), fields(db.table = "rings", db.operation = "select"))]
    pub async fn find(&self, job_id: Uuid, ring_label: &str) -> Result<Option<RingRow>, AppError> {
        let ring = sqlx::query_as::<Postgres, RingRow>(
            "SELECT id, job_id, ring_label, created_at FROM rings WHERE job_id = $1 AND ring_label = $2",
        )
        .bind(job_id)
        .bind(ring_label)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ring)
    }
}
