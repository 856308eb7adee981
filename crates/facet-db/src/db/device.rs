use facet_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::rows::DeviceRow;

/// Repository for field devices.
///
/// Devices self-register: the first request naming a device creates it,
/// later requests just refresh `last_seen_at`.
#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "devices", db.operation = "upsert"))]
    pub async fn get_or_create(&self, org_id: Uuid, name: &str) -> Result<DeviceRow, AppError> {
        let device = sqlx::query_as::<Postgres, DeviceRow>(
            r#"
            INSERT INTO devices (org_id, name)
            VALUES ($1, $2)
            ON CONFLICT (org_id, name) DO UPDATE SET last_seen_at = NOW()
            RETURNING id, org_id, name, last_seen_at, created_at
            "#,
        )
        .bind(org_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(device)
    }
}
