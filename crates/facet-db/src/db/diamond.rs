use facet_core::models::ImageType;
use facet_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::rows::{DiamondImageRow, DiamondRow};

const IMAGE_COLUMNS: &str = "id, diamond_id, image_type, storage_path, preview_storage_path, \
     preview_ready, original_ready, original_uploaded_at, created_at";

/// Image data recorded alongside a new diamond.
#[derive(Debug, Clone)]
pub struct NewDiamondImage {
    pub image_type: ImageType,
    pub storage_path: String,
    pub preview_storage_path: Option<String>,
    pub preview_ready: bool,
}

/// Repository for diamonds and their per-type image rows.
#[derive(Clone)]
pub struct DiamondRepository {
    pool: PgPool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

impl DiamondRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a diamond and its image rows in one transaction.
    ///
    /// The unique constraint on (job_id, ring_id, slot_index) is the
    /// idempotency guard: a replayed ingest hits it and surfaces as a
    /// DIAMOND_EXISTS conflict with nothing partially written.
    #[tracing::instrument(skip(self, images), fields(db.table = "diamonds", db.operation = "insert"))]
    pub async fn create_with_images(
        &self,
        job_id: Uuid,
        ring_id: Uuid,
        slot_index: i32,
        images: &[NewDiamondImage],
    ) -> Result<DiamondRow, AppError> {
        let mut tx = self.pool.begin().await?;

        let insert_result = sqlx::query_as::<Postgres, DiamondRow>(
            r#"
            INSERT INTO diamonds (job_id, ring_id, slot_index)
            VALUES ($1, $2, $3)
            RETURNING id, job_id, ring_id, slot_index, created_at
            "#,
        )
        .bind(job_id)
        .bind(ring_id)
        .bind(slot_index)
        .fetch_one(&mut *tx)
        .await;

        let diamond = match insert_result {
            Ok(diamond) => diamond,
            Err(ref e) if is_unique_violation(e) => {
                tx.rollback().await?;
                return Err(AppError::diamond_exists(format!(
                    "Diamond already recorded for ring {} slot {}",
                    ring_id, slot_index
                )));
            }
            Err(e) => return Err(e.into()),
        };

        for image in images {
            sqlx::query(
                r#"
                INSERT INTO diamond_images
                    (diamond_id, image_type, storage_path, preview_storage_path, preview_ready)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(diamond.id)
            .bind(image.image_type.as_str())
            .bind(&image.storage_path)
            .bind(&image.preview_storage_path)
            .bind(image.preview_ready)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(diamond)
    }

    #[tracing::instrument(skip(self), fields(db.table = "diamonds", db.operation = "select"))]
    pub async fn find_by_coordinate(
        &self,
        job_id: Uuid,
        ring_id: Uuid,
        slot_index: i32,
    ) -> Result<Option<DiamondRow>, AppError> {
        let diamond = sqlx::query_as::<Postgres, DiamondRow>(
            r#"
            SELECT id, job_id, ring_id, slot_index, created_at
            FROM diamonds
            WHERE job_id = $1 AND ring_id = $2 AND slot_index = $3
            "#,
        )
        .bind(job_id)
        .bind(ring_id)
        .bind(slot_index)
        .fetch_optional(&self.pool)
        .await?;

        Ok(diamond)
    }

    #[tracing::instrument(skip(self), fields(db.table = "diamond_images", db.operation = "select"))]
    pub async fn images_for(&self, diamond_id: Uuid) -> Result<Vec<DiamondImageRow>, AppError> {
        let images = sqlx::query_as::<Postgres, DiamondImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM diamond_images WHERE diamond_id = $1 ORDER BY image_type",
        ))
        .bind(diamond_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    #[tracing::instrument(skip(self), fields(db.table = "diamond_images", db.operation = "select"))]
    pub async fn image_for(
        &self,
        diamond_id: Uuid,
        image_type: ImageType,
    ) -> Result<Option<DiamondImageRow>, AppError> {
        let image = sqlx::query_as::<Postgres, DiamondImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM diamond_images WHERE diamond_id = $1 AND image_type = $2",
        ))
        .bind(diamond_id)
        .bind(image_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    /// Flip `original_ready` after the storage oracle has confirmed the
    /// object. Monotonic: re-running never clears the flag and keeps the
    /// first upload timestamp.
    #[tracing::instrument(skip(self), fields(db.table = "diamond_images", db.operation = "update"))]
    pub async fn mark_original_ready(
        &self,
        diamond_id: Uuid,
        image_type: ImageType,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE diamond_images
            SET original_ready = TRUE,
                original_uploaded_at = COALESCE(original_uploaded_at, NOW())
            WHERE diamond_id = $1 AND image_type = $2
            "#,
        )
        .bind(diamond_id)
        .bind(image_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
