use facet_core::AppError;
use sqlx::{PgPool, Postgres};

use super::rows::OrgRow;

/// Repository for organizations
#[derive(Clone)]
pub struct OrgRepository {
    pool: PgPool,
}

impl OrgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "orgs", db.operation = "select"))]
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<OrgRow>, AppError> {
        let org = sqlx::query_as::<Postgres, OrgRow>(
            "SELECT id, slug, name, created_at FROM orgs WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    /// Resolve a slug or fail with a client-facing 404.
    pub async fn require_by_slug(&self, slug: &str) -> Result<OrgRow, AppError> {
        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Organization '{}' not found", slug)))
    }

    /// Used by the provisioning tool, never by request handlers.
    #[tracing::instrument(skip(self), fields(db.table = "orgs", db.operation = "insert"))]
    pub async fn create(&self, slug: &str, name: &str) -> Result<OrgRow, AppError> {
        let org = sqlx::query_as::<Postgres, OrgRow>(
            r#"
            INSERT INTO orgs (slug, name)
            VALUES ($1, $2)
            RETURNING id, slug, name, created_at
            "#,
        )
        .bind(slug)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(org)
    }
}
