//! Row types returned by the repositories.
//!
//! Lifecycle status and image type are stored as TEXT and parsed into the
//! domain enums at the repository boundary; an unparseable value is an
//! internal error, never a client-facing one.

use chrono::{DateTime, Utc};
use facet_core::models::{ImageType, JobStatus};
use facet_core::AppError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct OrgRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub device_id: Option<Uuid>,
    pub status: String,
    pub external_ref: Option<String>,
    pub client_job_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobRow {
    pub fn status(&self) -> Result<JobStatus, AppError> {
        JobStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!(
                "Job {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RingRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub ring_label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DiamondRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub ring_id: Uuid,
    pub slot_index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DiamondImageRow {
    pub id: Uuid,
    pub diamond_id: Uuid,
    pub image_type: String,
    pub storage_path: String,
    pub preview_storage_path: Option<String>,
    pub preview_ready: bool,
    pub original_ready: bool,
    pub original_uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DiamondImageRow {
    pub fn image_type(&self) -> Result<ImageType, AppError> {
        ImageType::parse(&self.image_type).ok_or_else(|| {
            AppError::Internal(format!(
                "Diamond image {} has unknown image_type '{}'",
                self.id, self.image_type
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_row(status: &str) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            device_id: None,
            status: status.to_string(),
            external_ref: None,
            client_job_id: None,
            started_at: None,
            paused_at: None,
            ended_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_job_status_parses_stored_text() {
        assert_eq!(job_row("SCANNING").status().unwrap(), JobStatus::Scanning);
        assert_eq!(
            job_row("PROCESSING").status().unwrap(),
            JobStatus::Processing
        );
        assert!(job_row("scanning").status().is_err());
    }
}
