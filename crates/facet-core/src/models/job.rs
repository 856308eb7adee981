//! Job lifecycle state machine.
//!
//! ```text
//! CREATED --start--> SCANNING
//! SCANNING --pause--> PAUSED
//! PAUSED --resume--> SCANNING
//! SCANNING/PAUSED --stop--> PROCESSING
//! ```
//!
//! PROCESSING, DONE and FAILED are terminal for the ingestion protocol: once
//! a job leaves SCANNING/PAUSED, no further image ingestion is accepted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Scanning,
    Paused,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "CREATED",
            JobStatus::Scanning => "SCANNING",
            JobStatus::Paused => "PAUSED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(JobStatus::Created),
            "SCANNING" => Some(JobStatus::Scanning),
            "PAUSED" => Some(JobStatus::Paused),
            "PROCESSING" => Some(JobStatus::Processing),
            "DONE" => Some(JobStatus::Done),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether slot ingestion is accepted in this status.
    pub fn accepts_ingestion(&self) -> bool {
        matches!(self, JobStatus::Scanning | JobStatus::Paused)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A guarded lifecycle transition requested over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Pause,
    Resume,
    Stop,
}

impl JobAction {
    /// Statuses this action may transition from.
    pub fn allowed_from(&self) -> &'static [JobStatus] {
        match self {
            JobAction::Pause => &[JobStatus::Scanning],
            JobAction::Resume => &[JobStatus::Paused],
            JobAction::Stop => &[JobStatus::Scanning, JobStatus::Paused],
        }
    }

    /// Status this action transitions to.
    pub fn target(&self) -> JobStatus {
        match self {
            JobAction::Pause => JobStatus::Paused,
            JobAction::Resume => JobStatus::Scanning,
            JobAction::Stop => JobStatus::Processing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Pause => "pause",
            JobAction::Resume => "resume",
            JobAction::Stop => "stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Created,
            JobStatus::Scanning,
            JobStatus::Paused,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("STOPPED"), None);
    }

    #[test]
    fn test_ingestion_acceptance() {
        assert!(JobStatus::Scanning.accepts_ingestion());
        assert!(JobStatus::Paused.accepts_ingestion());
        assert!(!JobStatus::Processing.accepts_ingestion());
        assert!(!JobStatus::Done.accepts_ingestion());
        assert!(!JobStatus::Failed.accepts_ingestion());
    }

    #[test]
    fn test_transition_guards() {
        assert_eq!(JobAction::Pause.allowed_from(), &[JobStatus::Scanning]);
        assert_eq!(JobAction::Resume.allowed_from(), &[JobStatus::Paused]);
        assert!(JobAction::Stop.allowed_from().contains(&JobStatus::Paused));
        assert_eq!(JobAction::Stop.target(), JobStatus::Processing);
        // A stopped job can never be paused or resumed back into scanning.
        assert!(!JobAction::Resume
            .allowed_from()
            .contains(&JobStatus::Processing));
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&JobStatus::Scanning).unwrap();
        assert_eq!(json, "\"SCANNING\"");
    }
}
