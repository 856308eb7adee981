//! Offline-tolerant sync engine.
//!
//! Each queued slot task advances through a fixed sequence: upload previews,
//! record the slot in the ledger, upload originals, confirm originals
//! against the storage oracle. Progress flags are persisted after every
//! step, so a crash or connectivity loss resumes mid-slot instead of
//! redoing work.
//!
//! Failure policy per task:
//!   - retryable errors (transport, 5xx, 408, 429) stop the pass; the
//!     device is treated as offline and everything stays queued
//!   - DIAMOND_EXISTS on ingest is proof an earlier ingest landed; the
//!     task keeps going
//!   - any other terminal error kills the task but keeps it visible in
//!     the dead list
//!   - originals reported missing by the server leave the task queued for
//!     the next pass

use crate::api::DeviceApi;
use crate::queue::{QueueRow, SyncQueue, KIND_JOB_START, KIND_SLOT_SYNC};
use crate::scan::SlotCapture;
use anyhow::Result;
use bytes::Bytes;
use facet_api_client::ClientError;
use facet_core::models::{
    ConfirmOriginalsRequest, ImageKind, ImageType, IngestScanRequest, SignedUrlMode,
    SignedUrlsRequest, SignedUrlsResponse, StartJobRequest,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";

/// Payload for a queued job start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStartTask {
    pub org_slug: String,
    pub device_name: Option<String>,
    pub external_ref: Option<String>,
}

/// Payload for one queued slot. The progress flags record how far the
/// upload/ingest/confirm sequence got on previous passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSyncTask {
    pub org_slug: String,
    pub ring_label: String,
    pub slot_index: i32,
    pub device_name: Option<String>,
    pub uv_free_file: PathBuf,
    pub aset_file: PathBuf,
    #[serde(default)]
    pub previews_uploaded: bool,
    #[serde(default)]
    pub ingested: bool,
    #[serde(default)]
    pub originals_uploaded: bool,
}

/// Result of one sync pass over the queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOutcome {
    pub completed: usize,
    /// Tasks left pending for a later pass (originals not yet visible,
    /// or a signed upload that needs fresh URLs).
    pub deferred: usize,
    pub dead: usize,
    /// A retryable failure stopped the pass early.
    pub offline: bool,
}

enum TaskOutcome {
    Completed,
    StillPending(String),
    Dead(String),
    Offline(String),
}

/// Queue a job start plus one slot task per discovered capture pair.
///
/// Returns the temporary job id the tasks are queued under; the sync engine
/// remaps it to the server-issued id once the job start goes through.
pub async fn enqueue_job(
    queue: &SyncQueue,
    org_slug: &str,
    ring_label: &str,
    device_name: Option<&str>,
    external_ref: Option<&str>,
    slots: &[SlotCapture],
) -> Result<Uuid> {
    let temp_job_id = Uuid::new_v4();

    queue
        .push(
            KIND_JOB_START,
            temp_job_id,
            &JobStartTask {
                org_slug: org_slug.to_string(),
                device_name: device_name.map(String::from),
                external_ref: external_ref.map(String::from),
            },
        )
        .await?;

    for slot in slots {
        queue
            .push(
                KIND_SLOT_SYNC,
                temp_job_id,
                &SlotSyncTask {
                    org_slug: org_slug.to_string(),
                    ring_label: ring_label.to_string(),
                    slot_index: slot.slot_index,
                    device_name: device_name.map(String::from),
                    uv_free_file: slot.uv_free.clone(),
                    aset_file: slot.aset.clone(),
                    previews_uploaded: false,
                    ingested: false,
                    originals_uploaded: false,
                },
            )
            .await?;
    }

    tracing::info!(
        temp_job_id = %temp_job_id,
        slots = slots.len(),
        "Queued job start and slot tasks"
    );

    Ok(temp_job_id)
}

pub struct SyncEngine<'a, A: DeviceApi> {
    api: &'a A,
    queue: &'a SyncQueue,
}

impl<'a, A: DeviceApi> SyncEngine<'a, A> {
    pub fn new(api: &'a A, queue: &'a SyncQueue) -> Self {
        Self { api, queue }
    }

    /// Walk the queue once, in insertion order.
    pub async fn run_sync_pass(&self) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();
        let mut cursor = 0i64;

        loop {
            let Some(row) = self.queue.next_pending(cursor).await? else {
                break;
            };
            cursor = row.id;

            let task_outcome = match row.kind.as_str() {
                KIND_JOB_START => self.process_job_start(&row).await?,
                KIND_SLOT_SYNC => self.process_slot(&row).await?,
                other => TaskOutcome::Dead(format!("Unknown task kind '{}'", other)),
            };

            match task_outcome {
                TaskOutcome::Completed => {
                    self.queue.complete(row.id).await?;
                    outcome.completed += 1;
                }
                TaskOutcome::StillPending(reason) => {
                    tracing::debug!(task_id = row.id, reason = %reason, "Task deferred to next pass");
                    self.queue.bump_tries(row.id, &reason).await?;
                    outcome.deferred += 1;
                }
                TaskOutcome::Dead(reason) => {
                    tracing::warn!(task_id = row.id, kind = %row.kind, reason = %reason, "Task failed terminally");
                    self.queue.mark_dead(row.id, &reason).await?;
                    outcome.dead += 1;
                }
                TaskOutcome::Offline(reason) => {
                    tracing::info!(task_id = row.id, reason = %reason, "Server unreachable, stopping pass");
                    self.queue.bump_tries(row.id, &reason).await?;
                    outcome.offline = true;
                    break;
                }
            }
        }

        Ok(outcome)
    }

    async fn process_job_start(&self, row: &QueueRow) -> Result<TaskOutcome> {
        let task: JobStartTask = match serde_json::from_str(&row.payload) {
            Ok(task) => task,
            Err(e) => return Ok(TaskOutcome::Dead(format!("Corrupt payload: {}", e))),
        };
        let temp_job_id = match row.job_uuid() {
            Ok(id) => id,
            Err(e) => return Ok(TaskOutcome::Dead(e.to_string())),
        };

        let request = StartJobRequest {
            org_slug: task.org_slug,
            device_name: task.device_name,
            external_ref: task.external_ref,
            // The temp id doubles as the idempotency key: a start replayed
            // after a crash between the API call and the remap gets the
            // same server-side job back instead of creating a second one.
            client_job_id: Some(temp_job_id),
        };

        match self.api.start_job(&request).await {
            Ok(response) => {
                let remapped = self
                    .queue
                    .remap_job_id(temp_job_id, response.job_id)
                    .await?;
                tracing::info!(
                    temp_job_id = %temp_job_id,
                    job_id = %response.job_id,
                    remapped_tasks = remapped,
                    "Job started, queued tasks remapped"
                );
                Ok(TaskOutcome::Completed)
            }
            Err(e) if e.is_retryable() => Ok(TaskOutcome::Offline(e.to_string())),
            Err(e) => Ok(TaskOutcome::Dead(e.to_string())),
        }
    }

    async fn process_slot(&self, row: &QueueRow) -> Result<TaskOutcome> {
        let mut task: SlotSyncTask = match serde_json::from_str(&row.payload) {
            Ok(task) => task,
            Err(e) => return Ok(TaskOutcome::Dead(format!("Corrupt payload: {}", e))),
        };
        let job_id = match row.job_uuid() {
            Ok(id) => id,
            Err(e) => return Ok(TaskOutcome::Dead(e.to_string())),
        };

        if !(task.previews_uploaded && task.ingested && task.originals_uploaded) {
            // URLs are re-issued every pass; they are short-lived and
            // issuance has no server-side effect.
            let urls = match self
                .api
                .signed_urls(&SignedUrlsRequest {
                    org_slug: task.org_slug.clone(),
                    job_id,
                    ring_label: task.ring_label.clone(),
                    slot_index: task.slot_index,
                    mode: SignedUrlMode::Both,
                })
                .await
            {
                Ok(urls) => urls,
                Err(e) if e.is_retryable() => return Ok(TaskOutcome::Offline(e.to_string())),
                Err(e) => return Ok(TaskOutcome::Dead(e.to_string())),
            };

            if !task.previews_uploaded {
                if let Err(outcome) = self
                    .upload_kind(&urls, ImageKind::UvFreeThumb, &task.uv_free_file)
                    .await
                {
                    return Ok(outcome);
                }
                if let Err(outcome) = self
                    .upload_kind(&urls, ImageKind::AsetThumb, &task.aset_file)
                    .await
                {
                    return Ok(outcome);
                }
                task.previews_uploaded = true;
                self.queue.update_payload(row.id, &task).await?;
            }

            if !task.ingested {
                let request = match build_ingest_request(&task, job_id, &urls) {
                    Ok(request) => request,
                    Err(reason) => return Ok(TaskOutcome::Dead(reason)),
                };

                match self.api.ingest_scan(&request).await {
                    Ok(response) => {
                        tracing::info!(
                            diamond_id = %response.diamond_id,
                            slot_index = task.slot_index,
                            "Slot recorded"
                        );
                    }
                    Err(e) if e.code() == Some("DIAMOND_EXISTS") => {
                        // An earlier pass already recorded this slot.
                        tracing::info!(
                            slot_index = task.slot_index,
                            "Slot already recorded, continuing"
                        );
                    }
                    Err(e) if e.is_retryable() => return Ok(TaskOutcome::Offline(e.to_string())),
                    Err(e) => return Ok(TaskOutcome::Dead(e.to_string())),
                }
                task.ingested = true;
                self.queue.update_payload(row.id, &task).await?;
            }

            if !task.originals_uploaded {
                if let Err(outcome) = self
                    .upload_kind(&urls, ImageKind::UvFree, &task.uv_free_file)
                    .await
                {
                    return Ok(outcome);
                }
                if let Err(outcome) = self
                    .upload_kind(&urls, ImageKind::Aset, &task.aset_file)
                    .await
                {
                    return Ok(outcome);
                }
                task.originals_uploaded = true;
                self.queue.update_payload(row.id, &task).await?;
            }
        }

        let request = ConfirmOriginalsRequest {
            org_slug: task.org_slug.clone(),
            job_id,
            ring_label: task.ring_label.clone(),
            slot_index: task.slot_index,
            image_types: vec![ImageType::UvFree, ImageType::Aset],
        };

        match self.api.confirm_originals(&request).await {
            Ok(response) if response.missing.is_empty() => Ok(TaskOutcome::Completed),
            Ok(response) => Ok(TaskOutcome::StillPending(format!(
                "{} original(s) not yet visible in storage",
                response.missing.len()
            ))),
            Err(e) if e.is_retryable() => Ok(TaskOutcome::Offline(e.to_string())),
            Err(e) => Ok(TaskOutcome::Dead(e.to_string())),
        }
    }

    /// Upload one local file to its signed URL. A signed PUT rejection
    /// (expired signature and the like) heals with fresh URLs on the next
    /// pass, so it defers rather than kills the task.
    async fn upload_kind(
        &self,
        urls: &SignedUrlsResponse,
        kind: ImageKind,
        file: &Path,
    ) -> std::result::Result<(), TaskOutcome> {
        let Some(upload) = urls.upload_for(kind) else {
            return Err(TaskOutcome::Dead(format!(
                "Server issued no {} upload URL",
                kind.suffix()
            )));
        };

        let data = match tokio::fs::read(file).await {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                return Err(TaskOutcome::Dead(format!(
                    "Cannot read capture file {}: {}",
                    file.display(),
                    e
                )))
            }
        };

        match self
            .api
            .upload(&upload.signed_url, data, UPLOAD_CONTENT_TYPE)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_retryable() => Err(TaskOutcome::Offline(e.to_string())),
            Err(e) => Err(TaskOutcome::StillPending(format!(
                "Signed upload for {} rejected: {}",
                kind.suffix(),
                e
            ))),
        }
    }
}

fn build_ingest_request(
    task: &SlotSyncTask,
    job_id: Uuid,
    urls: &SignedUrlsResponse,
) -> std::result::Result<IngestScanRequest, String> {
    let path_for = |kind: ImageKind| {
        urls.upload_for(kind)
            .map(|u| u.path.clone())
            .ok_or_else(|| format!("Server issued no {} path", kind.suffix()))
    };

    Ok(IngestScanRequest {
        org_slug: task.org_slug.clone(),
        job_id,
        ring_label: task.ring_label.clone(),
        slot_index: task.slot_index,
        device_name: task.device_name.clone(),
        uv_free_path: path_for(ImageKind::UvFree)?,
        aset_path: path_for(ImageKind::Aset)?,
        uv_free_preview_path: Some(path_for(ImageKind::UvFreeThumb)?),
        aset_preview_path: Some(path_for(ImageKind::AsetThumb)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use facet_core::models::{
        ConfirmOriginalsResponse, IngestScanResponse, JobStatus, SignedUpload, StartJobResponse,
    };
    use facet_core::paths::SlotPaths;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn retryable_error() -> ClientError {
        ClientError::Status {
            status: 503,
            code: None,
            message: "service unavailable".to_string(),
        }
    }

    fn conflict(code: &str) -> ClientError {
        ClientError::Status {
            status: 409,
            code: Some(code.to_string()),
            message: "conflict".to_string(),
        }
    }

    #[derive(Default)]
    struct FakeApi {
        real_job_id: Option<Uuid>,
        last_start: Mutex<Option<StartJobRequest>>,
        signed_urls_errors: Mutex<VecDeque<ClientError>>,
        ingest_errors: Mutex<VecDeque<ClientError>>,
        confirm_missing: Mutex<VecDeque<Vec<ImageType>>>,
        uploads: Mutex<Vec<String>>,
        last_ingest: Mutex<Option<IngestScanRequest>>,
    }

    impl FakeApi {
        fn with_job(job_id: Uuid) -> Self {
            FakeApi {
                real_job_id: Some(job_id),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DeviceApi for FakeApi {
        async fn start_job(
            &self,
            request: &StartJobRequest,
        ) -> Result<StartJobResponse, ClientError> {
            *self.last_start.lock().unwrap() = Some(request.clone());
            Ok(StartJobResponse {
                job_id: self.real_job_id.unwrap(),
                status: JobStatus::Scanning,
            })
        }

        async fn signed_urls(
            &self,
            request: &SignedUrlsRequest,
        ) -> Result<SignedUrlsResponse, ClientError> {
            if let Some(err) = self.signed_urls_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            let paths = SlotPaths::for_slot(
                &request.org_slug,
                request.job_id,
                &request.ring_label,
                request.slot_index,
            );
            let uploads = ImageKind::ALL
                .into_iter()
                .filter(|kind| request.mode.includes(*kind))
                .map(|kind| SignedUpload {
                    kind,
                    path: paths.for_kind(kind).to_string(),
                    signed_url: format!("https://signed.test/{}", paths.for_kind(kind)),
                })
                .collect();
            Ok(SignedUrlsResponse {
                job_id: request.job_id,
                uploads,
            })
        }

        async fn ingest_scan(
            &self,
            request: &IngestScanRequest,
        ) -> Result<IngestScanResponse, ClientError> {
            *self.last_ingest.lock().unwrap() = Some(request.clone());
            if let Some(err) = self.ingest_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(IngestScanResponse {
                job_id: request.job_id,
                ring_id: Uuid::new_v4(),
                diamond_id: Uuid::new_v4(),
            })
        }

        async fn confirm_originals(
            &self,
            request: &ConfirmOriginalsRequest,
        ) -> Result<ConfirmOriginalsResponse, ClientError> {
            let missing = self
                .confirm_missing
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            let confirmed = request
                .image_types
                .iter()
                .copied()
                .filter(|t| !missing.contains(t))
                .collect();
            Ok(ConfirmOriginalsResponse { confirmed, missing })
        }

        async fn upload(
            &self,
            signed_url: &str,
            _data: Bytes,
            _content_type: &str,
        ) -> Result<(), ClientError> {
            self.uploads.lock().unwrap().push(signed_url.to_string());
            Ok(())
        }
    }

    struct Setup {
        _dir: tempfile::TempDir,
        queue: SyncQueue,
        temp_job_id: Uuid,
    }

    async fn setup_one_slot() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let uv_free = dir.path().join("slot_0_uv_free.jpg");
        let aset = dir.path().join("slot_0_aset.jpg");
        std::fs::write(&uv_free, b"uv").unwrap();
        std::fs::write(&aset, b"aset").unwrap();

        let queue = SyncQueue::open_in_memory().await.unwrap();
        let slots = vec![SlotCapture {
            slot_index: 0,
            uv_free,
            aset,
        }];
        let temp_job_id = enqueue_job(&queue, "acme", "A", Some("rig-1"), None, &slots)
            .await
            .unwrap();

        Setup {
            _dir: dir,
            queue,
            temp_job_id,
        }
    }

    #[tokio::test]
    async fn test_happy_path_completes_job_and_slot() {
        let setup = setup_one_slot().await;
        let real_job_id = Uuid::new_v4();
        let api = FakeApi::with_job(real_job_id);

        let engine = SyncEngine::new(&api, &setup.queue);
        let outcome = engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome.completed, 2);
        assert_eq!(outcome.dead, 0);
        assert!(!outcome.offline);

        let counts = setup.queue.counts().await.unwrap();
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.dead, 0);

        // Two previews and two originals uploaded, addressed by the real job id.
        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 4);
        for url in uploads.iter() {
            assert!(url.contains(&real_job_id.to_string()));
            assert!(!url.contains(&setup.temp_job_id.to_string()));
        }

        // Ingest carried canonical paths and both preview paths.
        let ingest = api.last_ingest.lock().unwrap().clone().unwrap();
        assert_eq!(ingest.job_id, real_job_id);
        assert!(ingest.uv_free_path.ends_with("slot_0_uv_free.jpg"));
        assert!(ingest.uv_free_preview_path.is_some());
        assert!(ingest.aset_preview_path.is_some());

        // The start carried the temp id as its idempotency key, so a replay
        // after a crash would get this same job back.
        let start = api.last_start.lock().unwrap().clone().unwrap();
        assert_eq!(start.client_job_id, Some(setup.temp_job_id));
    }

    #[tokio::test]
    async fn test_diamond_exists_is_treated_as_ingested() {
        let setup = setup_one_slot().await;
        let api = FakeApi::with_job(Uuid::new_v4());
        api.ingest_errors
            .lock()
            .unwrap()
            .push_back(conflict("DIAMOND_EXISTS"));

        let engine = SyncEngine::new(&api, &setup.queue);
        let outcome = engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome.completed, 2);
        assert_eq!(outcome.dead, 0);
        assert_eq!(setup.queue.counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_stops_pass_and_keeps_queue() {
        let setup = setup_one_slot().await;
        let api = FakeApi::with_job(Uuid::new_v4());
        api.signed_urls_errors
            .lock()
            .unwrap()
            .push_back(retryable_error());

        let engine = SyncEngine::new(&api, &setup.queue);
        let outcome = engine.run_sync_pass().await.unwrap();

        // Job start completed, then the slot hit the outage.
        assert_eq!(outcome.completed, 1);
        assert!(outcome.offline);
        assert_eq!(setup.queue.counts().await.unwrap().pending, 1);

        // A later pass finishes the job.
        let outcome = engine.run_sync_pass().await.unwrap();
        assert_eq!(outcome.completed, 1);
        assert_eq!(setup.queue.counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn test_terminal_rejection_kills_task_but_pass_continues() {
        let setup = setup_one_slot().await;
        let api = FakeApi::with_job(Uuid::new_v4());
        api.signed_urls_errors
            .lock()
            .unwrap()
            .push_back(conflict("JOB_NOT_ACCEPTING"));

        let engine = SyncEngine::new(&api, &setup.queue);
        let outcome = engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.dead, 1);
        assert!(!outcome.offline);

        let dead = setup.queue.dead_tasks().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].kind, KIND_SLOT_SYNC);
    }

    #[tokio::test]
    async fn test_missing_originals_defer_without_reupload() {
        let setup = setup_one_slot().await;
        let api = FakeApi::with_job(Uuid::new_v4());
        api.confirm_missing
            .lock()
            .unwrap()
            .push_back(vec![ImageType::Aset]);

        let engine = SyncEngine::new(&api, &setup.queue);
        let outcome = engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.deferred, 1);
        assert_eq!(setup.queue.counts().await.unwrap().pending, 1);
        assert_eq!(api.uploads.lock().unwrap().len(), 4);

        // Next pass: everything already uploaded and ingested, only the
        // confirmation runs, and this time storage has caught up.
        let outcome = engine.run_sync_pass().await.unwrap();
        assert_eq!(outcome.completed, 1);
        assert_eq!(setup.queue.counts().await.unwrap().pending, 0);
        assert_eq!(api.uploads.lock().unwrap().len(), 4);
    }
}
