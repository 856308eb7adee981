//! Durable replay queue.
//!
//! Tasks survive restarts in a local SQLite file and are processed strictly
//! in insertion order. `job_id` is a dedicated column, never part of the
//! payload, so remapping a temporary offline job id to the server-issued one
//! is a single UPDATE over all queued rows.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use uuid::Uuid;

pub const KIND_JOB_START: &str = "job_start";
pub const KIND_SLOT_SYNC: &str = "slot_sync";

pub const STATE_PENDING: &str = "pending";
pub const STATE_DEAD: &str = "dead";

#[derive(Debug, Clone, FromRow)]
pub struct QueueRow {
    pub id: i64,
    pub kind: String,
    pub job_id: String,
    pub payload: String,
    pub tries: i64,
    pub state: String,
    pub last_error: Option<String>,
}

impl QueueRow {
    pub fn job_uuid(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.job_id)
            .with_context(|| format!("Queue row {} has invalid job_id '{}'", self.id, self.job_id))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueCounts {
    pub pending: i64,
    pub dead: i64,
}

#[derive(Clone)]
pub struct SyncQueue {
    pool: SqlitePool,
}

impl SyncQueue {
    /// Open (or create) the queue database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = Self::pool_options().connect_with(options).await?;
        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory queue for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = Self::pool_options().connect("sqlite::memory:").await?;
        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    // One connection: the queue is strictly sequential, and for the
    // in-memory case every connection would otherwise see its own database.
    fn pool_options() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    }

    async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                job_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                tries INTEGER NOT NULL DEFAULT 0,
                state TEXT NOT NULL DEFAULT 'pending',
                last_error TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn push<P: Serialize>(&self, kind: &str, job_id: Uuid, payload: &P) -> Result<i64> {
        let payload = serde_json::to_string(payload)?;
        let result = sqlx::query(
            "INSERT INTO sync_tasks (kind, job_id, payload) VALUES ($1, $2, $3)",
        )
        .bind(kind)
        .bind(job_id.to_string())
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Next pending task with id greater than `after_id`, in insertion order.
    pub async fn next_pending(&self, after_id: i64) -> Result<Option<QueueRow>> {
        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            SELECT id, kind, job_id, payload, tries, state, last_error
            FROM sync_tasks
            WHERE state = 'pending' AND id > $1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(after_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Persist updated payload (step-progress flags) for a task.
    pub async fn update_payload<P: Serialize>(&self, id: i64, payload: &P) -> Result<()> {
        let payload = serde_json::to_string(payload)?;
        sqlx::query("UPDATE sync_tasks SET payload = $1 WHERE id = $2")
            .bind(payload)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Rewrite a temporary offline job id to the server-issued one across
    /// every queued task.
    pub async fn remap_job_id(&self, temp: Uuid, real: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE sync_tasks SET job_id = $1 WHERE job_id = $2")
            .bind(real.to_string())
            .bind(temp.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Task fully synced; remove it.
    pub async fn complete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sync_tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn bump_tries(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query("UPDATE sync_tasks SET tries = tries + 1, last_error = $1 WHERE id = $2")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Terminal failure: keep the row for inspection but stop retrying it.
    pub async fn mark_dead(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sync_tasks SET state = 'dead', tries = tries + 1, last_error = $1 WHERE id = $2",
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn counts(&self) -> Result<QueueCounts> {
        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_tasks WHERE state = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        let dead: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_tasks WHERE state = 'dead'")
            .fetch_one(&self.pool)
            .await?;
        Ok(QueueCounts { pending, dead })
    }

    pub async fn pending_tasks(&self) -> Result<Vec<QueueRow>> {
        self.tasks_in_state(STATE_PENDING).await
    }

    pub async fn dead_tasks(&self) -> Result<Vec<QueueRow>> {
        self.tasks_in_state(STATE_DEAD).await
    }

    async fn tasks_in_state(&self, state: &str) -> Result<Vec<QueueRow>> {
        let rows = sqlx::query_as::<_, QueueRow>(
            r#"
            SELECT id, kind, job_id, payload, tries, state, last_error
            FROM sync_tasks
            WHERE state = $1
            ORDER BY id ASC
            "#,
        )
        .bind(state)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        label: String,
        done: bool,
    }

    fn payload(label: &str) -> Payload {
        Payload {
            label: label.to_string(),
            done: false,
        }
    }

    #[tokio::test]
    async fn test_fifo_order_and_complete() {
        let queue = SyncQueue::open_in_memory().await.unwrap();
        let job = Uuid::new_v4();

        queue.push(KIND_SLOT_SYNC, job, &payload("a")).await.unwrap();
        queue.push(KIND_SLOT_SYNC, job, &payload("b")).await.unwrap();

        let first = queue.next_pending(0).await.unwrap().unwrap();
        let parsed: Payload = serde_json::from_str(&first.payload).unwrap();
        assert_eq!(parsed.label, "a");

        queue.complete(first.id).await.unwrap();
        let next = queue.next_pending(0).await.unwrap().unwrap();
        let parsed: Payload = serde_json::from_str(&next.payload).unwrap();
        assert_eq!(parsed.label, "b");
    }

    #[tokio::test]
    async fn test_next_pending_walks_past_stalled_items() {
        let queue = SyncQueue::open_in_memory().await.unwrap();
        let job = Uuid::new_v4();

        let first = queue.push(KIND_SLOT_SYNC, job, &payload("a")).await.unwrap();
        queue.push(KIND_SLOT_SYNC, job, &payload("b")).await.unwrap();

        let second = queue.next_pending(first).await.unwrap().unwrap();
        let parsed: Payload = serde_json::from_str(&second.payload).unwrap();
        assert_eq!(parsed.label, "b");
    }

    #[tokio::test]
    async fn test_remap_rewrites_all_rows() {
        let queue = SyncQueue::open_in_memory().await.unwrap();
        let temp = Uuid::new_v4();
        let real = Uuid::new_v4();

        queue.push(KIND_JOB_START, temp, &payload("start")).await.unwrap();
        queue.push(KIND_SLOT_SYNC, temp, &payload("slot")).await.unwrap();

        let remapped = queue.remap_job_id(temp, real).await.unwrap();
        assert_eq!(remapped, 2);

        let row = queue.next_pending(0).await.unwrap().unwrap();
        assert_eq!(row.job_uuid().unwrap(), real);
    }

    #[tokio::test]
    async fn test_dead_tasks_are_skipped_but_kept() {
        let queue = SyncQueue::open_in_memory().await.unwrap();
        let job = Uuid::new_v4();

        let id = queue.push(KIND_SLOT_SYNC, job, &payload("a")).await.unwrap();
        queue.push(KIND_SLOT_SYNC, job, &payload("b")).await.unwrap();

        queue.mark_dead(id, "slot already recorded elsewhere").await.unwrap();

        let next = queue.next_pending(0).await.unwrap().unwrap();
        let parsed: Payload = serde_json::from_str(&next.payload).unwrap();
        assert_eq!(parsed.label, "b");

        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.dead, 1);

        let dead = queue.dead_tasks().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].tries, 1);
        assert!(dead[0].last_error.as_deref().unwrap().contains("already"));
    }

    #[tokio::test]
    async fn test_update_payload_persists_progress() {
        let queue = SyncQueue::open_in_memory().await.unwrap();
        let job = Uuid::new_v4();
        let id = queue.push(KIND_SLOT_SYNC, job, &payload("a")).await.unwrap();

        let updated = Payload {
            label: "a".to_string(),
            done: true,
        };
        queue.update_payload(id, &updated).await.unwrap();

        let row = queue.next_pending(0).await.unwrap().unwrap();
        let parsed: Payload = serde_json::from_str(&row.payload).unwrap();
        assert!(parsed.done);
    }
}
