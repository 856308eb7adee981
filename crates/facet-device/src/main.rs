mod api;
mod engine;
mod queue;
mod scan;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::SyncEngine;
use facet_api_client::ApiClient;
use queue::SyncQueue;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_QUEUE_DB: &str = "facet-queue.db";

#[derive(Parser)]
#[command(name = "facet-device", about = "Capture-rig companion: queue scans locally and sync them to the server")]
struct Cli {
    /// Path to the local queue database
    #[arg(long, global = true, default_value = DEFAULT_QUEUE_DB)]
    queue_db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue a capture folder as a new job, then sync unless --offline
    Scan {
        /// Folder containing slot_<n>_uv_free.jpg / slot_<n>_aset.jpg pairs
        #[arg(long)]
        folder: PathBuf,

        /// Organization slug the job belongs to
        #[arg(long)]
        org: String,

        /// Ring label for this batch
        #[arg(long)]
        ring: String,

        /// Device name reported to the server
        #[arg(long)]
        device: Option<String>,

        /// Free-form external reference stored on the job
        #[arg(long)]
        external_ref: Option<String>,

        /// Queue only; do not contact the server
        #[arg(long)]
        offline: bool,
    },

    /// Drain the queue against the server
    Sync {
        /// Run a single pass instead of retrying until drained
        #[arg(long)]
        once: bool,

        /// Seconds to wait between passes while tasks remain
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },

    /// Show pending and dead queue entries
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let queue = SyncQueue::open(&cli.queue_db)
        .await
        .with_context(|| format!("Failed to open queue database {}", cli.queue_db.display()))?;

    match cli.command {
        Command::Scan {
            folder,
            org,
            ring,
            device,
            external_ref,
            offline,
        } => {
            let slots = scan::discover_slots(&folder)?;
            if slots.is_empty() {
                anyhow::bail!(
                    "No complete capture pairs found in {}",
                    folder.display()
                );
            }

            let temp_job_id = engine::enqueue_job(
                &queue,
                &org,
                &ring,
                device.as_deref(),
                external_ref.as_deref(),
                &slots,
            )
            .await?;
            println!(
                "Queued {} slot(s) under temporary job {}",
                slots.len(),
                temp_job_id
            );

            if !offline {
                let api = ApiClient::from_env()?;
                run_sync(&api, &queue, true, 0).await?;
            }
        }

        Command::Sync {
            once,
            interval_secs,
        } => {
            let api = ApiClient::from_env()?;
            run_sync(&api, &queue, once, interval_secs).await?;
        }

        Command::Status => {
            let counts = queue.counts().await?;
            println!("pending: {}", counts.pending);
            for row in queue.pending_tasks().await? {
                println!("  {}", describe_task(&row));
            }
            println!("dead:    {}", counts.dead);
            for row in queue.dead_tasks().await? {
                println!("  {}", describe_task(&row));
            }
        }
    }

    Ok(())
}

/// One status line per queued task, with slot progress where applicable.
fn describe_task(row: &queue::QueueRow) -> String {
    let mut line = format!("#{} {} job={} tries={}", row.id, row.kind, row.job_id, row.tries);

    if row.kind == queue::KIND_SLOT_SYNC {
        if let Ok(task) = serde_json::from_str::<engine::SlotSyncTask>(&row.payload) {
            line.push_str(&format!(
                " ring={} slot={} previews={} ingested={} originals={}",
                task.ring_label,
                task.slot_index,
                task.previews_uploaded,
                task.ingested,
                task.originals_uploaded
            ));
        }
    }
    if let Some(error) = row.last_error.as_deref() {
        line.push_str(&format!(" error={}", error));
    }
    line
}

/// Run sync passes until the queue drains. Retryable failures and
/// not-yet-confirmed originals wait `interval_secs` before the next pass;
/// with `once` the first pass's result is final.
async fn run_sync(
    api: &ApiClient,
    queue: &SyncQueue,
    once: bool,
    interval_secs: u64,
) -> Result<()> {
    let engine = SyncEngine::new(api, queue);

    loop {
        let outcome = engine.run_sync_pass().await?;
        let counts = queue.counts().await?;
        println!(
            "Sync pass: {} completed, {} deferred, {} dead; {} pending{}",
            outcome.completed,
            outcome.deferred,
            outcome.dead,
            counts.pending,
            if outcome.offline {
                " (server unreachable)"
            } else {
                ""
            }
        );

        if counts.pending == 0 || once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }

    Ok(())
}
