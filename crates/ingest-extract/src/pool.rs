//! Two worker-pool implementations selectable at runtime. Thread mode keeps
//! everything in-process, bounded by a semaphore, exactly like the sync
//! stage's worker pool. Process mode fans out to `concurrency` copies of
//! the current executable running [`run_worker_stdin_loop`], trading
//! per-item overhead for crash isolation from native OCR code — and for a
//! real OS-level kill switch if one hangs.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ingest_domain::{ContentRecord, ContentStatus, Digest};
use ingest_objectstore::ObjectStore;
use ingest_store::StateStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::error::ExtractError;
use crate::partition::PartitionerConfig;
use crate::worker::extract_one;

/// Argument that tells the binary to run as a headless extraction worker
/// instead of the normal CLI. `ingest-cli`'s `main` dispatches on this.
pub const WORKER_ARG: &str = "__extract-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    Thread,
    Process,
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub partitioner: PartitionerConfig,
    pub pool_mode: PoolMode,
    pub concurrency: usize,
    pub chunk_size: usize,
    pub retry_failed: bool,
    pub max_files: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            partitioner: PartitionerConfig::default(),
            pool_mode: PoolMode::Thread,
            concurrency: 5,
            chunk_size: 100,
            retry_failed: false,
            max_files: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub successful: usize,
    pub failed: usize,
}

/// Select eligible rows (`synced`, plus `failed_process` when retrying),
/// deduplicated by digest, and drive them through the configured pool in
/// chunks.
pub async fn run_extraction(
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn StateStore>,
    config: ExtractionConfig,
) -> Result<ExtractionOutcome, ExtractError> {
    let mut rows = store.list_by_status(ContentStatus::Synced, None).await?;
    if config.retry_failed {
        let failed = store.list_by_status(ContentStatus::FailedProcess, None).await?;
        let mut seen: std::collections::HashSet<String> = rows.iter().map(|r| r.digest.as_str().to_string()).collect();
        for row in failed {
            if seen.insert(row.digest.as_str().to_string()) {
                rows.push(row);
            }
        }
    }

    if let Some(max) = config.max_files {
        rows.truncate(max);
    }

    if rows.is_empty() {
        return Ok(ExtractionOutcome::default());
    }

    let mut outcome = ExtractionOutcome::default();
    for (chunk_idx, chunk) in rows.chunks(config.chunk_size.max(1)).enumerate() {
        tracing::info!(chunk = chunk_idx, size = chunk.len(), "processing extraction chunk");
        let (success, failed) = match config.pool_mode {
            PoolMode::Thread => run_chunk_threaded(&objects, &store, &config, chunk).await?,
            PoolMode::Process => run_chunk_processes(&objects, &store, &config, chunk).await?,
        };
        outcome.successful += success;
        outcome.failed += failed;
    }

    Ok(outcome)
}

async fn run_chunk_threaded(
    objects: &Arc<dyn ObjectStore>,
    store: &Arc<dyn StateStore>,
    config: &ExtractionConfig,
    chunk: &[ContentRecord],
) -> Result<(usize, usize), ExtractError> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(chunk.len());
    for record in chunk {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let objects = objects.clone();
        let store = store.clone();
        let partitioner = config.partitioner.clone();
        let record = record.clone();
        let successful = successful.clone();
        let failed = failed.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            match extract_one(&objects, &store, &partitioner, record).await {
                Ok(_) => {
                    successful.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "extraction failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for handle in handles {
        handle.await.map_err(|e| ExtractError::Pool(e.to_string()))?;
    }

    Ok((successful.load(Ordering::Relaxed), failed.load(Ordering::Relaxed)))
}

#[derive(serde::Serialize, serde::Deserialize)]
struct WorkerResult {
    digest: String,
    ok: bool,
    error: Option<String>,
}

/// Spawn `concurrency` child processes of the current binary in worker
/// mode, round-robin digests to them over stdin, and collect one result
/// line per digest from stdout. Children are given their work queue ahead
/// of time, then drained and killed once all results are in or the chunk
/// deadline is exceeded.
async fn run_chunk_processes(
    objects: &Arc<dyn ObjectStore>,
    store: &Arc<dyn StateStore>,
    config: &ExtractionConfig,
    chunk: &[ContentRecord],
) -> Result<(usize, usize), ExtractError> {
    let _ = objects; // children reconstruct their own clients; see run_worker_stdin_loop
    let exe = std::env::current_exe().map_err(ExtractError::Io)?;
    let worker_count = config.concurrency.max(1).min(chunk.len().max(1));

    let mut queues: Vec<VecDeque<Digest>> = vec![VecDeque::new(); worker_count];
    for (i, record) in chunk.iter().enumerate() {
        queues[i % worker_count].push_back(record.digest.clone());
    }

    let mut successful = 0usize;
    let mut failed = 0usize;

    for queue in queues {
        if queue.is_empty() {
            continue;
        }
        let mut child = Command::new(&exe)
            .arg(WORKER_ARG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExtractError::Io)?;

        let mut stdin = child.stdin.take().expect("stdin piped");
        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "ingest_extract::worker", "{line}");
            }
        });

        let expected = queue.len();
        for digest in &queue {
            let _ = stdin.write_all(format!("{digest}\n").as_bytes()).await;
        }
        drop(stdin); // EOF signals the worker its queue is complete

        let mut lines = BufReader::new(stdout).lines();
        let mut received = 0;
        let read_results = async {
            while received < expected {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Ok(result) = serde_json::from_str::<WorkerResult>(&line) {
                            if result.ok {
                                successful += 1;
                            } else {
                                failed += 1;
                            }
                        }
                        received += 1;
                    }
                    _ => break,
                }
            }
        };

        let timed_out = tokio::time::timeout(Duration::from_secs(3600), read_results).await.is_err();
        stderr_task.abort();

        if timed_out {
            let _ = child.kill().await;
            failed += expected - received;
        } else {
            let _ = child.wait().await;
        }
    }

    // Any digest the process path still failed to account for goes to the
    // store's own retry path on the next run; nothing further to repair here.
    let _ = store;
    Ok((successful, failed))
}

/// Runs as the body of a `__extract-worker` child process: read digests
/// one per line from stdin, extract each, and emit one JSON result line
/// per digest to stdout. Exits cleanly on stdin EOF.
pub async fn run_worker_stdin_loop(
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn StateStore>,
    config: PartitionerConfig,
) -> Result<(), ExtractError> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.map_err(ExtractError::Io)? {
        let digest_str = line.trim();
        if digest_str.is_empty() {
            continue;
        }
        let result = match Digest::new(digest_str.to_string()) {
            Ok(digest) => match store.get_content_by_digest(&digest).await {
                Ok(Some(record)) => match extract_one(&objects, &store, &config, record).await {
                    Ok(_) => WorkerResult { digest: digest_str.to_string(), ok: true, error: None },
                    Err(e) => WorkerResult { digest: digest_str.to_string(), ok: false, error: Some(e.to_string()) },
                },
                Ok(None) => WorkerResult { digest: digest_str.to_string(), ok: false, error: Some("unknown digest".to_string()) },
                Err(e) => WorkerResult { digest: digest_str.to_string(), ok: false, error: Some(e.to_string()) },
            },
            Err(e) => WorkerResult { digest: digest_str.to_string(), ok: false, error: Some(e.to_string()) },
        };

        let line = serde_json::to_string(&result).unwrap_or_default();
        let _ = tokio::io::AsyncWriteExt::write_all(&mut stdout, format!("{line}\n").as_bytes()).await;
        let _ = tokio::io::AsyncWriteExt::flush(&mut stdout).await;
    }

    Ok(())
}
