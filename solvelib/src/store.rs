//! On-disk job state.
//!
//! Every job owns one directory under the store root, holding its inputs,
//! the solver's outputs, the interleaved log and a small status file. The
//! status file's mtime doubles as the job's last-touched time, which drives
//! expiry. Reads are best-effort throughout: a missing artifact means "not
//! produced yet", never a hard error.

use crate::cache::CachedModel;
use crate::events::{JobOutcome, Output};
use crate::types::JobId;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const MODEL_FILE: &str = "model.essence";
pub const DATA_FILE: &str = "data.json";
pub const EPRIME_FILE: &str = "model000001.eprime";
pub const CHECKSUM_FILE: &str = ".conjure-checksum";
pub const LOGS_FILE: &str = "logs.txt";
pub const STATUS_FILE: &str = "status.txt";
pub const METADATA_FILE: &str = "metadata.txt";
pub const INFO_FILE: &str = "model000001-data.eprime-info";
pub const SOLUTIONS_FILE: &str = "model000001-data.solutions.json";

pub const STATUS_WAIT: &str = "wait";

/// A job's workspace directory. The directory is exclusively owned by this
/// job; ids are random, so two jobs can never share one.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: JobId,
    pub dir: PathBuf,
}

impl Job {
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    /// The compiled artifacts this job produced (or had copied in).
    pub fn artifacts(&self) -> CachedModel {
        CachedModel {
            essence: self.model_path(),
            eprime: self.dir.join(EPRIME_FILE),
            checksum: self.dir.join(CHECKSUM_FILE),
        }
    }
}

/// Externally visible state of a job, as assembled by one poll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobView {
    pub status: JobState,
    pub logs: Vec<String>,
    pub info: BTreeMap<String, String>,
    pub solution: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum JobState {
    /// No such job, or its retention window has passed. The two are
    /// deliberately indistinguishable.
    #[default]
    Unknown,
    /// Subprocess still running, or artifacts not yet produced.
    Wait,
    /// A solution is available.
    Ok,
    /// Terminal non-success; carries the recorded status line verbatim.
    Terminated(String),
}

#[derive(Clone, Debug)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate a fresh job with an empty, isolated workspace.
    pub async fn create(&self) -> io::Result<Job> {
        let id = Uuid::new_v4();
        let dir = self.root.join(id.to_string());
        fs::create_dir_all(&dir).await?;
        // absolute path: the solver runs with this as its working directory
        let dir = fs::canonicalize(&dir).await?;
        Ok(Job { id, dir })
    }

    /// Write the job's input files and its initial `wait` status.
    ///
    /// When `cached` artifacts are given they are copied in place of a fresh
    /// translation; any copy failure degrades to the miss path. Returns
    /// whether the hit path was taken.
    pub async fn materialize(
        &self,
        job: &Job,
        model: &str,
        data: Option<&Value>,
        cached: Option<&CachedModel>,
        metadata: Option<&str>,
    ) -> io::Result<bool> {
        let mut cache_hit = false;
        if let Some(cached) = cached {
            cache_hit = self.copy_cached(job, cached).await.is_ok();
        }
        if !cache_hit {
            fs::write(job.model_path(), model).await?;
        }
        // the solver always gets a data file; its output file names embed
        // the data file's stem
        let data_text = match data {
            None => "{}".to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        fs::write(job.data_path(), data_text).await?;
        if let Some(metadata) = metadata {
            fs::write(job.dir.join(METADATA_FILE), metadata).await?;
        }
        fs::write(job.dir.join(STATUS_FILE), STATUS_WAIT).await?;
        Ok(cache_hit)
    }

    async fn copy_cached(&self, job: &Job, cached: &CachedModel) -> io::Result<()> {
        let artifacts = job.artifacts();
        fs::copy(&cached.checksum, &artifacts.checksum).await?;
        fs::copy(&cached.essence, &artifacts.essence).await?;
        fs::copy(&cached.eprime, &artifacts.eprime).await?;
        Ok(())
    }

    /// Drain subprocess output into the job's log file.
    ///
    /// A single consumer on a single channel, so chunks land in arrival
    /// order no matter how stdout and stderr interleave.
    pub fn spawn_log_writer(
        &self,
        job: &Job,
        mut output_rx: mpsc::UnboundedReceiver<Output>,
    ) -> JoinHandle<()> {
        let path = job.dir.join(LOGS_FILE);
        tokio::spawn(async move {
            let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!("job log unavailable at {}: {e}", path.display());
                    while output_rx.recv().await.is_some() {}
                    return;
                }
            };
            while let Some(output) = output_rx.recv().await {
                if file.write_all(output.blob()).await.is_err() {
                    break;
                }
            }
            let _ = file.flush().await;
        })
    }

    /// Record a job's terminal state: append the exit line to the log and
    /// replace the status file, which also refreshes the last-touched time.
    pub async fn finalize(&self, job: &Job, outcome: &JobOutcome) -> io::Result<()> {
        let mut line = format!("submit {} - {}\n", job.id, outcome.describe());
        if let JobOutcome::SpawnFailed { reason } = outcome {
            line.push_str(reason);
            line.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(job.dir.join(LOGS_FILE))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        // rename keeps a concurrent poll from ever seeing a half-written
        // status
        let tmp = job.dir.join(".status.tmp");
        fs::write(&tmp, outcome.status_line()).await?;
        fs::rename(&tmp, job.dir.join(STATUS_FILE)).await
    }

    /// Read a job's externally visible state. Never fails: anything missing
    /// or unparseable degrades to an absent field, and an absent or expired
    /// job is simply `Unknown`.
    pub async fn read(&self, job_id: &str, retention: Duration) -> JobView {
        // ids are uuids; parsing up front keeps arbitrary client strings out
        // of path construction
        let Ok(id) = Uuid::parse_str(job_id.trim()) else {
            return JobView::default();
        };
        let dir = self.root.join(id.to_string());
        let status_path = dir.join(STATUS_FILE);
        let Ok(meta) = fs::metadata(&status_path).await else {
            return JobView::default();
        };
        if expired(meta.modified().ok(), retention) {
            return JobView::default();
        }

        let status_text = fs::read_to_string(&status_path).await.unwrap_or_default();
        let logs = read_lines(dir.join(LOGS_FILE)).await;
        let info = read_info(dir.join(INFO_FILE)).await;
        let solution = read_solution(dir.join(SOLUTIONS_FILE)).await;

        let status_text = status_text.trim();
        let status = if solution.is_some() {
            // a parseable solution wins even if the recorded exit state was
            // ambiguous
            JobState::Ok
        } else if status_text.is_empty() || status_text == STATUS_WAIT {
            JobState::Wait
        } else {
            JobState::Terminated(status_text.to_string())
        };

        JobView {
            status,
            logs,
            info,
            solution,
        }
    }
}

fn expired(modified: Option<SystemTime>, retention: Duration) -> bool {
    match modified {
        Some(touched) => SystemTime::now()
            .duration_since(touched)
            .map(|age| age > retention)
            .unwrap_or(false),
        None => false,
    }
}

async fn read_lines(path: PathBuf) -> Vec<String> {
    match fs::read_to_string(path).await {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

async fn read_info(path: PathBuf) -> BTreeMap<String, String> {
    match fs::read_to_string(path).await {
        Ok(text) => parse_info(&text),
        Err(_) => BTreeMap::new(),
    }
}

/// Best-effort parse of the solver's info file: `key: value` lines, split on
/// the first `:`, anything without one ignored. A lenient format, not a
/// schema.
fn parse_info(text: &str) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                info.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    info
}

async fn read_solution(path: PathBuf) -> Option<Value> {
    let text = fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&text).ok()
}
