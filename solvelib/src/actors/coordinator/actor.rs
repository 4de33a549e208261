use super::messages::CoordinatorMessage;
use super::SolverCommand;
use crate::actors::worker::{self, Worker};
use crate::audit::EventLog;
use crate::cache::ModelCache;
use crate::error::{Error, Result};
use crate::events::JobOutcome;
use crate::store::{Job, JobStore};
use crate::types::{CacheKey, JobId, JobRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Bookkeeping for a job whose subprocess has not completed yet.
struct InFlight {
    job: Job,
    cache_key: CacheKey,
    cache_hit: bool,
    app_name: String,
}

pub struct JobCoordinator {
    inbox: mpsc::Receiver<CoordinatorMessage>,
    // handed to workers so completions arrive through the same inbox
    sender: mpsc::Sender<CoordinatorMessage>,
    command: SolverCommand,
    store: JobStore,
    cache: ModelCache,
    audit: Arc<dyn EventLog>,
    running: HashMap<JobId, InFlight>,
}

impl JobCoordinator {
    pub fn spawn(
        inbox: mpsc::Receiver<CoordinatorMessage>,
        sender: mpsc::Sender<CoordinatorMessage>,
        command: SolverCommand,
        store: JobStore,
        cache: ModelCache,
        audit: Arc<dyn EventLog>,
    ) {
        let actor = Self {
            inbox,
            sender,
            command,
            store,
            cache,
            audit,
            running: HashMap::new(),
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::CoordinatorMessage::*;
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                Submit { request, response } => {
                    let _ = response.send(self.submit(request).await);
                }
                Finished { job_id, outcome } => {
                    self.finish(job_id, outcome).await;
                }
            }
        }
    }

    /// Allocate the job, resolve the cache, write inputs and hand the solve
    /// to a worker. Replies once the subprocess is launched -- or already
    /// finalized, if launching failed.
    async fn submit(&mut self, request: JobRequest) -> Result<JobId> {
        if request.model.trim().is_empty() {
            return Err(Error::EmptyModel);
        }
        if !worker::valid_solver_name(&request.solver) {
            return Err(Error::InvalidSolver(request.solver));
        }

        let job = self.store.create().await?;
        self.audit
            .append(&format!("submit {} {}", request.app_name, job.id));

        let cache_key = ModelCache::key(&request.model);
        let cached = self.cache.lookup(&cache_key).await;
        let cache_hit = self
            .store
            .materialize(
                &job,
                &request.model,
                request.data.as_ref(),
                cached.as_ref(),
                request.metadata.as_deref(),
            )
            .await?;
        let hit_or_miss = if cache_hit { "cache hit" } else { "cache miss" };
        self.audit.append(&format!(
            "submit {} {} - {hit_or_miss} {cache_key}",
            request.app_name, job.id
        ));

        let args = worker::solver_args(&job, &request.solver, &request.extra_options);
        self.audit.append(&format!(
            "command: {} {}",
            self.command.program.display(),
            args.join(" ")
        ));

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let log_writer = self.store.spawn_log_writer(&job, output_rx);
        let job_id = job.id;
        self.running.insert(
            job_id,
            InFlight {
                job: job.clone(),
                cache_key,
                cache_hit,
                app_name: request.app_name,
            },
        );

        if let Err(e) = Worker::spawn(
            &self.command.program,
            &args,
            &job,
            output_tx,
            log_writer,
            self.sender.clone(),
        ) {
            // never leave the job pending: the launch failure is its
            // terminal state
            self.finish(
                job_id,
                JobOutcome::SpawnFailed {
                    reason: e.to_string(),
                },
            )
            .await;
        }
        Ok(job_id)
    }

    /// Terminal bookkeeping for one job. Runs at most once: a completion for
    /// a job no longer in the running table is dropped.
    async fn finish(&mut self, job_id: JobId, outcome: JobOutcome) {
        let Some(inflight) = self.running.remove(&job_id) else {
            return;
        };
        if outcome.is_success() && !inflight.cache_hit {
            match self
                .cache
                .store(&inflight.cache_key, &inflight.job.artifacts())
                .await
            {
                Ok(()) => self.audit.append(&format!(
                    "submit {} {job_id} - cache populated {}",
                    inflight.app_name, inflight.cache_key
                )),
                Err(e) => tracing::warn!("cache population failed for {job_id}: {e}"),
            }
        }
        if let Err(e) = self.store.finalize(&inflight.job, &outcome).await {
            tracing::warn!("finalize failed for {job_id}: {e}");
        }
        self.audit.append(&format!(
            "submit {} {job_id} - {}",
            inflight.app_name,
            outcome.describe()
        ));
    }
}
