mod actor;
pub(crate) mod messages;

use self::actor::JobCoordinator;
use self::messages::CoordinatorMessage;
use crate::audit::EventLog;
use crate::cache::ModelCache;
use crate::error::Result;
use crate::store::JobStore;
use crate::types::{JobId, JobRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// How the coordinator invokes the external solving tool.
#[derive(Clone, Debug)]
pub struct SolverCommand {
    /// Binary to execute; `conjure` in production, a stub script in tests.
    pub program: PathBuf,
}

impl Default for SolverCommand {
    fn default() -> Self {
        Self {
            program: "conjure".into(),
        }
    }
}

/// A `JobCoordinator` which accepts submissions and finalizes jobs as their
/// subprocesses complete.
///
/// This struct is actually an actor handle, the real work is done in the actor
/// spawned by `JobCoordinatorHandle::spawn`. The actor-handle abstraction
/// allows this struct to be cloned freely in a multi-thread async context,
/// without requiring an `Arc<Mutex>` or any other means of synchronization.
#[derive(Clone)]
pub struct JobCoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
}

impl JobCoordinatorHandle {
    /// Spawn a new coordinator over the given store and cache.
    ///
    /// Specify the capacity for the coordinator's message queue. This limits
    /// the build-up of inbound submissions.
    pub fn spawn(
        command: SolverCommand,
        store: JobStore,
        cache: ModelCache,
        audit: Arc<dyn EventLog>,
        message_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(message_capacity);
        JobCoordinator::spawn(receiver, sender.clone(), command, store, cache, audit);
        Self { sender }
    }

    /// Submit a job. Returns as soon as the job is on disk and the solver
    /// subprocess has been handed off; never waits for the solve itself.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId> {
        let (tx, rx) = oneshot::channel();
        let msg = CoordinatorMessage::Submit {
            request,
            response: tx,
        };
        self.sender.send(msg).await.expect("JobCoordinator exited");
        rx.await.expect("JobCoordinator exited")
    }
}
