use crate::error;
use crate::events::JobOutcome;
use crate::types::{JobId, JobRequest};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum CoordinatorMessage {
    Submit {
        request: JobRequest,
        response: oneshot::Sender<error::Result<JobId>>,
    },
    /// Sent by a worker when its subprocess is done and the job log has
    /// drained.
    Finished { job_id: JobId, outcome: JobOutcome },
}
