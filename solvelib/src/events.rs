use crate::types::OutputBlob;

/// How a job's solver subprocess ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Exited { code: i32 },
    Killed { signal: i32 },
    SpawnFailed { reason: String },
}

impl JobOutcome {
    /// Short description, e.g. `exitcode 0`.
    pub fn describe(&self) -> String {
        match self {
            JobOutcome::Exited { code } => format!("exitcode {code}"),
            JobOutcome::Killed { signal } => format!("signal {signal}"),
            JobOutcome::SpawnFailed { .. } => "solver failed to start".to_string(),
        }
    }

    /// The terminal line recorded in the job's status file.
    pub fn status_line(&self) -> String {
        format!("terminated - {}", self.describe())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Exited { code: 0 })
    }
}

#[derive(Clone)]
pub enum Output {
    Stdout(OutputBlob),
    Stderr(OutputBlob),
}

impl Output {
    pub fn blob(&self) -> &OutputBlob {
        match self {
            Output::Stdout(blob) | Output::Stderr(blob) => blob,
        }
    }
}
