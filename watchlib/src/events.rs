use crate::types::{JobId, SessionId};
use std::{fmt, time::Duration};

/// Remote job state as last reported by the remote system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// The answer to one status query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    pub status: JobStatus,
    /// Free-form reason reported by the remote side, usually only set on failure.
    pub reason: Option<String>,
    /// Job id the remote side resolved for the handle, if any.
    pub job_id: Option<JobId>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            reason: None,
            job_id: None,
        }
    }

    /// No run has been activated for the handle yet.
    pub fn not_started() -> Self {
        Self::new(JobStatus::Pending)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// The outcome this report settles the watch with, if its status is terminal.
    pub(crate) fn terminal_outcome(&self) -> Option<Outcome> {
        if !self.status.is_terminal() {
            return None;
        }
        if self.status == JobStatus::Succeeded {
            return Some(Outcome::Success);
        }
        let reason = self.reason.clone().unwrap_or_else(|| {
            let fallback = match self.status {
                JobStatus::Cancelled => "remote job was cancelled",
                _ => "remote job failed without a reason",
            };
            fallback.to_string()
        });
        Some(Outcome::Failure(reason))
    }
}

/// How a watch ended. Every variant is a value handed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The remote job failed or was cancelled remotely.
    Failure(String),
    /// The deadline passed while the job was still in flight.
    TimedOut,
    /// The status query kept failing; says nothing about the job itself.
    QueryError { failures: u32, last_error: String },
    /// The caller cancelled the watch.
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("succeeded"),
            Outcome::Failure(reason) => write!(f, "failed: {}", reason),
            Outcome::TimedOut => f.write_str("timed out"),
            Outcome::QueryError {
                failures,
                last_error,
            } => write!(
                f,
                "status query failed {} times in a row (last error: {})",
                failures, last_error
            ),
            Outcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Progress notifications handed to a `WatchObserver`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    Started {
        session: SessionId,
        timeout: Duration,
        poll_interval: Duration,
    },
    Polled {
        attempt: u32,
        elapsed: Duration,
        report: StatusReport,
    },
    StatusChanged {
        from: Option<JobStatus>,
        to: JobStatus,
    },
    QueryFailed {
        attempt: u32,
        consecutive: u32,
        error: String,
    },
    Finished {
        outcome: Outcome,
        queries: u32,
        elapsed: Duration,
    },
}
