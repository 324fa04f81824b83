use std::fmt;
use uuid::Uuid;

pub type AppId = String;
pub type BranchName = String;
pub type JobId = String;
pub type SessionId = Uuid;

/// Identifies one remote asynchronous run: application, branch and (once the
/// remote side assigned one) the job id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle {
    app_id: AppId,
    branch: BranchName,
    job_id: Option<JobId>,
}

impl JobHandle {
    pub fn new(app_id: impl Into<AppId>, branch: impl Into<BranchName>) -> Self {
        Self {
            app_id: app_id.into(),
            branch: branch.into(),
            job_id: None,
        }
    }

    /// Pin the handle to a specific run.
    pub fn with_job_id(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// `None` while the remote side has not activated a run for this branch.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job_id {
            Some(job_id) => write!(f, "{}/{}#{}", self.app_id, self.branch, job_id),
            None => write!(f, "{}/{}", self.app_id, self.branch),
        }
    }
}
