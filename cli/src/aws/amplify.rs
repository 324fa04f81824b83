use crate::capabilities::{AppInfo, DeploymentTrigger, RemoteResult};
use crate::error::RemoteError;
use async_trait::async_trait;
use aws_sdk_amplify::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_amplify::types::{Job, SourceUrlType};
use aws_sdk_amplify::Client;
use tracing::{debug, info};
use watchlib::types::JobHandle;
use watchlib::{JobStatus, QueryFailure, StatusQuery, StatusReport};

/// Amplify-backed deployment trigger and status query.
pub struct AmplifyDeployer {
    client: Client,
}

impl AmplifyDeployer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The branch's active job id, `None` until Amplify activates a run.
    async fn active_job_id(&self, handle: &JobHandle) -> Result<Option<String>, QueryFailure> {
        let output = self
            .client
            .get_branch()
            .app_id(handle.app_id())
            .branch_name(handle.branch())
            .send()
            .await
            .map_err(query_failure)?;
        let job_id = output
            .branch()
            .map(|branch| branch.active_job_id())
            .filter(|id| !id.is_empty())
            .map(str::to_owned);
        Ok(job_id)
    }
}

fn remote<E>(operation: &'static str) -> impl FnOnce(E) -> RemoteError
where
    E: std::error::Error,
{
    move |err| RemoteError::new(operation, DisplayErrorContext(&err).to_string())
}

fn query_failure<E>(err: E) -> QueryFailure
where
    E: std::error::Error + ProvideErrorMetadata,
{
    let message = DisplayErrorContext(&err).to_string();
    match err.code() {
        Some("NotFoundException") => QueryFailure::NotFound(message),
        Some("UnauthorizedException") => QueryFailure::Unauthorized(message),
        _ => QueryFailure::Transport(message),
    }
}

/// Map an Amplify job status onto the watcher's states.
fn map_status(raw: &str) -> JobStatus {
    match raw {
        "CREATED" | "PENDING" | "PROVISIONING" => JobStatus::Pending,
        "RUNNING" | "CANCELLING" => JobStatus::Running,
        "SUCCEED" => JobStatus::Succeeded,
        "FAILED" => JobStatus::Failed,
        "CANCELLED" => JobStatus::Cancelled,
        _ => JobStatus::Unknown,
    }
}

/// Reason reported by the first failed step of a job.
fn failure_reason(job: &Job) -> Option<String> {
    job.steps()
        .iter()
        .find(|step| map_status(step.status().as_str()) == JobStatus::Failed)
        .map(|step| match step.status_reason() {
            Some(reason) => format!("{}: {}", step.step_name(), reason),
            None => format!("step {} failed", step.step_name()),
        })
}

#[async_trait]
impl DeploymentTrigger for AmplifyDeployer {
    async fn create_app(&self, name: &str) -> RemoteResult<AppInfo> {
        info!(%name, "creating Amplify app");
        let output = self
            .client
            .create_app()
            .name(name)
            .send()
            .await
            .map_err(remote("CreateApp"))?;
        let app = output
            .app()
            .ok_or_else(|| RemoteError::new("CreateApp", "response did not include the app"))?;
        Ok(AppInfo {
            app_id: app.app_id().to_owned(),
            default_domain: app.default_domain().to_owned(),
        })
    }

    async fn create_branch(&self, app_id: &str, branch: &str) -> RemoteResult<()> {
        info!(%app_id, %branch, "creating branch");
        self.client
            .create_branch()
            .app_id(app_id)
            .branch_name(branch)
            .send()
            .await
            .map_err(remote("CreateBranch"))?;
        Ok(())
    }

    async fn start_deployment(
        &self,
        app_id: &str,
        branch: &str,
        source_url: &str,
    ) -> RemoteResult<JobHandle> {
        info!(%app_id, %branch, %source_url, "starting deployment");
        let output = self
            .client
            .start_deployment()
            .app_id(app_id)
            .branch_name(branch)
            .source_url(source_url)
            .source_url_type(SourceUrlType::Zip)
            .send()
            .await
            .map_err(remote("StartDeployment"))?;
        let handle = JobHandle::new(app_id, branch);
        Ok(match output.job_summary().map(|summary| summary.job_id()) {
            Some(job_id) if !job_id.is_empty() => handle.with_job_id(job_id),
            _ => handle,
        })
    }
}

#[async_trait]
impl StatusQuery for AmplifyDeployer {
    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport, QueryFailure> {
        let job_id = match handle.job_id() {
            Some(job_id) => job_id.to_owned(),
            None => match self.active_job_id(handle).await? {
                Some(job_id) => job_id,
                None => {
                    debug!(%handle, "no active job on branch yet");
                    return Ok(StatusReport::not_started());
                }
            },
        };

        let output = self
            .client
            .get_job()
            .app_id(handle.app_id())
            .branch_name(handle.branch())
            .job_id(&job_id)
            .send()
            .await
            .map_err(query_failure)?;
        let job = output
            .job()
            .ok_or_else(|| QueryFailure::Malformed("GetJob response without a job".into()))?;
        let summary = job
            .summary()
            .ok_or_else(|| QueryFailure::Malformed("GetJob response without a summary".into()))?;

        let status = map_status(summary.status().as_str());
        let mut report = StatusReport::new(status).with_job_id(job_id);
        if status == JobStatus::Failed {
            if let Some(reason) = failure_reason(job) {
                report = report.with_reason(reason);
            }
        }
        Ok(report)
    }
}
