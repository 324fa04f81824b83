//! Remote capabilities the deploy pipeline is built from. Each one is an
//! explicitly constructed object handed to the pipeline; the AWS-backed
//! implementations live in `aws`.

use crate::error::RemoteError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use watchlib::types::{AppId, JobHandle};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Creates and removes the temporary bucket a bundle is staged in.
#[async_trait]
pub trait BucketLifecycle: Send + Sync {
    /// Create the bucket and grant the hosting service read access to it.
    async fn create_bucket(&self, bucket: &str) -> RemoteResult<()>;

    /// Remove the staged object `key` and then the bucket itself.
    async fn delete_bucket(&self, bucket: &str, key: &str) -> RemoteResult<()>;
}

/// Uploads a packaged bundle.
#[async_trait]
pub trait ArtifactStager: Send + Sync {
    /// Returns the source URL the hosting service deploys from.
    async fn stage(&self, bucket: &str, key: &str, bundle: Bytes) -> RemoteResult<String>;
}

/// A freshly created hosting application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppInfo {
    pub app_id: AppId,
    pub default_domain: String,
}

impl AppInfo {
    pub fn url(&self, branch: &str) -> String {
        format!("https://{}.{}", branch, self.default_domain)
    }
}

/// Creates the hosting application and starts deployment runs on it.
#[async_trait]
pub trait DeploymentTrigger: Send + Sync {
    async fn create_app(&self, name: &str) -> RemoteResult<AppInfo>;

    async fn create_branch(&self, app_id: &str, branch: &str) -> RemoteResult<()>;

    /// Start deploying `source_url` to the branch. The returned handle carries
    /// the run's job id when the service reported one.
    async fn start_deployment(
        &self,
        app_id: &str,
        branch: &str,
        source_url: &str,
    ) -> RemoteResult<JobHandle>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, url: &str) -> io::Result<()>;
}
