//! The deployment sequence: package, stage, trigger, watch, clean up, open.

use crate::bundle::{self, BUNDLE_KEY};
use crate::capabilities::{ArtifactStager, BrowserLauncher, BucketLifecycle, DeploymentTrigger};
use crate::error::{DeployError, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};
use watchlib::types::AppId;
use watchlib::{CancellationToken, StatusQuery, TracingObserver, Watcher};

/// Timestamped names for one deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployNames {
    pub timestamp: String,
    pub bucket: String,
    pub app: String,
}

impl DeployNames {
    pub fn at(now: DateTime<Utc>, app_name: &str) -> Self {
        let timestamp = now.format("%Y%m%d.%H%M%S").to_string();
        Self {
            bucket: format!("amplify-deploy-temp-{}", timestamp.replace('.', "")),
            app: format!("{} - {}", app_name, timestamp),
            timestamp,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeployRequest {
    pub names: DeployNames,
    pub index_path: PathBuf,
    pub branch: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployReport {
    pub app_id: AppId,
    pub app_url: String,
}

/// Everything the pipeline talks to. The browser is an optional hook run only
/// after a successful deployment.
pub struct Collaborators<'a> {
    pub buckets: &'a dyn BucketLifecycle,
    pub stager: &'a dyn ArtifactStager,
    pub trigger: &'a dyn DeploymentTrigger,
    pub status: &'a dyn StatusQuery,
    pub browser: Option<&'a dyn BrowserLauncher>,
}

/// Run one deployment. Once the bucket exists it is removed again whatever
/// happens afterwards; a failed cleanup is logged and never replaces the
/// deployment's own result.
pub async fn deploy(
    request: &DeployRequest,
    collaborators: &Collaborators<'_>,
    watcher: &Watcher,
    cancel: &CancellationToken,
) -> Result<DeployReport> {
    info!(
        app = %request.names.app,
        timestamp = %request.names.timestamp,
        "starting Amplify deployment process"
    );
    let bundle = bundle::package_index(&request.index_path).await?;

    let bucket = &request.names.bucket;
    collaborators.buckets.create_bucket(bucket).await?;

    let result = deploy_from_bucket(request, collaborators, watcher, cancel, bundle).await;

    if let Err(e) = collaborators.buckets.delete_bucket(bucket, BUNDLE_KEY).await {
        warn!(%bucket, error = %e, "temporary bucket was not removed");
    }

    let report = result?;
    info!(url = %report.app_url, app_id = %report.app_id, "app deployed");
    if let Some(browser) = collaborators.browser {
        info!("opening app in default browser");
        if let Err(e) = browser.open(&report.app_url).await {
            warn!(error = %e, url = %report.app_url, "could not open browser");
        }
    }
    Ok(report)
}

async fn deploy_from_bucket(
    request: &DeployRequest,
    collaborators: &Collaborators<'_>,
    watcher: &Watcher,
    cancel: &CancellationToken,
    bundle: bytes::Bytes,
) -> Result<DeployReport> {
    let source_url = collaborators
        .stager
        .stage(&request.names.bucket, BUNDLE_KEY, bundle)
        .await?;

    if cancel.is_cancelled() {
        return Err(DeployError::Cancelled);
    }
    let app = collaborators.trigger.create_app(&request.names.app).await?;
    collaborators
        .trigger
        .create_branch(&app.app_id, &request.branch)
        .await?;
    if cancel.is_cancelled() {
        return Err(DeployError::Cancelled);
    }
    let handle = collaborators
        .trigger
        .start_deployment(&app.app_id, &request.branch, &source_url)
        .await?;

    let outcome = watcher
        .watch(&handle, collaborators.status, &TracingObserver, cancel)
        .await;
    if let Some(err) = DeployError::from_outcome(outcome) {
        return Err(err);
    }

    Ok(DeployReport {
        app_url: app.url(&request.branch),
        app_id: app.app_id,
    })
}
