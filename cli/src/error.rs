use std::{io, path::PathBuf};
use thiserror::Error;
use watchlib::{Outcome, WatchConfigError};

/// A remote control-plane call that did not go through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct RemoteError {
    pub operation: &'static str,
    pub message: String,
}

impl RemoteError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("{} file not found", .0.display())]
    IndexNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid watch settings: {0}")]
    Watch(#[from] WatchConfigError),

    #[error("failed to package deployment bundle: {0}")]
    Bundle(#[from] zip::result::ZipError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("deployment failed, check the AWS Amplify console: {0}")]
    DeploymentFailed(String),

    #[error("deployment still in progress after the configured timeout")]
    TimedOut,

    #[error("could not determine deployment status: {0}")]
    StatusUnavailable(String),

    #[error("deployment watch cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DeployError {
    /// The error matching a watch outcome, `None` for success.
    pub fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::Success => None,
            Outcome::Failure(reason) => Some(DeployError::DeploymentFailed(reason)),
            Outcome::TimedOut => Some(DeployError::TimedOut),
            Outcome::QueryError { last_error, .. } => {
                Some(DeployError::StatusUnavailable(last_error))
            }
            Outcome::Cancelled => Some(DeployError::Cancelled),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
