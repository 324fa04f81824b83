use std::{result, time::Duration};

/// Rejected watcher settings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchConfigError {
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    #[error("poll interval {interval:?} exceeds timeout {timeout:?}")]
    IntervalExceedsTimeout {
        interval: Duration,
        timeout: Duration,
    },
    #[error("query failure budget must allow at least one failure")]
    ZeroFailureBudget,
}

/// A status query that could not be answered. The watcher treats every
/// variant as one failed, retryable poll attempt.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryFailure {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type Result<T> = result::Result<T, WatchConfigError>;
