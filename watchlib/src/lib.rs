//! Watch long-running remote jobs until they settle.
//!
//! A [`Watcher`] polls an injected [`StatusQuery`] at a fixed interval and
//! returns an [`Outcome`] once the job succeeds, fails, runs past its deadline,
//! the query channel itself keeps failing, or the caller cancels.

pub mod error;
mod events;
mod observer;
mod query;
pub mod types;
mod watcher;

pub use error::{QueryFailure, WatchConfigError};
pub use events::{JobStatus, Outcome, StatusReport, WatchEvent};
pub use observer::{TracingObserver, WatchObserver};
pub use query::StatusQuery;
pub use tokio_util::sync::CancellationToken;
pub use watcher::{WatchConfig, WatchHandle, Watcher};
