use crate::events::WatchEvent;
use tracing::{debug, info, warn};

/// Receives progress notifications from a watch session. Observers cannot
/// influence how the session proceeds.
pub trait WatchObserver: Send + Sync {
    fn on_event(&self, event: &WatchEvent);
}

impl<F> WatchObserver for F
where
    F: Fn(&WatchEvent) + Send + Sync,
{
    fn on_event(&self, event: &WatchEvent) {
        self(event)
    }
}

/// Logs every notification through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl WatchObserver for TracingObserver {
    fn on_event(&self, event: &WatchEvent) {
        use WatchEvent::*;
        match event {
            Started {
                session,
                timeout,
                poll_interval,
            } => {
                info!(%session, ?timeout, ?poll_interval, "verifying deployment status");
            }
            Polled {
                attempt,
                elapsed,
                report,
            } => {
                info!(
                    attempt,
                    ?elapsed,
                    status = %report.status,
                    job_id = report.job_id.as_deref().unwrap_or("-"),
                    "deployment status: {}",
                    report.status
                );
            }
            StatusChanged { from, to } => match from {
                Some(from) => info!(%from, %to, "deployment status changed"),
                None => info!(%to, "first deployment status received"),
            },
            QueryFailed {
                attempt,
                consecutive,
                error,
            } => {
                debug!(attempt, consecutive, %error, "status query failed");
            }
            Finished {
                outcome,
                queries,
                elapsed,
            } => {
                if outcome.is_success() {
                    info!(queries, ?elapsed, "deployment completed successfully");
                } else {
                    warn!(queries, ?elapsed, %outcome, "deployment watch ended");
                }
            }
        }
    }
}
