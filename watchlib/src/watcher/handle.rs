use crate::events::Outcome;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Handle to a watch session running on its own task.
///
/// Dropping the handle does not stop the session; call `cancel` for that.
pub struct WatchHandle {
    outcome_rx: oneshot::Receiver<Outcome>,
    cancel: CancellationToken,
}

impl WatchHandle {
    pub(crate) fn new(outcome_rx: oneshot::Receiver<Outcome>, cancel: CancellationToken) -> Self {
        Self { outcome_rx, cancel }
    }

    /// Stop the session before its next query.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session to finish. A session whose task went away without
    /// reporting counts as cancelled.
    pub async fn outcome(self) -> Outcome {
        self.outcome_rx.await.unwrap_or(Outcome::Cancelled)
    }
}
