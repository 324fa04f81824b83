use crate::events::JobStatus;
use crate::types::{JobHandle, SessionId};
use std::time::Duration;
use tokio::time::Instant;

/// Bookkeeping for one watch call. Lives on the stack of the call and owns
/// nothing that needs cleanup.
pub struct WatchSession<'a> {
    pub id: SessionId,
    pub handle: &'a JobHandle,
    started: Instant,
    deadline: Instant,
    poll_interval: Duration,
    pub queries: u32,
    pub consecutive_failures: u32,
    pub last_status: Option<JobStatus>,
}

impl<'a> WatchSession<'a> {
    pub fn start(handle: &'a JobHandle, timeout: Duration, poll_interval: Duration) -> Self {
        let started = Instant::now();
        Self {
            id: uuid::Uuid::new_v4(),
            handle,
            started,
            deadline: started + timeout,
            poll_interval,
            queries: 0,
            consecutive_failures: 0,
            last_status: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time to sleep before the next query, never past the deadline.
    pub fn next_wait(&self) -> Duration {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        self.poll_interval.min(remaining)
    }
}
