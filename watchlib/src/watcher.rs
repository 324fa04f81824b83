mod handle;
mod session;

pub use self::handle::WatchHandle;

use self::session::WatchSession;
use crate::error::{self, WatchConfigError};
use crate::events::{Outcome, WatchEvent};
use crate::observer::WatchObserver;
use crate::query::StatusQuery;
use crate::types::JobHandle;
use std::time::Duration;
use tokio::{select, sync::oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

/// Limits for a single watch: overall deadline, wait between queries, and how
/// many status queries in a row may fail before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchConfig {
    timeout: Duration,
    poll_interval: Duration,
    max_query_failures: u32,
}

impl WatchConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_QUERY_FAILURES: u32 = 3;

    pub fn new(
        timeout: Duration,
        poll_interval: Duration,
        max_query_failures: u32,
    ) -> error::Result<Self> {
        if timeout.is_zero() {
            return Err(WatchConfigError::ZeroTimeout);
        }
        if poll_interval.is_zero() {
            return Err(WatchConfigError::ZeroPollInterval);
        }
        if poll_interval > timeout {
            return Err(WatchConfigError::IntervalExceedsTimeout {
                interval: poll_interval,
                timeout,
            });
        }
        if max_query_failures == 0 {
            return Err(WatchConfigError::ZeroFailureBudget);
        }
        Ok(Self {
            timeout,
            poll_interval,
            max_query_failures,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_query_failures(&self) -> u32 {
        self.max_query_failures
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            max_query_failures: Self::DEFAULT_MAX_QUERY_FAILURES,
        }
    }
}

/// Polls a remote job until it settles, the deadline passes, the status query
/// gives out, or the caller cancels.
///
/// The watcher keeps no state between calls, so one `Watcher` can serve any
/// number of concurrent watches.
#[derive(Clone, Debug, Default)]
pub struct Watcher {
    config: WatchConfig,
}

impl Watcher {
    pub fn new(config: WatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Watch `handle` until it reaches a terminal state or the session ends for
    /// another reason. Outcomes are returned, never raised.
    pub async fn watch<Q, O>(
        &self,
        handle: &JobHandle,
        query: &Q,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Outcome
    where
        Q: StatusQuery + ?Sized,
        O: WatchObserver + ?Sized,
    {
        let mut session =
            WatchSession::start(handle, self.config.timeout, self.config.poll_interval);
        let span = info_span!("watch", session = %session.id, job = %handle);
        observer.on_event(&WatchEvent::Started {
            session: session.id,
            timeout: self.config.timeout,
            poll_interval: self.config.poll_interval,
        });

        let outcome = self
            .poll_until_settled(&mut session, query, observer, cancel)
            .instrument(span)
            .await;

        observer.on_event(&WatchEvent::Finished {
            outcome: outcome.clone(),
            queries: session.queries,
            elapsed: session.elapsed(),
        });
        outcome
    }

    /// Run a watch on its own task. The returned handle can cancel it and
    /// collect its outcome.
    pub fn spawn<Q, O>(&self, handle: JobHandle, query: Q, observer: O) -> WatchHandle
    where
        Q: StatusQuery + 'static,
        O: WatchObserver + 'static,
    {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let watcher = self.clone();
        let session_cancel = cancel.clone();
        tokio::spawn(async move {
            let outcome = watcher
                .watch(&handle, &query, &observer, &session_cancel)
                .await;
            // the handle may have been dropped; nobody is waiting then
            let _ = outcome_tx.send(outcome);
        });
        WatchHandle::new(outcome_rx, cancel)
    }

    async fn poll_until_settled<Q, O>(
        &self,
        session: &mut WatchSession<'_>,
        query: &Q,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Outcome
    where
        Q: StatusQuery + ?Sized,
        O: WatchObserver + ?Sized,
    {
        loop {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }
            if session.expired() {
                return Outcome::TimedOut;
            }

            session.queries += 1;
            let attempt = session.queries;
            let deadline = session.deadline();
            let result = select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                // a stalled query must not hold the session past its deadline
                _ = tokio::time::sleep_until(deadline) => return Outcome::TimedOut,
                result = query.query_status(session.handle) => result,
            };

            match result {
                Ok(report) => {
                    session.consecutive_failures = 0;
                    let status = report.status;
                    let settled = report.terminal_outcome();
                    observer.on_event(&WatchEvent::Polled {
                        attempt,
                        elapsed: session.elapsed(),
                        report,
                    });
                    if session.last_status != Some(status) {
                        observer.on_event(&WatchEvent::StatusChanged {
                            from: session.last_status,
                            to: status,
                        });
                        session.last_status = Some(status);
                    }
                    if let Some(outcome) = settled {
                        return outcome;
                    }
                }
                Err(failure) => {
                    session.consecutive_failures += 1;
                    let consecutive = session.consecutive_failures;
                    warn!(attempt, consecutive, error = %failure, "status query failed");
                    observer.on_event(&WatchEvent::QueryFailed {
                        attempt,
                        consecutive,
                        error: failure.to_string(),
                    });
                    if consecutive >= self.config.max_query_failures {
                        return Outcome::QueryError {
                            failures: consecutive,
                            last_error: failure.to_string(),
                        };
                    }
                }
            }

            let wait = session.next_wait();
            debug!(?wait, "waiting before next status query");
            select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryFailure;
    use crate::events::{JobStatus, StatusReport};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type Step = Result<StatusReport, QueryFailure>;

    /// Plays back a fixed sequence of answers, repeating the last one forever.
    struct ScriptedQuery {
        script: Mutex<VecDeque<Step>>,
        calls: AtomicU32,
    }

    impl ScriptedQuery {
        fn new(script: impl IntoIterator<Item = Step>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn statuses(statuses: &[JobStatus]) -> Self {
            Self::new(statuses.iter().map(|s| Ok(StatusReport::new(*s))))
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusQuery for ScriptedQuery {
        async fn query_status(&self, _handle: &JobHandle) -> Result<StatusReport, QueryFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().expect("empty script")
            }
        }
    }

    fn handle() -> JobHandle {
        JobHandle::new("d2kq9example", "main").with_job_id("1")
    }

    fn config(timeout_secs: u64, interval_secs: u64) -> WatchConfig {
        WatchConfig::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(interval_secs),
            3,
        )
        .unwrap()
    }

    async fn run(watcher: &Watcher, query: &ScriptedQuery) -> Outcome {
        watcher
            .watch(&handle(), query, &|_: &WatchEvent| {}, &CancellationToken::new())
            .await
    }

    fn transient() -> Step {
        Err(QueryFailure::Transport("connection reset".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_running_then_succeeded() {
        use JobStatus::*;
        let watcher = Watcher::new(config(300, 10));
        let query = ScriptedQuery::statuses(&[Pending, Pending, Running, Succeeded]);
        let start = Instant::now();

        assert_eq!(run(&watcher, &query).await, Outcome::Success);
        assert_eq!(query.calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_running_times_out_after_thirty_queries() {
        let watcher = Watcher::new(config(300, 10));
        let query = ScriptedQuery::statuses(&[JobStatus::Running]);
        let start = Instant::now();

        assert_eq!(run(&watcher, &query).await, Outcome::TimedOut);
        assert_eq!(query.calls(), 30);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_not_a_multiple_of_interval_rounds_queries_up() {
        let watcher = Watcher::new(config(25, 10));
        let query = ScriptedQuery::statuses(&[JobStatus::Pending]);
        let start = Instant::now();

        assert_eq!(run(&watcher, &query).await, Outcome::TimedOut);
        assert_eq!(query.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn running_then_failed_reports_remote_reason() {
        let watcher = Watcher::new(config(300, 10));
        let query = ScriptedQuery::new([
            Ok(StatusReport::new(JobStatus::Running)),
            Ok(StatusReport::new(JobStatus::Failed).with_reason("DEPLOY: missing index.html")),
        ]);

        assert_eq!(
            run(&watcher, &query).await,
            Outcome::Failure("DEPLOY: missing index.html".into())
        );
        assert_eq!(query.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_status_stops_polling_immediately() {
        use JobStatus::*;
        for terminal in [Succeeded, Failed, Cancelled] {
            let watcher = Watcher::new(config(300, 10));
            // anything after the terminal status must never be asked for
            let query = ScriptedQuery::statuses(&[terminal, Running]);
            let start = Instant::now();

            let outcome = run(&watcher, &query).await;
            assert_eq!(query.calls(), 1, "{} issued extra queries", terminal);
            assert_eq!(start.elapsed(), Duration::ZERO);
            match terminal {
                Succeeded => assert_eq!(outcome, Outcome::Success),
                _ => assert!(matches!(outcome, Outcome::Failure(_))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn n_in_flight_polls_cost_n_plus_one_queries() {
        for n in 0..6usize {
            let watcher = Watcher::new(config(300, 10));
            let mut script = vec![JobStatus::Running; n];
            script.push(JobStatus::Succeeded);
            let query = ScriptedQuery::statuses(&script);

            assert_eq!(run(&watcher, &query).await, Outcome::Success);
            assert_eq!(query.calls(), n as u32 + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_failure_budget_is_a_query_error() {
        let watcher = Watcher::new(config(300, 10));
        // success is scripted after the budget runs out and must not be reached
        let query = ScriptedQuery::new([
            transient(),
            transient(),
            transient(),
            Ok(StatusReport::new(JobStatus::Succeeded)),
        ]);

        let outcome = run(&watcher, &query).await;
        assert_eq!(
            outcome,
            Outcome::QueryError {
                failures: 3,
                last_error: "transport error: connection reset".into(),
            }
        );
        assert_eq!(query.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_query_resets_failure_count() {
        let watcher = Watcher::new(config(300, 10));
        let query = ScriptedQuery::new([
            transient(),
            transient(),
            Ok(StatusReport::new(JobStatus::Running)),
            transient(),
            transient(),
            Ok(StatusReport::new(JobStatus::Succeeded)),
        ]);

        assert_eq!(run(&watcher, &query).await, Outcome::Success);
        assert_eq!(query.calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn rewatching_a_succeeded_job_is_idempotent() {
        let watcher = Watcher::default();
        let query = ScriptedQuery::statuses(&[JobStatus::Succeeded]);

        assert_eq!(run(&watcher, &query).await, Outcome::Success);
        assert_eq!(run(&watcher, &query).await, Outcome::Success);
        assert_eq!(query.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_without_active_run_keeps_polling() {
        let watcher = Watcher::new(config(300, 10));
        let query = ScriptedQuery::new([
            Ok(StatusReport::not_started()),
            Ok(StatusReport::not_started()),
            Ok(StatusReport::new(JobStatus::Succeeded).with_job_id("1")),
        ]);
        let unassigned = JobHandle::new("d2kq9example", "main");

        let outcome = watcher
            .watch(
                &unassigned,
                &query,
                &|_: &WatchEvent| {},
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(query.calls(), 3);
    }

    /// Never answers, like a connection that hangs without a transport timeout.
    #[derive(Default)]
    struct HungQuery {
        calls: AtomicU32,
    }

    #[async_trait]
    impl StatusQuery for HungQuery {
        async fn query_status(&self, _handle: &JobHandle) -> Result<StatusReport, QueryFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_query_times_out_at_the_deadline() {
        let watcher = Watcher::new(config(300, 10));
        let query = HungQuery::default();
        let start = Instant::now();

        let outcome = tokio::time::timeout(
            Duration::from_secs(3600),
            watcher.watch(&handle(), &query, &|_: &WatchEvent| {}, &CancellationToken::new()),
        )
        .await;

        assert_eq!(outcome, Ok(Outcome::TimedOut));
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_while_a_query_is_in_flight() {
        let watcher = Watcher::new(config(300, 10));
        let query = HungQuery::default();
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });
        let start = Instant::now();

        let outcome = watcher
            .watch(&handle(), &query, &|_: &WatchEvent| {}, &cancel)
            .await;

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_can_arrive_before_failure_budget_runs_out() {
        let watcher = Watcher::new(
            WatchConfig::new(Duration::from_secs(25), Duration::from_secs(10), 5).unwrap(),
        );
        let query = ScriptedQuery::new([transient()]);

        assert_eq!(run(&watcher, &query).await, Outcome::TimedOut);
        assert_eq!(query.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_issues_no_query() {
        let watcher = Watcher::default();
        let query = ScriptedQuery::statuses(&[JobStatus::Running]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = watcher
            .watch(&handle(), &query, &|_: &WatchEvent| {}, &cancel)
            .await;
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(query.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_a_spawned_watch_stops_during_the_wait() {
        let watcher = Watcher::new(config(300, 10));
        let query = Arc::new(ScriptedQuery::statuses(&[JobStatus::Running]));
        let watch = watcher.spawn(handle(), Arc::clone(&query), |_: &WatchEvent| {});

        // queries go out at 0s and 10s; cancel while waiting for 20s
        tokio::time::sleep(Duration::from_secs(15)).await;
        watch.cancel();

        assert_eq!(watch.outcome().await, Outcome::Cancelled);
        assert_eq!(query.calls(), 2);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(query.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_watches_run_independently() {
        let watcher = Watcher::new(config(300, 10));
        let fast = watcher.spawn(
            handle(),
            ScriptedQuery::statuses(&[JobStatus::Running, JobStatus::Succeeded]),
            |_: &WatchEvent| {},
        );
        let slow = watcher.spawn(
            JobHandle::new("d9other", "main").with_job_id("4"),
            ScriptedQuery::statuses(&[JobStatus::Running, JobStatus::Running, JobStatus::Failed]),
            |_: &WatchEvent| {},
        );

        assert_eq!(fast.outcome().await, Outcome::Success);
        assert!(matches!(slow.outcome().await, Outcome::Failure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_every_poll_and_each_transition() {
        use JobStatus::*;
        let watcher = Watcher::new(config(300, 10));
        let query = ScriptedQuery::statuses(&[Pending, Pending, Running, Succeeded]);
        let events = Mutex::new(Vec::new());
        let observer = |event: &WatchEvent| events.lock().unwrap().push(event.clone());

        watcher
            .watch(&handle(), &query, &observer, &CancellationToken::new())
            .await;

        let events = events.into_inner().unwrap();
        assert!(matches!(events.first(), Some(WatchEvent::Started { .. })));
        let polled = events
            .iter()
            .filter(|e| matches!(e, WatchEvent::Polled { .. }))
            .count();
        assert_eq!(polled, 4);
        let transitions: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WatchEvent::StatusChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (None, Pending),
                (Some(Pending), Running),
                (Some(Running), Succeeded)
            ]
        );
        match events.last() {
            Some(WatchEvent::Finished {
                outcome, queries, ..
            }) => {
                assert_eq!(*outcome, Outcome::Success);
                assert_eq!(*queries, 4);
            }
            other => panic!("expected Finished event last, got {:?}", other),
        }
    }

    #[test]
    fn config_rejects_nonsense_limits() {
        let secs = Duration::from_secs;
        assert_eq!(
            WatchConfig::new(Duration::ZERO, secs(10), 3),
            Err(WatchConfigError::ZeroTimeout)
        );
        assert_eq!(
            WatchConfig::new(secs(300), Duration::ZERO, 3),
            Err(WatchConfigError::ZeroPollInterval)
        );
        assert_eq!(
            WatchConfig::new(secs(5), secs(10), 3),
            Err(WatchConfigError::IntervalExceedsTimeout {
                interval: secs(10),
                timeout: secs(5),
            })
        );
        assert_eq!(
            WatchConfig::new(secs(300), secs(10), 0),
            Err(WatchConfigError::ZeroFailureBudget)
        );
        assert_eq!(
            WatchConfig::new(secs(300), secs(10), 3),
            Ok(WatchConfig::default())
        );
    }
}
