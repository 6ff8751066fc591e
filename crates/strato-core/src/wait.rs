//! Generic status polling
//!
//! Remote mutations (share provisioning, peering establishment, account
//! creation) return before the work is done; the resource then transitions
//! through a sequence of statuses. [`StateWaiter`] polls a caller-supplied
//! [`StatusProbe`] until the observed status lands in the target set, the
//! deadline passes, or something unexpected happens.
//!
//! The waiter never mutates anything itself. Probes must be safe to call
//! arbitrarily many times; a probe that needs to treat "404 not found" as
//! a terminal state (the delete paths do) maps it to a status value before
//! returning.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep_until};

use crate::error::{Result, WaitError};

/// Outcome of a single probe call.
#[derive(Debug)]
pub enum Probe<S, T> {
    /// The remote side reported a status. The waiter classifies it against
    /// the pending/target sets; `snapshot` is handed back to the caller
    /// untouched when waiting concludes successfully.
    Observed { status: S, snapshot: T },

    /// The probe itself failed. Waiting stops immediately.
    Failed(anyhow::Error),
}

/// A repeatable query for the current status of a remote operation.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    type Status: PartialEq + Display + Send + Sync;
    type Snapshot: Send;

    async fn probe(&self) -> Probe<Self::Status, Self::Snapshot>;
}

/// Timing and status-set configuration for one wait.
///
/// Constructed fresh per invocation. Durations left unset are zero and
/// mean "no delay" / "no tightening"; `timeout` is a hard cap on the total
/// wall time of the wait, including the initial delay.
#[derive(Debug, Clone)]
pub struct WaitSpec<S> {
    /// Statuses that permit continued polling.
    pub pending: Vec<S>,

    /// Statuses that signal successful completion.
    pub target: Vec<S>,

    /// Hard cap on total wait time.
    pub timeout: Duration,

    /// Cadence between probes.
    pub poll_interval: Duration,

    /// Wait before the very first probe.
    pub initial_delay: Duration,

    /// Lower bound on the sleep between probes.
    pub min_poll_interval: Duration,
}

impl<S: PartialEq> WaitSpec<S> {
    pub fn new(pending: Vec<S>, target: Vec<S>, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            poll_interval: Duration::ZERO,
            initial_delay: Duration::ZERO,
            min_poll_interval: Duration::ZERO,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn min_poll_interval(mut self, min: Duration) -> Self {
        self.min_poll_interval = min;
        self
    }

    fn effective_interval(&self) -> Duration {
        self.poll_interval.max(self.min_poll_interval)
    }
}

/// Polls a [`StatusProbe`] until the target status set is reached.
///
/// One waiter instance drives one logical flow; polls are strictly
/// sequential with a sleep between every pair of probes. Independent
/// waiters may run concurrently without shared state.
pub struct StateWaiter<P: StatusProbe> {
    probe: P,
    spec: WaitSpec<P::Status>,
}

impl<P: StatusProbe> StateWaiter<P> {
    pub fn new(probe: P, spec: WaitSpec<P::Status>) -> Self {
        Self { probe, spec }
    }

    /// Block until the probe reports a target status, returning its
    /// snapshot, or fail with the first terminal condition:
    ///
    /// - a status outside both sets → [`WaitError::UnexpectedStatus`]
    /// - a failed probe → [`WaitError::Probe`]
    /// - deadline exceeded while still pending → [`WaitError::Timeout`]
    pub async fn run(&self) -> Result<P::Snapshot> {
        let deadline = Instant::now() + self.spec.timeout;

        if !self.spec.initial_delay.is_zero() {
            sleep_until(deadline.min(Instant::now() + self.spec.initial_delay)).await;
        }

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.probe.probe().await {
                Probe::Failed(err) => return Err(WaitError::Probe(err)),
                Probe::Observed { status, snapshot } => {
                    if self.spec.target.contains(&status) {
                        tracing::debug!(%status, attempts, "target status reached");
                        return Ok(snapshot);
                    }
                    if !self.spec.pending.contains(&status) {
                        return Err(WaitError::UnexpectedStatus(status.to_string()));
                    }
                    tracing::trace!(%status, attempts, "still pending");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout(self.spec.timeout));
            }
            // Sleep for the configured cadence, but never past the deadline:
            // the probe after this sleep is the last one.
            sleep_until(deadline.min(now + self.spec.effective_interval())).await;
        }
    }

    /// Like [`StateWaiter::run`], but returns [`WaitError::Cancelled`] as
    /// soon as `cancel` completes, even mid-sleep or mid-probe.
    pub async fn run_with_cancel<F>(&self, cancel: F) -> Result<P::Snapshot>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run() => result,
            _ = cancel => Err(WaitError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum TestStatus {
        Creating,
        PendingAcceptance,
        Active,
        Rebuilding,
    }

    impl Display for TestStatus {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let s = match self {
                TestStatus::Creating => "CREATING",
                TestStatus::PendingAcceptance => "PENDING_ACCEPTANCE",
                TestStatus::Active => "ACTIVE",
                TestStatus::Rebuilding => "REBUILDING",
            };
            write!(f, "{s}")
        }
    }

    /// Replays a fixed status sequence; the last entry repeats forever.
    /// The snapshot is the 1-based probe count.
    struct ScriptedProbe {
        statuses: Vec<TestStatus>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(statuses: Vec<TestStatus>) -> Self {
            Self {
                statuses,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusProbe for ScriptedProbe {
        type Status = TestStatus;
        type Snapshot = usize;

        async fn probe(&self) -> Probe<TestStatus, usize> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self
                .statuses
                .get(n)
                .or_else(|| self.statuses.last())
                .cloned()
                .expect("script must not be empty");
            Probe::Observed {
                status,
                snapshot: n + 1,
            }
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl StatusProbe for FailingProbe {
        type Status = TestStatus;
        type Snapshot = usize;

        async fn probe(&self) -> Probe<TestStatus, usize> {
            Probe::Failed(anyhow::anyhow!("boom"))
        }
    }

    fn spec(pending: Vec<TestStatus>, target: Vec<TestStatus>) -> WaitSpec<TestStatus> {
        WaitSpec::new(pending, target, Duration::from_millis(100))
            .poll_interval(Duration::from_millis(30))
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_target_completes_without_sleeping() {
        let start = Instant::now();
        let waiter = StateWaiter::new(
            ScriptedProbe::new(vec![TestStatus::Active]),
            spec(vec![TestStatus::Creating], vec![TestStatus::Active]),
        );

        let snapshot = waiter.run().await.unwrap();
        assert_eq!(snapshot, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_pending_probes() {
        let probe = ScriptedProbe::new(vec![
            TestStatus::Creating,
            TestStatus::Creating,
            TestStatus::PendingAcceptance,
        ]);
        let waiter = StateWaiter::new(
            probe,
            spec(
                vec![TestStatus::Creating],
                vec![TestStatus::PendingAcceptance, TestStatus::Active],
            ),
        );

        let snapshot = waiter.run().await.unwrap();
        assert_eq!(snapshot, 3);
        assert_eq!(waiter.probe.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_the_deadline() {
        let start = Instant::now();
        let waiter = StateWaiter::new(
            ScriptedProbe::new(vec![TestStatus::Creating]),
            spec(vec![TestStatus::Creating], vec![TestStatus::Active]),
        );

        let err = waiter.run().await.unwrap_err();
        assert!(matches!(err, WaitError::Timeout(_)), "got {err:?}");

        // Deadline is a hard cap: the last probe fires at the deadline, not
        // a full poll interval past it.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(130), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_stops_polling() {
        let waiter = StateWaiter::new(
            ScriptedProbe::new(vec![TestStatus::Rebuilding]),
            spec(vec![TestStatus::Creating], vec![TestStatus::Active]),
        );

        let err = waiter.run().await.unwrap_err();
        match err {
            WaitError::UnexpectedStatus(s) => assert_eq!(s, "REBUILDING"),
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
        assert_eq!(waiter.probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_failure_propagates() {
        let waiter = StateWaiter::new(
            FailingProbe,
            spec(vec![TestStatus::Creating], vec![TestStatus::Active]),
        );

        let err = waiter.run().await.unwrap_err();
        assert!(matches!(err, WaitError::Probe(_)), "got {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn initial_delay_runs_before_first_probe() {
        let start = Instant::now();
        let waiter = StateWaiter::new(
            ScriptedProbe::new(vec![TestStatus::Active]),
            spec(vec![TestStatus::Creating], vec![TestStatus::Active])
                .initial_delay(Duration::from_millis(40)),
        );

        waiter.run().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_over_polling() {
        let start = Instant::now();
        let waiter = StateWaiter::new(
            ScriptedProbe::new(vec![TestStatus::Creating]),
            WaitSpec::new(
                vec![TestStatus::Creating],
                vec![TestStatus::Active],
                Duration::from_secs(600),
            )
            .poll_interval(Duration::from_secs(5)),
        );

        let err = waiter
            .run_with_cancel(tokio::time::sleep(Duration::from_millis(12)))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled), "got {err:?}");
        assert_eq!(start.elapsed(), Duration::from_millis(12));
    }
}
