//! Generic polling for server-side asynchronous jobs.
//!
//! Retrieve and deploy jobs share the same shape: submit once, then watch
//! the status channel until a terminal state. The loop here is do-while —
//! at least one status check always happens after submission, because some
//! completions are only observable through the status channel even when
//! the server finishes fast.
//!
//! Status classification is the caller's job: the check closure returns
//! [`Probe::InProgress`] for recognized in-flight statuses, [`Probe::Done`]
//! with the payload on terminal success, and an error for anything else.
//! Unrecognized statuses are deliberately never retried; they usually mean
//! a new server-side failure mode that must not pass silently.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};

/// Poll loop tuning.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between status checks.
    pub interval: Duration,
    /// Overall bound on polling; `None` polls until a terminal status.
    pub timeout: Option<Duration>,
    /// Bound on the number of status checks; `None` is unbounded.
    pub max_checks: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(600)),
            max_checks: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_checks(mut self, max_checks: Option<u32>) -> Self {
        self.max_checks = max_checks;
        self
    }
}

/// Outcome of one status check.
#[derive(Debug, Clone)]
pub enum Probe<T> {
    /// Recognized in-flight status; keep polling.
    InProgress(String),
    /// Terminal success, with the job's payload.
    Done(T),
}

/// Create a linked cancel handle/token pair.
///
/// The token is passed to a polling call; the handle cancels it from
/// elsewhere. Cancellation is observed at the next poll tick.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Cancels an in-flight polling call.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observed by the poll loop at every tick.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancelled; pend forever if the handle is dropped
    /// without cancelling.
    async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Drive a submitted job to its terminal state.
///
/// Sleeps `config.interval`, then runs `check`, repeating until the check
/// reports [`Probe::Done`] or fails. The configured `timeout`/`max_checks`
/// bounds turn endless in-progress answers into [`ErrorKind::Timeout`];
/// a cancel signal turns into [`ErrorKind::Cancelled`] at the next tick.
pub async fn poll<T, C, Fut>(
    config: &PollConfig,
    mut cancel: Option<CancelToken>,
    mut check: C,
) -> Result<T>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let deadline = config.timeout.map(|t| tokio::time::Instant::now() + t);
    let mut checks: u32 = 0;

    loop {
        match cancel.as_mut() {
            Some(token) => tokio::select! {
                _ = tokio::time::sleep(config.interval) => {}
                _ = token.cancelled() => return Err(Error::new(ErrorKind::Cancelled)),
            },
            None => tokio::time::sleep(config.interval).await,
        }

        let status = match check().await? {
            Probe::Done(payload) => return Ok(payload),
            Probe::InProgress(status) => status,
        };
        checks += 1;
        debug!(status = %status, checks, "job still in progress");

        let out_of_time = deadline.is_some_and(|d| tokio::time::Instant::now() >= d);
        let out_of_checks = config.max_checks.is_some_and(|max| checks >= max);
        if out_of_time || out_of_checks {
            return Err(Error::new(ErrorKind::Timeout {
                last_status: status,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    fn script(statuses: &[&str]) -> Mutex<VecDeque<String>> {
        Mutex::new(statuses.iter().map(|s| s.to_string()).collect())
    }

    async fn probe_from(script: &Mutex<VecDeque<String>>) -> Result<Probe<&'static str>> {
        let status = script.lock().unwrap().pop_front().expect("script exhausted");
        match status.as_str() {
            "Succeeded" => Ok(Probe::Done("payload")),
            "Pending" | "InProgress" | "Queued" => Ok(Probe::InProgress(status)),
            other => Err(Error::new(ErrorKind::UnexpectedStatus {
                status: other.to_string(),
                detail: None,
            })),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_statuses_mean_three_checks_and_sleeps() {
        let config = PollConfig::default();
        let statuses = script(&["Pending", "InProgress", "Succeeded"]);

        let started = tokio::time::Instant::now();
        let payload = poll(&config, None, || probe_from(&statuses))
            .await
            .unwrap();

        assert_eq!(payload, "payload");
        assert!(statuses.lock().unwrap().is_empty(), "exactly 3 checks");
        // One sleep per check, nothing more.
        assert_eq!(started.elapsed(), config.interval * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_completion_still_checks_once() {
        let config = PollConfig::default();
        let statuses = script(&["Succeeded"]);

        let started = tokio::time::Instant::now();
        poll(&config, None, || probe_from(&statuses)).await.unwrap();

        assert!(statuses.lock().unwrap().is_empty());
        assert_eq!(started.elapsed(), config.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_status_is_fatal() {
        let config = PollConfig::default();
        let statuses = script(&["Pending", "Failed"]);

        let err = poll(&config, None, || probe_from(&statuses))
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind,
            ErrorKind::UnexpectedStatus { ref status, .. } if status == "Failed"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_checks_bound() {
        let config = PollConfig::default().with_max_checks(Some(3));
        let statuses = script(&["Pending", "Pending", "Pending", "Pending"]);

        let err = poll(&config, None, || probe_from(&statuses))
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind,
            ErrorKind::Timeout { ref last_status } if last_status == "Pending"
        ));
        // The fourth scripted status was never consumed.
        assert_eq!(statuses.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bound() {
        let config = PollConfig::default()
            .with_interval(Duration::from_secs(5))
            .with_timeout(Some(Duration::from_secs(12)));
        let statuses = script(&["Pending", "Pending", "Pending", "Pending"]);

        let err = poll(&config, None, || probe_from(&statuses))
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_observed_at_tick() {
        let config = PollConfig::default();
        let statuses = script(&["Pending", "Pending"]);
        let (handle, token) = cancellation();
        handle.cancel();

        let err = poll(&config, Some(token), || probe_from(&statuses))
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Cancelled));
        // Cancelled before any check ran.
        assert_eq!(statuses.lock().unwrap().len(), 2);
    }
}
