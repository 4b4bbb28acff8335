//! Bounded polling for asynchronously provisioned resources.
//!
//! A freshly created resource is usually not readable right away: the
//! backend answers 404 for a while, then reports a provisioning status,
//! then becomes ready. The functions here poll a caller supplied read until
//! the resource is ready, a run of errors exceeds the threshold, or the
//! deadline passes.
//!
//! Both the read and every sleep race the deadline, so a hung read cannot
//! outlive it.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

use crate::error::{is_not_found, ProviderError, Result};

/// Pause after a not-found read.
pub const NOT_FOUND_INTERVAL: Duration = Duration::from_secs(10);

/// Pause after a failed read.
///
/// The addon deployment waiter's pause. CDN route deployments used 10s;
/// set [`WaitOptions::error_interval`] to restore that.
pub const ERROR_INTERVAL: Duration = Duration::from_secs(15);

/// Pause after a read that found the resource still provisioning.
pub const PROVISIONING_INTERVAL: Duration = Duration::from_secs(15);

/// Consecutive failed reads tolerated before giving up.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Budget for activating a single resource.
pub const SHORT_BUDGET: Duration = Duration::from_secs(5 * 60);

/// Budget for composite resources that deploy several parts.
pub const LONG_BUDGET: Duration = Duration::from_secs(10 * 60);

/// Budget for waiting until a resource is gone.
pub const DELETION_BUDGET: Duration = Duration::from_secs(30 * 60);

/// Poll interval while waiting for deletion.
pub const DELETION_POLL: Duration = Duration::from_secs(5);

// Stand-in deadline for budgets too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Tuning for one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// How long to keep polling.
    pub budget: Duration,
    /// Deadline imposed by the caller. The earlier of this and
    /// `start + budget` wins.
    pub deadline: Option<Instant>,
    /// Pause after a not-found read.
    pub not_found_interval: Duration,
    /// Pause after a failed read.
    pub error_interval: Duration,
    /// Pause after a successful read that is not ready yet.
    pub provisioning_interval: Duration,
    /// Consecutive failed reads tolerated before giving up.
    pub max_consecutive_errors: u32,
    /// Treat not-found as "not visible yet" rather than as a failure.
    pub tolerate_not_found: bool,
    /// Clear the consecutive error count on a read that is not ready yet.
    /// Off, errors keep counting across such reads, as the CDN route
    /// deployment waiter did.
    pub reset_errors_on_pending: bool,
}

impl WaitOptions {
    /// Options with the standard intervals and the given budget.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            deadline: None,
            not_found_interval: NOT_FOUND_INTERVAL,
            error_interval: ERROR_INTERVAL,
            provisioning_interval: PROVISIONING_INTERVAL,
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            tolerate_not_found: true,
            reset_errors_on_pending: true,
        }
    }

    /// Options for activating a single resource.
    pub fn short() -> Self {
        Self::new(SHORT_BUDGET)
    }

    /// Options for composite resources.
    pub fn long() -> Self {
        Self::new(LONG_BUDGET)
    }

    /// Options for [`wait_deleted`].
    pub fn deletion() -> Self {
        Self {
            provisioning_interval: DELETION_POLL,
            ..Self::new(DELETION_BUDGET)
        }
    }

    /// Stop no later than `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Change the consecutive error threshold.
    pub fn with_max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Count not-found reads as failures.
    pub fn tolerate_not_found(mut self, tolerate: bool) -> Self {
        self.tolerate_not_found = tolerate;
        self
    }

    /// Keep or clear the error count across not-ready reads.
    pub fn reset_errors_on_pending(mut self, reset: bool) -> Self {
        self.reset_errors_on_pending = reset;
        self
    }

    fn deadline_from(&self, start: Instant) -> Instant {
        match (start.checked_add(self.budget), self.deadline) {
            (Some(own), Some(caller)) if caller < own => caller,
            (Some(own), _) => own,
            (None, Some(caller)) => caller,
            (None, None) => start.checked_add(FAR_FUTURE).unwrap_or(start),
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::short()
    }
}

/// Progress of a single wait.
#[derive(Debug)]
pub struct PollState {
    /// Reads issued so far.
    pub attempts: u32,
    /// Failed reads since the last successful one.
    pub consecutive_errors: u32,
    /// When the wait started.
    pub started: Instant,
    /// The most recent error seen.
    pub last_error: Option<ProviderError>,
}

impl PollState {
    fn new() -> Self {
        Self {
            attempts: 0,
            consecutive_errors: 0,
            started: Instant::now(),
            last_error: None,
        }
    }

    /// Time since the wait started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn timeout(&mut self, resource: &str, budget: Duration) -> ProviderError {
        warn!(
            resource,
            attempts = self.attempts,
            elapsed = ?self.elapsed(),
            "ready check timed out"
        );
        ProviderError::Timeout {
            resource: resource.to_string(),
            budget,
            last_error: self.last_error.take().map(Box::new),
        }
    }
}

enum Outcome<R> {
    Done(R),
    Pending,
    Absent(ProviderError),
    Failed(ProviderError),
}

async fn poll<T, R, F, Fut, J>(
    resource: &str,
    options: &WaitOptions,
    mut read: F,
    mut judge: J,
) -> Result<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    J: FnMut(Result<T>) -> Outcome<R>,
{
    let mut state = PollState::new();
    let deadline = options.deadline_from(state.started);

    loop {
        if Instant::now() >= deadline {
            return Err(state.timeout(resource, options.budget));
        }

        state.attempts += 1;
        let outcome = tokio::select! {
            result = read() => judge(result),
            _ = sleep_until(deadline) => return Err(state.timeout(resource, options.budget)),
        };

        let pause = match outcome {
            Outcome::Done(value) => {
                debug!(resource, attempts = state.attempts, "ready check finished");
                return Ok(value);
            }
            Outcome::Pending => {
                debug!(resource, attempt = state.attempts, "still provisioning");
                if options.reset_errors_on_pending {
                    state.consecutive_errors = 0;
                }
                options.provisioning_interval
            }
            Outcome::Absent(err) => {
                debug!(resource, attempt = state.attempts, "not visible yet");
                state.last_error = Some(err);
                options.not_found_interval
            }
            Outcome::Failed(err) => {
                state.consecutive_errors += 1;
                if state.consecutive_errors > options.max_consecutive_errors {
                    return Err(ProviderError::RetryLimitExceeded {
                        resource: resource.to_string(),
                        limit: options.max_consecutive_errors,
                        source: Box::new(err),
                    });
                }
                debug!(
                    resource,
                    attempt = state.attempts,
                    consecutive_errors = state.consecutive_errors,
                    error = %err,
                    "ready check failed, retrying"
                );
                state.last_error = Some(err);
                options.error_interval
            }
        };

        tokio::select! {
            _ = sleep(pause) => {}
            _ = sleep_until(deadline) => return Err(state.timeout(resource, options.budget)),
        }
    }
}

/// Poll `read` until it succeeds.
pub async fn wait_ready<T, F, Fut>(resource: &str, options: &WaitOptions, read: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    wait_ready_when(resource, options, read, |_| true).await
}

/// Poll `read` until it succeeds with a status `is_provisioned` accepts.
///
/// A successful read that is not provisioned yet resets the consecutive
/// error counter unless [`WaitOptions::reset_errors_on_pending`] is off.
pub async fn wait_ready_when<T, F, Fut, P>(
    resource: &str,
    options: &WaitOptions,
    read: F,
    is_provisioned: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let tolerate = options.tolerate_not_found;
    poll(resource, options, read, |result| match result {
        Ok(status) if is_provisioned(&status) => Outcome::Done(status),
        Ok(_) => Outcome::Pending,
        Err(err) if tolerate && is_not_found(&err) => Outcome::Absent(err),
        Err(err) => Outcome::Failed(err),
    })
    .await
}

/// Poll `read` until it reports the resource as not found.
pub async fn wait_deleted<T, F, Fut>(resource: &str, options: &WaitOptions, read: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    poll(resource, options, read, |result| match result {
        Ok(_) => Outcome::Pending,
        Err(err) if is_not_found(&err) => Outcome::Done(()),
        Err(err) => Outcome::Failed(err),
    })
    .await
}

/// A resource that knows how to read its own status.
///
/// Implement this when the read needs more context than a closure
/// comfortably carries, then drive it with [`wait_for`].
#[async_trait]
pub trait ReadyCheck: Send + Sync {
    /// What a successful read returns.
    type Status: Send;

    /// Label used in logs and errors, e.g. `Addon CDN[123]`.
    fn resource(&self) -> String;

    /// Read the current status.
    async fn read(&self) -> Result<Self::Status>;

    /// Whether the status means the resource is fully provisioned.
    fn is_provisioned(&self, _status: &Self::Status) -> bool {
        true
    }
}

/// Wait until `check` reports a provisioned status.
pub async fn wait_for<C>(check: &C, options: &WaitOptions) -> Result<C::Status>
where
    C: ReadyCheck + ?Sized,
{
    let resource = check.resource();
    wait_ready_when(&resource, options, || check.read(), |status| {
        check.is_provisioned(status)
    })
    .await
}
