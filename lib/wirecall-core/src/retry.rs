use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use http::header::RETRY_AFTER;
use http::{HeaderMap, StatusCode};

use crate::CallError;

/// Bounded exponential retry of transient failures.
///
/// An attempt is retried when it fails with a transient transport error or
/// with an API error whose status is one of [`transient_statuses`](Self::transient_statuses).
/// The first retry waits `base_interval`, each following one twice as long,
/// never more than `max_interval`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use wirecall_core::RetryPolicy;
///
/// let policy = RetryPolicy::default()
///     .with_max_attempts(3)
///     .with_base_interval(Duration::from_millis(250))
///     .with_max_interval(Duration::from_secs(1));
///
/// let delays: Vec<_> = policy.backoff().collect();
/// assert_eq!(delays, [Duration::from_millis(250), Duration::from_millis(500)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_interval: Duration,
    max_interval: Duration,
    transient_statuses: Vec<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            transient_statuses: vec![
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts, the first one included. `0` is treated as `1`.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay before the first retry.
    pub fn with_base_interval(mut self, base_interval: Duration) -> Self {
        self.base_interval = base_interval;
        self
    }

    /// Upper bound of any delay, `Retry-After` included.
    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Replaces the statuses considered transient.
    pub fn with_transient_statuses(
        mut self,
        statuses: impl IntoIterator<Item = StatusCode>,
    ) -> Self {
        self.transient_statuses = statuses.into_iter().collect();
        self
    }

    /// Total number of attempts.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before the first retry.
    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    /// Upper bound of any delay.
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Statuses retried when returned by the server.
    pub fn transient_statuses(&self) -> &[StatusCode] {
        &self.transient_statuses
    }

    /// The delays between attempts; yields `max_attempts - 1` values.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.base_interval)
            .with_max_delay(self.max_interval)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .build()
    }

    /// Whether a failed attempt may be retried.
    pub fn is_retryable(&self, error: &CallError) -> bool {
        match error {
            CallError::Transport(err) => err.is_transient(),
            CallError::Api { status, .. } => self.transient_statuses.contains(status),
            _ => false,
        }
    }

    /// The delay before retrying `error`: the server's `Retry-After` when it
    /// provides one, `computed` otherwise. Always capped at `max_interval`.
    pub fn delay_for(&self, error: &CallError, computed: Duration) -> Duration {
        error
            .response()
            .and_then(|response| retry_after(response.headers()))
            .unwrap_or(computed)
            .min(self.max_interval)
    }
}

/// Reads a `Retry-After` header expressed in seconds.
///
/// HTTP dates are not supported and yield `None`.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
