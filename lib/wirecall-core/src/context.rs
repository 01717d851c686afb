use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::CallError;

/// Caller-side cancellation and deadline of one call.
///
/// Every suspension point of a call (authentication, transport exchange,
/// backoff sleep) races against the context: when its deadline elapses the
/// call fails with [`CallError::DeadlineExceeded`], when its token is
/// cancelled with [`CallError::Cancelled`].
///
/// ```rust
/// use std::time::Duration;
/// use wirecall_core::CallContext;
///
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
/// let token = ctx.cancellation_token();
/// // `token.cancel()` from another task aborts the call.
/// # drop(token);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context without deadline, cancellable through its token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Uses an existing cancellation token, e.g. a child of a shutdown token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The token that cancels this context.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context already fired.
    ///
    /// # Errors
    ///
    /// [`CallError::Cancelled`] or [`CallError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), CallError> {
        if self.token.is_cancelled() {
            return Err(CallError::Cancelled);
        }
        if self.deadline.is_some_and(|at| at <= Instant::now()) {
            return Err(CallError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs `future` until it completes or the context fires.
    ///
    /// # Errors
    ///
    /// [`CallError::Cancelled`] or [`CallError::DeadlineExceeded`]; the future is dropped.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, CallError> {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(CallError::Cancelled),
            () = deadline => Err(CallError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }

    /// Sleeps for `delay` unless the context fires first.
    ///
    /// # Errors
    ///
    /// [`CallError::Cancelled`] or [`CallError::DeadlineExceeded`].
    pub async fn sleep(&self, delay: Duration) -> Result<(), CallError> {
        self.run(tokio::time::sleep(delay)).await
    }
}
