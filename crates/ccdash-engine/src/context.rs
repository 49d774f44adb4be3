//! Per-request cancellation and timeout
//!
//! Every store call made on behalf of a report runs through
//! [`RequestContext::run_step`], which races the call against the caller's
//! cancellation token and the optional per-step timeout. Losing the race
//! drops the in-flight store future.

use std::future::Future;
use std::time::{Duration, Instant};

use ccdash_core::{Error, ReportObserver, Result};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl RequestContext {
    /// A context that is never cancelled and has no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-owned cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Apply `timeout` only if no timeout has been set yet
    pub fn or_timeout(mut self, timeout: Option<Duration>) -> Self {
        if self.timeout.is_none() {
            self.timeout = timeout;
        }
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one named store step
    ///
    /// # Errors
    /// - `Error::Cancelled` if the token fires first (or already fired)
    /// - `Error::Timeout` if the step outlives the timeout
    /// - the step's own error, tagged with `step` via [`Error::in_step`]
    pub async fn run_step<T, F>(&self, step: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                step: step.to_string(),
            });
        }

        let bounded = async {
            match self.timeout {
                Some(after) => match tokio::time::timeout(after, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout {
                        step: step.to_string(),
                        after,
                    }),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled {
                step: step.to_string(),
            }),
            result = bounded => result.map_err(|e| e.in_step(step)),
        }
    }
}

/// Run a step and report its duration to `observer`, whatever the outcome
pub(crate) async fn observed_step<T, F>(
    observer: &dyn ReportObserver,
    ctx: &RequestContext,
    step: &str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = ctx.run_step(step, fut).await;
    observer.step_completed(step, started.elapsed());
    result
}
