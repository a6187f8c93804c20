use std::future::Future;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{RefineError, Result, RetryPolicy};

/// Runs a fallible async operation under a [`RetryPolicy`].
///
/// The first attempt runs immediately. After a retryable failure the
/// executor sleeps for [`RetryPolicy::calculate_delay`] and tries again, up
/// to `max_retries` more times. A non-retryable failure is returned as-is
/// after the attempt that produced it; running out of attempts yields
/// [`RefineError::RetriesExhausted`] wrapping the last failure.
///
/// Sleeping only suspends the calling task. If a cancellation token is
/// attached and fires during a backoff sleep, [`RefineError::Interrupted`]
/// is returned and no further attempt is made.
#[derive(Clone, Debug, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Attaches a token that aborts the executor while it waits between attempts.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.policy.max_retries();
        let mut attempt = 0usize;

        loop {
            if attempt > 0 {
                self.wait_before_retry(attempt).await?;
            }

            tracing::debug!(
                "executing operation (attempt {}/{})",
                attempt.saturating_add(1),
                max_retries.saturating_add(1)
            );

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempt += 1;
            if attempt > max_retries {
                tracing::error!("max retries ({max_retries}) exceeded: {err}");
                return Err(RefineError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            if !err.is_retryable() {
                tracing::warn!("non-retryable error on attempt {attempt}: {err}");
                return Err(err);
            }

            tracing::warn!("retryable error on attempt {attempt}: {err}");
        }
    }

    async fn wait_before_retry(&self, attempt: usize) -> Result<()> {
        let delay = self.policy.calculate_delay(attempt);
        tracing::info!(
            "retrying after {} ms (attempt {}/{})",
            delay.as_millis(),
            attempt,
            self.policy.max_retries()
        );

        match &self.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::warn!(
                            "backoff interrupted before attempt {}",
                            attempt.saturating_add(1)
                        );
                        Err(RefineError::Interrupted)
                    }
                    _ = sleep(delay) => Ok(()),
                }
            }
            None => {
                sleep(delay).await;
                Ok(())
            }
        }
    }
}
