use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Operation, Result, StorageError, StorageFailure};

/// Per-call bound used by stores unless configured otherwise.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Cancellation and deadline signal propagated from the caller's request.
///
/// Every store call takes one of these in addition to its own per-call
/// timeout. Whichever fires first (the caller's token, the caller's deadline,
/// or the store's timeout) aborts the in-flight engine call by dropping it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that aborts when `token` is cancelled.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline, keeping the earlier one if already set.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time budget for a call limited to `limit` under this context.
    pub fn budget(&self, limit: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => limit.min(deadline.saturating_duration_since(Instant::now())),
            None => limit,
        }
    }

    /// Runs `fut` bounded by `limit`, the caller's deadline and cancellation.
    ///
    /// Timeouts and cancellation surface as [`StorageError::Storage`] with the
    /// matching [`StorageFailure`] kind.
    pub async fn run<T, F>(&self, op: Operation, limit: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(StorageError::storage(
                op,
                StorageFailure::Cancelled,
                "request cancelled before the call started",
            ));
        }

        let budget = self.budget(limit);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(op = %op, "store call cancelled by caller");
                Err(StorageError::storage(
                    op,
                    StorageFailure::Cancelled,
                    "request cancelled by caller",
                ))
            }
            outcome = tokio::time::timeout(budget, fut) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    debug!(op = %op, budget_ms = budget.as_millis() as u64, "store call timed out");
                    Err(StorageError::storage(
                        op,
                        StorageFailure::Timeout,
                        format!("no response within {budget:?}"),
                    ))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(3);

    async fn stalled() -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    #[tokio::test]
    async fn passes_through_completed_results() {
        let ctx = RequestContext::background();
        let value = ctx.run(Operation::GetUrl, LIMIT, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = ctx
            .run::<(), _>(Operation::GetUrl, LIMIT, async {
                Err(StorageError::UrlNotFound {
                    op: Operation::GetUrl,
                    alias: "nope".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_times_out() {
        let ctx = RequestContext::background();
        let err = ctx.run(Operation::SaveUrl, LIMIT, stalled()).await.unwrap_err();

        assert_eq!(err.storage_failure(), Some(StorageFailure::Timeout));
        assert_eq!(err.operation(), Operation::SaveUrl);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_shortens_budget() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(100));
        assert!(ctx.budget(LIMIT) <= Duration::from_millis(100));

        let started = Instant::now();
        let err = ctx.run(Operation::GetUrl, LIMIT, stalled()).await.unwrap_err();

        assert_eq!(err.storage_failure(), Some(StorageFailure::Timeout));
        assert!(started.elapsed() < LIMIT);
    }

    #[tokio::test]
    async fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = RequestContext::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn already_cancelled_context_fails_fast() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RequestContext::with_cancellation(token);

        let err = ctx
            .run(Operation::DeleteUrl, LIMIT, async { Ok(()) })
            .await
            .unwrap_err();
        assert_eq!(err.storage_failure(), Some(StorageFailure::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_in_flight_call() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = ctx.run(Operation::GetUrl, LIMIT, stalled()).await.unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.storage_failure(), Some(StorageFailure::Cancelled));
    }
}
