//! Cancellation and deadline context for retried operations.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context wait ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The deadline passed.
    Deadline,
    /// The cancellation token fired.
    Cancelled,
}

impl std::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupted::Deadline => write!(f, "deadline exceeded"),
            Interrupted::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Ambient context of a reconciliation call.
///
/// Carries the host's timeout for the operation and a cancellation signal.
/// Cloning shares the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    /// Creates a context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Uses an existing cancellation token, typically a child of the host's.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cancels the context and every clone of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns why the context is finished, if it is.
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.cancel.is_cancelled() {
            return Some(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupted::Deadline),
            _ => None,
        }
    }

    /// Sleeps for `delay`, waking early if the context finishes.
    ///
    /// A delay reaching past the deadline sleeps only until the deadline and
    /// then reports [`Interrupted::Deadline`].
    pub async fn sleep(&self, delay: Duration) -> Result<(), Interrupted> {
        if let Some(reason) = self.interrupted() {
            return Err(reason);
        }

        let wake = Instant::now().checked_add(delay);
        let (until, hits_deadline) = match (wake, self.deadline) {
            (Some(wake), Some(deadline)) if deadline <= wake => (deadline, true),
            (Some(wake), _) => (wake, false),
            (None, Some(deadline)) => (deadline, true),
            (None, None) => {
                self.cancel.cancelled().await;
                return Err(Interrupted::Cancelled);
            }
        };

        tokio::select! {
            () = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            () = tokio::time::sleep_until(until) => {
                if hits_deadline {
                    Err(Interrupted::Deadline)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_deadline() {
        let ctx = OperationContext::new();
        let start = Instant::now();

        assert_eq!(ctx.sleep(Duration::from_secs(5)).await, Ok(()));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_stops_at_deadline() {
        let ctx = OperationContext::with_timeout(Duration::from_secs(2));
        let start = Instant::now();

        assert_eq!(
            ctx.sleep(Duration::from_secs(60)).await,
            Err(Interrupted::Deadline)
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_cancellation() {
        let ctx = OperationContext::new();
        let canceller = ctx.clone();
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        assert_eq!(
            ctx.sleep(Duration::from_secs(300)).await,
            Err(Interrupted::Cancelled)
        );
        assert!(start.elapsed() < Duration::from_secs(300));
    }

    #[test]
    fn test_interrupted_when_cancelled() {
        let ctx = OperationContext::new();
        assert_eq!(ctx.interrupted(), None);

        ctx.cancel();
        assert_eq!(ctx.interrupted(), Some(Interrupted::Cancelled));
    }

    #[test]
    fn test_host_token_cancels_context() {
        let host = CancellationToken::new();
        let ctx = OperationContext::with_timeout(Duration::from_secs(60))
            .with_cancellation(host.child_token());
        assert_eq!(ctx.interrupted(), None);

        host.cancel();
        assert_eq!(ctx.interrupted(), Some(Interrupted::Cancelled));
        assert_eq!(Interrupted::Cancelled.to_string(), "cancelled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_after_deadline_passes() {
        let ctx = OperationContext::with_timeout(Duration::from_secs(1));
        assert_eq!(ctx.interrupted(), None);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(ctx.interrupted(), Some(Interrupted::Deadline));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }
}
