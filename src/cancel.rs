//! Cooperative cancellation for indexing batches and searches.
//!
//! A [`CancelToken`] fires when [`CancelToken::cancel`] is called on any
//! clone, or when its optional deadline passes. Work checks it between
//! units and races in-flight futures against [`CancelToken::cancelled`];
//! whatever was already committed stays committed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::error::{Error, Result};

/// Cancellation signal with an optional deadline. Clones share the signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that only fires when cancelled explicitly.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            deadline: None,
        }
    }

    /// A token that also fires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Add (or tighten) a deadline. The signal is still shared with the original.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Token with a deadline only when `timeout` is given.
    #[must_use]
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::new, Self::with_timeout)
    }

    /// Fire the signal for every clone.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let signal = async move {
            // The sender lives as long as `self`, so this only returns on `true`.
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = signal => {}
                    () = time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }

    /// Run `fut` unless the token fires first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if the token fired before `fut` finished;
    /// `fut` is dropped in that case.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_reaches_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
        clone.cancelled().await;
    }

    #[tokio::test]
    async fn test_run_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert_eq!(token.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_work() {
        let token = CancelToken::with_timeout(Duration::from_millis(10));
        let result = token
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_from_another_task() {
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            remote.cancel();
        });
        let result = token
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_deadline_only_tightens() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let near = Instant::now() + Duration::from_millis(1);
            let token = CancelToken::new()
                .with_deadline(near)
                .with_deadline(near + Duration::from_secs(60));
            assert_eq!(token.deadline, Some(near));
        });
    }
}
