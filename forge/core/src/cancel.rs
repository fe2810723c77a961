//! Cooperative Cancellation
//!
//! Every generation run owns exactly one [`CancellationToken`]. The token is
//! cloned into each step of the run (backend call, retry delay, reveal loop)
//! and each of those steps polls it at its own suspension points. Nothing is
//! preempted: a step observes cancellation the next time it checks.
//!
//! Cancelling is idempotent and irreversible for the run that owns the token.

use std::time::Duration;

/// A shared cancellation flag for one generation run
///
/// Clones observe the same flag. Backed by [`tokio_util::sync::CancellationToken`]
/// so awaited steps can also race [`CancellationToken::cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run as cancelled. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.inner.is_cancelled() {
            tracing::debug!("Cancellation requested");
        }
        self.inner.cancel();
    }

    /// Whether `cancel()` has been called on this token or any clone of it
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `true` if the full duration elapsed and `false` if the sleep was
    /// cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            () = self.inner.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}
