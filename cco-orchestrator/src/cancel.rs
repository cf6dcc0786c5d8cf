//! Turn cancellation: a shared signal raced against every suspension point
//! a turn passes through (§5 "cancel before every suspension point").
//!
//! Built on a `tokio::sync::watch` channel rather than a plain `AtomicBool`
//! so a suspension point can *await* cancellation instead of polling it,
//! the same shape the ambient provider crates use for their own shutdown
//! signals.

use tokio::sync::watch;

/// Held by whoever may need to cancel an in-flight turn (the Background
/// Runner on a client disconnect, a test harness, …).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: watch::Sender<bool>,
}

/// Held by the turn itself; cloned freely, racing a suspension point against
/// [`CancellationSignal::cancelled`] stops the turn at that point rather
/// than only at task start.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

/// Build a fresh, not-yet-cancelled token/signal pair.
pub fn pair() -> (CancellationToken, CancellationSignal) {
    let (tx, rx) = watch::channel(false);
    (CancellationToken { tx }, CancellationSignal { rx })
}

impl CancellationToken {
    /// Signal every clone of the paired [`CancellationSignal`]. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancellationSignal {
    /// Non-blocking check, for suspension points that only need a cheap
    /// cooperative check between steps rather than a raced `await`.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled; races alongside a suspension
    /// point's own future in a `tokio::select!`.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Race `fut` against cancellation. Returns `Err(Cancelled)` if cancellation
/// wins, the suspension point's own result otherwise.
pub async fn race<F: std::future::Future>(
    signal: &mut CancellationSignal,
    fut: F,
) -> Result<F::Output, Cancelled> {
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

/// The turn was cancelled while this suspension point was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("turn cancelled")
    }
}

impl std::error::Error for Cancelled {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn race_returns_ok_when_not_cancelled() {
        let (_token, mut signal) = pair();
        let result = race(&mut signal, async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn race_returns_cancelled_once_token_fires() {
        let (token, mut signal) = pair();
        token.cancel();
        let result = race(&mut signal, std::future::pending::<()>()).await;
        assert_eq!(result, Err(Cancelled));
    }

    #[test]
    fn is_cancelled_reflects_token_state_without_awaiting() {
        let (token, signal) = pair();
        assert!(!signal.is_cancelled());
        token.cancel();
        assert!(signal.is_cancelled());
    }
}
