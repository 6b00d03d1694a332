//! External cancellation signal
//!
//! A [`CancelHandle`] is given to whoever observes the interrupt (the CLI's
//! Ctrl-C listener); the runner holds the matching [`CancelSignal`]. Once
//! raised the signal stays raised.

use std::sync::Arc;

use tokio::sync::watch;

/// Raises the cancellation signal
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

/// Observes the cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Create a connected handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(Arc::new(tx)), CancelSignal(rx))
}

impl CancelHandle {
    /// Raise the signal; repeated calls have no further effect
    pub fn cancel(&self) {
        if !self.0.send_replace(true) {
            tracing::info!("Cancellation requested");
        }
    }
}

impl CancelSignal {
    /// A signal that is never raised
    pub fn never() -> Self {
        let (_, signal) = cancel_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once the signal is raised
    ///
    /// If every handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
