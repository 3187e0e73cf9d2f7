//! Cooperative cancellation for a run.
//!
//! The CLI flips the handle when SIGINT/SIGTERM arrives; long waits
//! (health polling, settle delay) select on [`CancelSignal::cancelled`].

use tokio::sync::watch;

/// Sending side, owned by whoever listens for termination signals.
#[derive(Debug, Clone)]
pub struct CancelHandle(watch::Sender<bool>);

/// Receiving side, cloned into every cancellable wait.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Create a linked handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal(self.0.subscribe())
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Leaking the sender keeps `changed()` pending instead of erroring.
        std::mem::forget(tx);
        CancelSignal(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
