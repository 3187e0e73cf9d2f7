use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, warn};

use cutover_core::{CancelHandle, CancelSignal, cancel_pair};
use cutover_rollout::outcome::EXIT_ROLLBACK_FAILED;

/// Turn SIGINT or SIGTERM into a cancellation of the run.
///
/// The first signal cancels cooperatively, so a switch already made is
/// still rolled back. A second signal exits at once with the rollback
/// failed code, since routing may then be left half-restored.
pub fn install() -> std::io::Result<CancelSignal> {
    let (handle, cancel) = cancel_pair();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = sigterm.recv() => "SIGTERM",
                Some(()) = sigint.recv() => "SIGINT",
                else => break,
            };
            if tx.send(name).is_err() {
                break;
            }
        }
    });
    tokio::spawn(relay(handle, rx, |_| std::process::exit(EXIT_ROLLBACK_FAILED)));

    Ok(cancel)
}

async fn relay<F>(
    handle: CancelHandle,
    mut signals: mpsc::UnboundedReceiver<&'static str>,
    abort: F,
) where
    F: FnOnce(&'static str),
{
    let Some(first) = signals.recv().await else {
        return;
    };
    warn!(signal = first, "cancelling run; signal again to abort without cleanup");
    handle.cancel();

    if let Some(second) = signals.recv().await {
        error!(
            signal = second,
            "aborting without cleanup; routing and slot services may need manual attention"
        );
        abort(second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn first_signal_cancels_and_second_aborts() {
        let (handle, cancel) = cancel_pair();
        let (tx, rx) = mpsc::unbounded_channel();
        let aborted = Arc::new(Mutex::new(None));
        let seen = aborted.clone();
        let task = tokio::spawn(relay(handle, rx, move |name| {
            *seen.lock().unwrap() = Some(name);
        }));

        tx.send("SIGINT").unwrap();
        let mut waiting = cancel.clone();
        waiting.cancelled().await;
        assert!(cancel.is_cancelled());
        assert!(aborted.lock().unwrap().is_none());

        tx.send("SIGTERM").unwrap();
        task.await.unwrap();
        assert_eq!(*aborted.lock().unwrap(), Some("SIGTERM"));
    }

    #[tokio::test]
    async fn closed_channel_cancels_nothing() {
        let (handle, cancel) = cancel_pair();
        let (tx, rx) = mpsc::unbounded_channel::<&'static str>();
        drop(tx);
        relay(handle, rx, |_| panic!("aborted")).await;
        assert!(!cancel.is_cancelled());
    }
}
