use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One-shot "track finished" signal handed to the voice transport.
///
/// The transport fires it from its own event context. Only the first call to
/// [`fire`](Self::fire) is delivered; duplicates (end + error for the same
/// track, or a late event from an already skipped track) are no-ops. If every
/// clone is dropped without firing, the waiting side resolves as well, so a
/// lost callback never hangs the player loop.
#[derive(Clone, Debug)]
pub struct CompletionSignal {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// Waiting half owned by the player loop.
pub type Completion = oneshot::Receiver<()>;

impl CompletionSignal {
    pub fn new() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Returns `true` if this call delivered the signal.
    pub fn fire(&self) -> bool {
        match self.tx.lock().take() {
            Some(tx) => {
                // El loop pudo haber terminado ya (sesión eliminada)
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_fired(&self) -> bool {
        self.tx.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_fire_wins() {
        let (signal, done) = CompletionSignal::new();
        let duplicate = signal.clone();

        assert!(signal.fire());
        assert!(!duplicate.fire());
        assert!(duplicate.is_fired());
        assert!(done.await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_signal_releases_waiter() {
        let (signal, done) = CompletionSignal::new();
        drop(signal);

        assert!(done.await.is_err());
    }

    #[test]
    fn test_fire_from_another_thread() {
        let (signal, mut done) = CompletionSignal::new();

        std::thread::spawn(move || signal.fire()).join().unwrap();

        assert!(done.try_recv().is_ok());
    }
}
