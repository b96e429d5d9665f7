use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Trailing-edge debouncer: only the last call within the quiet
/// period executes. One pending slot; each call invalidates whatever
/// was scheduled before it. An action that already started is not
/// interrupted.
pub struct Debouncer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.pending.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.pending = Some(token.clone());
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    action.await;
                }
            }
        });
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
