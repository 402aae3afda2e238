use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Cooperative cancellation signal.
///
/// Clones share one flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives in `self`, so wait_for cannot see a closed channel.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancel automatically after `delay`, e.g. to impose a deadline.
    pub fn cancel_after(&self, delay: Duration) -> tokio::task::JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel();
        })
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
