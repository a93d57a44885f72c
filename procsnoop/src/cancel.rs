use std::sync::Arc;
use tokio::sync::watch;

/// One-shot shutdown signal shared between the signal forwarder, the pump
/// and the coordinator.
///
/// Once cancelled it stays cancelled; every clone observes the same state.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests cancellation. Returns `true` only for the call that made
    /// the transition; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation has been requested, immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // tx 由 self 持有，wait_for 不会因发送端关闭而出错
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
