use crate::cancel::CancellationToken;
use std::io;
use tokio::signal::unix::{self, Signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// Turns SIGINT / SIGTERM into cancellation.
///
/// tokio never uninstalls a registered handler, so signals after the first
/// one are swallowed instead of killing the process mid-teardown.
pub struct SignalHandler {
    int_signal: Signal,
    term_signal: Signal,
}

impl SignalHandler {
    /// Installs the handlers. Must run inside a tokio runtime.
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            int_signal: unix::signal(SignalKind::interrupt())?,
            term_signal: unix::signal(SignalKind::terminate())?,
        })
    }

    pub async fn wait_for_shutdown(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.int_signal.recv() => {
                info!("SignalHandler: Received SIGINT (Ctrl+C), initiating graceful shutdown.");
                ShutdownSignal::Interrupt
            }
            _ = self.term_signal.recv() => {
                info!("SignalHandler: Received SIGTERM, initiating graceful shutdown.");
                ShutdownSignal::Terminate
            }
        }
    }

    /// Spawns the forwarder task. It exits after the first signal, or when
    /// the token is cancelled by someone else.
    pub fn forward_to(mut self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                signal = self.wait_for_shutdown() => {
                    if cancel.cancel() {
                        info!("SignalHandler: {:?} forwarded to cancellation.", signal);
                    }
                }
                _ = cancel.cancelled() => {}
            }
        })
    }
}
