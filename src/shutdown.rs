use tokio::sync::broadcast;
use tracing::{info, warn};

/// Broadcasts a single shutdown signal to every listener and the metrics
/// server. There is no cache or zone store to flush here: once the signal
/// goes out, each subscriber tears itself down independently and `main`
/// joins their handles.
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<()>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown(&self) {
        info!("initiating graceful shutdown");
        if let Err(err) = self.shutdown_tx.send(()) {
            warn!(%err, "failed to broadcast shutdown signal");
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
