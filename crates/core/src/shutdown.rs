//! Cooperative stop signal shared by the orchestrator, walker and workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Cloneable, one-shot stop request.
///
/// Setting the flag is sticky: once triggered, every current and future
/// waiter observes it.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Request a stop. Only the first call wakes waiters.
    pub fn trigger(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once a stop has been requested.
    pub async fn triggered(&self) {
        // Subscribe before reading the flag so a concurrent trigger is not lost.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.is_triggered() {
            return;
        }
        let _ = shutdown_rx.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_sticky() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());
        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
        assert!(signal.clone().is_triggered());
    }

    #[tokio::test]
    async fn test_triggered_resolves_for_waiter() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.triggered().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_triggered_returns_immediately_after_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_millis(100), signal.triggered())
            .await
            .expect("already triggered");
    }
}
