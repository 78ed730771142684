//! Durable Store Janitor
//!
//! Background task that periodically deletes expired rows from the durable
//! store, independent of cache traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::persistence::DurableStore;

/// Handle to the running sweep task.
///
/// The owner must call [`Janitor::stop`] to end the task; dropping the handle
/// aborts it instead.
#[derive(Debug)]
pub struct Janitor {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Spawns the sweep loop.
    ///
    /// The first sweep runs immediately, then one per `interval` until
    /// stopped. Sweep failures are swallowed by the store.
    ///
    /// # Example
    /// ```ignore
    /// let janitor = Janitor::spawn(store.clone(), Duration::from_secs(300));
    /// // Later, during shutdown:
    /// janitor.stop().await;
    /// ```
    pub fn spawn(store: Arc<dyn DurableStore>, interval: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!("Starting janitor with interval of {:?}", interval);

            loop {
                let removed = store.cleanup_expired().await;
                if removed > 0 {
                    info!("Janitor: removed {} expired rows", removed);
                } else {
                    debug!("Janitor: no expired rows found");
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    // Also fires if the sender is gone
                    _ = stopped.changed() => break,
                }

                if *stopped.borrow() {
                    break;
                }
            }

            info!("Janitor stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Janitor task failed: {}", e);
            }
        }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
