//! Single-writer queue for durable writes.
//!
//! Every durable write goes through one actor task fed by an unbounded
//! channel, so writes reach the store in exactly the order they were
//! submitted. Submitting never blocks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::DurableStore;

#[derive(Debug)]
enum WriteCommand {
    Put {
        key: String,
        value: String,
        expiry: DateTime<Utc>,
    },
    /// Acknowledged once every earlier command has been applied
    Flush(oneshot::Sender<()>),
    /// Stops the actor after everything queued before it
    Close,
}

/// Handle to the durable write actor.
pub struct DurableWriter {
    commands: mpsc::UnboundedSender<WriteCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DurableWriter {
    /// Spawns the actor on the current tokio runtime.
    pub fn spawn(store: Arc<dyn DurableStore>) -> Self {
        let (commands, mut queue) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(cmd) = queue.recv().await {
                match cmd {
                    WriteCommand::Put { key, value, expiry } => {
                        if store.put(&key, &value, expiry).await {
                            debug!(key = %key, "Durable write applied");
                        } else {
                            // Memory stays authoritative
                            warn!(key = %key, "Durable write failed");
                        }
                    }
                    WriteCommand::Flush(ack) => {
                        let _ = ack.send(());
                    }
                    WriteCommand::Close => break,
                }
            }
            info!("Durable writer stopped");
        });

        Self {
            commands,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queues an upsert of `key`. Writes submitted after shutdown are dropped.
    pub fn submit(&self, key: String, value: String, expiry: DateTime<Utc>) {
        if let Err(e) = self.commands.send(WriteCommand::Put { key, value, expiry }) {
            if let WriteCommand::Put { key, .. } = e.0 {
                warn!(key = %key, "Durable writer closed, dropping write");
            }
        }
    }

    /// Waits until every write submitted before this call has been applied.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(WriteCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Applies the pending writes, then stops and joins the actor.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(WriteCommand::Close);
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Durable writer task failed: {}", e);
            }
        }
    }
}
