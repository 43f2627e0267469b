use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::notify::Notifier;
use crate::queue::{Queue, QueueMessage};
use shared::messaging::{ImageEvent, Notification, UploadEvent, EXTENSION_ATTRIBUTE};

/// What happened to one queue message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Published and acknowledged
    Relayed,
    /// Published, but the acknowledgement failed; it will come back
    Unacknowledged,
    /// Not an upload event; dropped
    Discarded,
    /// Publish failed; handed back to the queue
    Failed,
}

impl Outcome {
    /// The message is gone from the queue
    pub fn is_settled(&self) -> bool {
        matches!(self, Outcome::Relayed | Outcome::Discarded)
    }
}

/// Drains upload events from the queue and republishes them on the topic
pub struct RelayWorker {
    queue: Arc<dyn Queue>,
    notifier: Arc<dyn Notifier>,
    config: RelayConfig,
    public_base_url: String,
}

impl RelayWorker {
    pub fn new(
        queue: Arc<dyn Queue>,
        notifier: Arc<dyn Notifier>,
        config: RelayConfig,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            notifier,
            config,
            public_base_url: public_base_url.into(),
        }
    }

    /// Run until `shutdown_rx` fires or its sender is dropped.
    ///
    /// Shutdown only interrupts waiting (on the queue or between polls); a
    /// batch that has been received is always processed to the end.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            "Starting relay worker (batch_size={}, wait={:?}, idle={:?})",
            self.config.batch_size,
            self.config.wait_time(),
            self.config.idle_interval()
        );

        loop {
            let received = tokio::select! {
                _ = shutdown_rx.recv() => break,
                received = self.queue.receive(self.config.batch_size, self.config.wait_time()) => received,
            };

            let poll_again = match received {
                Ok(messages) => {
                    let outcomes = self.process_batch(messages).await;
                    let relayed = outcomes.iter().filter(|o| **o == Outcome::Relayed).count();
                    if relayed < outcomes.len() {
                        warn!("Relayed {} of {} queue messages", relayed, outcomes.len());
                    }
                    outcomes.len() >= self.config.batch_size
                        && outcomes.iter().all(Outcome::is_settled)
                }
                Err(e) => {
                    error!("Failed to receive from queue: {}", e);
                    false
                }
            };

            // Only a full batch that left nothing behind skips the idle wait.
            if !poll_again {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(self.config.idle_interval()) => {}
                }
            }
        }

        info!("Relay worker stopped");
    }

    /// Receive and process one batch, returning the outcome per message.
    #[cfg(test)]
    pub async fn run_once(&self) -> shared::Result<Vec<Outcome>> {
        let messages = self
            .queue
            .receive(self.config.batch_size, self.config.wait_time())
            .await?;
        Ok(self.process_batch(messages).await)
    }

    async fn process_batch(&self, messages: Vec<QueueMessage>) -> Vec<Outcome> {
        if !messages.is_empty() {
            debug!("Relaying {} queue messages", messages.len());
        }

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in &messages {
            outcomes.push(self.handle_message(message).await);
        }
        outcomes
    }

    async fn handle_message(&self, message: &QueueMessage) -> Outcome {
        let event = match ImageEvent::from_json(&message.body) {
            Ok(ImageEvent::ImageUploaded(event)) => event,
            Err(e) => {
                warn!("Discarding malformed queue message {}: {}", message.id, e);
                self.acknowledge(message).await;
                return Outcome::Discarded;
            }
        };

        let notification = self.notification_for(&event);
        if let Err(e) = self.notifier.publish(&notification).await {
            error!("Failed to publish notification for {}: {}", event.name, e);
            if let Err(e) = self.queue.release(&message.receipt).await {
                warn!("Failed to return queue message {}: {}", message.id, e);
            }
            return Outcome::Failed;
        }

        if self.acknowledge(message).await {
            info!("Relayed upload of {} to the topic", event.name);
            Outcome::Relayed
        } else {
            Outcome::Unacknowledged
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) -> bool {
        match self.queue.delete(&message.receipt).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to delete queue message {}: {}", message.id, e);
                false
            }
        }
    }

    fn notification_for(&self, event: &UploadEvent) -> Notification {
        let message = format!(
            "A new image has been uploaded.\n\nName: {}\nSize: {} bytes\nExtension: {}\nDownload: {}/download/{}",
            event.name, event.size, event.extension, self.public_base_url, event.name
        );

        Notification::new(format!("New image uploaded: {}", event.name), message)
            .with_attribute(EXTENSION_ATTRIBUTE, event.extension.clone())
    }
}
