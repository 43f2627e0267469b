use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use super::{Queue, QueueMessage};
use shared::Result;

/// Queue kept in process memory
///
/// Received messages are not hidden from later receives: a message is
/// handed out again on every `receive` until it is deleted.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    messages: Mutex<VecDeque<QueueMessage>>,
    arrivals: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    #[cfg(test)]
    pub async fn bodies(&self) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .map(|message| message.body.clone())
            .collect()
    }

    async fn peek(&self, max_messages: usize) -> Vec<QueueMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .take(max_messages)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn send(&self, body: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.messages.lock().await.push_back(QueueMessage {
            id: id.clone(),
            body: body.to_string(),
            receipt: id.clone(),
        });
        self.arrivals.notify_one();
        Ok(id)
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<QueueMessage>> {
        let messages = self.peek(max_messages).await;
        if !messages.is_empty() || max_messages == 0 {
            return Ok(messages);
        }

        if tokio::time::timeout(wait, self.arrivals.notified()).await.is_err() {
            return Ok(Vec::new());
        }
        Ok(self.peek(max_messages).await)
    }

    async fn delete(&self, receipt: &str) -> Result<()> {
        self.messages
            .lock()
            .await
            .retain(|message| message.receipt != receipt);
        Ok(())
    }
}
