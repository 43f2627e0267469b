// Upload event queue

pub mod memory;
pub mod redis_queue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::Result;
use std::time::Duration;

pub use memory::MemoryQueue;
pub use redis_queue::RedisQueue;

/// A message handed out by [`Queue::receive`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub body: String,
    /// Opaque handle for [`Queue::delete`]
    pub receipt: String,
}

/// Wire envelope wrapping every message body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub id: String,
    pub body: String,
}

/// At-least-once message queue
///
/// Messages stay in the queue until deleted with their receipt, so a
/// consumer that dies between processing and `delete` sees them again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Queue: Send + Sync {
    /// Enqueue `body`, returning the new message id.
    async fn send(&self, body: &str) -> Result<String>;

    /// Receive up to `max_messages`, waiting at most `wait` for the first.
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<QueueMessage>>;

    /// Acknowledge a message. Unknown receipts are ignored.
    async fn delete(&self, receipt: &str) -> Result<()>;

    /// Hand a received message back so a later `receive` sees it again.
    /// Backends that never hide received messages have nothing to do.
    async fn release(&self, _receipt: &str) -> Result<()> {
        Ok(())
    }

    /// Return messages left in flight by a previous consumer to the queue.
    async fn recover(&self) -> Result<usize> {
        Ok(0)
    }
}
