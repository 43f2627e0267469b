// Notification topic and its subscribers

pub mod email;
pub mod memory;
pub mod redis_topic;

use async_trait::async_trait;
use shared::messaging::Notification;
use shared::Result;

pub use email::EmailMailer;
pub use memory::MemoryNotifier;
pub use redis_topic::RedisTopic;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish to the topic, returning the publication id.
    async fn publish(&self, notification: &Notification) -> Result<String>;

    /// Add an e-mail endpoint. Subscribing twice is a no-op.
    async fn subscribe(&self, email: &str) -> Result<()>;

    /// Remove an e-mail endpoint. Returns whether it was subscribed.
    async fn unsubscribe(&self, email: &str) -> Result<bool>;
}
