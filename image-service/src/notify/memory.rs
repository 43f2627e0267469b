use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Notifier;
use shared::messaging::Notification;
use shared::Result;

/// Topic kept in process memory; records every publication
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    published: Mutex<Vec<Notification>>,
    subscribers: Mutex<BTreeSet<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn published(&self) -> Vec<Notification> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, notification: &Notification) -> Result<String> {
        self.published.lock().await.push(notification.clone());
        tracing::debug!("Recorded notification: {}", notification.subject);
        Ok(Uuid::new_v4().to_string())
    }

    async fn subscribe(&self, email: &str) -> Result<()> {
        self.subscribers.lock().await.insert(email.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        Ok(self.subscribers.lock().await.remove(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let notifier = MemoryNotifier::new();
        notifier.subscribe("reader@example.com").await.unwrap();
        notifier.subscribe("reader@example.com").await.unwrap();

        assert!(notifier.unsubscribe("reader@example.com").await.unwrap());
        assert!(!notifier.unsubscribe("reader@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_publish_records_notification() {
        let notifier = MemoryNotifier::new();
        let notification = Notification::new("subject", "body").with_attribute("extension", "png");

        let first = notifier.publish(&notification).await.unwrap();
        let second = notifier.publish(&notification).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(notifier.published().await, vec![notification.clone(), notification]);
    }
}
