use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{EmailMailer, Notifier};
use shared::messaging::Notification;
use shared::{Result, ServiceError};

/// Redis Pub/Sub channel prefix for topics
const TOPIC_CHANNEL_PREFIX: &str = "topics:";

/// Payload published on the topic channel
#[derive(Debug, Serialize)]
struct Publication<'a> {
    id: &'a str,
    subject: &'a str,
    message: &'a str,
    attributes: &'a BTreeMap<String, String>,
}

/// Notification topic on Redis
///
/// Publications go out on the `topics:<name>` Pub/Sub channel with their
/// attributes alongside, so channel listeners can filter on them. E-mail
/// subscribers live in the `topics:<name>:subscribers` set and receive
/// each publication through the SMTP mailer when one is configured.
pub struct RedisTopic {
    redis_client: redis::Client,
    channel: String,
    subscribers_key: String,
    mailer: Option<Arc<EmailMailer>>,
}

impl RedisTopic {
    pub fn new(redis_client: redis::Client, topic_name: &str) -> Self {
        let channel = format!("{}{}", TOPIC_CHANNEL_PREFIX, topic_name);
        Self {
            redis_client,
            subscribers_key: format!("{}:subscribers", channel),
            channel,
            mailer: None,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<EmailMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ServiceError::Notification(format!("Failed to connect to Redis: {}", e)))
    }

    pub async fn subscribers(&self) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let members: Vec<String> = conn
            .smembers(&self.subscribers_key)
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;
        Ok(members)
    }

    /// Best-effort delivery: one bad address does not stop the rest.
    async fn deliver_email(&self, mailer: &EmailMailer, notification: &Notification) -> Result<()> {
        let recipients = self.subscribers().await?;
        let mut failures = 0usize;

        for recipient in &recipients {
            if let Err(e) = mailer.send(recipient, notification).await {
                warn!("Email delivery to {} failed: {}", recipient, e);
                failures += 1;
            }
        }

        info!(
            "Delivered notification to {}/{} email subscribers",
            recipients.len() - failures,
            recipients.len()
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for RedisTopic {
    async fn publish(&self, notification: &Notification) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(&Publication {
            id: &id,
            subject: &notification.subject,
            message: &notification.message,
            attributes: &notification.attributes,
        })?;

        let mut conn = self.connection().await?;
        conn.publish::<_, _, ()>(&self.channel, payload)
            .await
            .map_err(|e| {
                ServiceError::Notification(format!("Failed to publish to {}: {}", self.channel, e))
            })?;

        info!("Published notification {} to channel: {}", id, self.channel);

        if let Some(mailer) = &self.mailer {
            if let Err(e) = self.deliver_email(mailer, notification).await {
                warn!("Email fan-out for notification {} failed: {}", id, e);
            }
        }

        Ok(id)
    }

    async fn subscribe(&self, email: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let added: i64 = conn
            .sadd(&self.subscribers_key, email)
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        info!("Subscribed {} to {} (new={})", email, self.channel, added > 0);
        Ok(())
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn
            .srem(&self.subscribers_key, email)
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        info!("Unsubscribed {} from {} (existed={})", email, self.channel, removed > 0);
        Ok(removed > 0)
    }
}
