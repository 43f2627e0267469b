use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

use super::{Envelope, Queue, QueueMessage};
use shared::{Result, ServiceError};

/// Moves one receipt from the processing list (KEYS[1]) back onto the
/// consumer end of the queue (KEYS[2]).
const RELEASE_SCRIPT: &str = r#"
if redis.call('LREM', KEYS[1], 1, ARGV[1]) > 0 then
    redis.call('RPUSH', KEYS[2], ARGV[1])
    return 1
end
return 0
"#;

/// Redis-backed queue
///
/// Producers `LPUSH` onto `<name>`. Consumers move messages to
/// `<name>:processing` with `BLMOVE`/`LMOVE` and acknowledge with `LREM`, so
/// a message is only gone once it has been explicitly deleted.
pub struct RedisQueue {
    redis_client: redis::Client,
    queue_key: String,
    processing_key: String,
}

impl RedisQueue {
    pub fn new(redis_client: redis::Client, queue_name: &str) -> Self {
        Self {
            redis_client,
            queue_key: queue_name.to_string(),
            processing_key: format!("{}:processing", queue_name),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ServiceError::Queue(format!("Failed to connect to Redis: {}", e)))
    }

    /// Command taking the first message of a batch. Redis reads a BLMOVE
    /// timeout of 0 as "block forever", so a zero wait polls with LMOVE.
    fn first_move(&self, wait: Duration) -> redis::Cmd {
        let mut cmd = redis::cmd(if wait.is_zero() { "LMOVE" } else { "BLMOVE" });
        cmd.arg(&self.queue_key)
            .arg(&self.processing_key)
            .arg("RIGHT")
            .arg("LEFT");
        if !wait.is_zero() {
            cmd.arg(wait.as_secs_f64());
        }
        cmd
    }

    fn decode(raw: String) -> QueueMessage {
        match serde_json::from_str::<Envelope>(&raw) {
            Ok(envelope) => QueueMessage {
                id: envelope.id,
                body: envelope.body,
                receipt: raw,
            },
            // Pushed by something other than `send`; hand the raw payload to the consumer.
            Err(_) => QueueMessage {
                id: String::new(),
                body: raw.clone(),
                receipt: raw,
            },
        }
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn send(&self, body: &str) -> Result<String> {
        let envelope = Envelope {
            id: Uuid::new_v4().to_string(),
            body: body.to_string(),
        };
        let payload = serde_json::to_string(&envelope)?;

        let mut conn = self.connection().await?;
        conn.lpush::<_, _, ()>(&self.queue_key, payload).await?;

        tracing::debug!("Enqueued message {} on {}", envelope.id, self.queue_key);
        Ok(envelope.id)
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<QueueMessage>> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }

        // A dedicated connection: BLMOVE blocks it for up to `wait`.
        let mut conn = self.connection().await?;

        let first: Option<String> = self.first_move(wait).query_async(&mut conn).await?;

        let Some(first) = first else {
            return Ok(Vec::new());
        };

        let mut messages = vec![Self::decode(first)];
        while messages.len() < max_messages {
            let next: Option<String> = redis::cmd("LMOVE")
                .arg(&self.queue_key)
                .arg(&self.processing_key)
                .arg("RIGHT")
                .arg("LEFT")
                .query_async(&mut conn)
                .await?;

            match next {
                Some(raw) => messages.push(Self::decode(raw)),
                None => break,
            }
        }

        Ok(messages)
    }

    async fn delete(&self, receipt: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.lrem(&self.processing_key, 1, receipt).await?;

        if removed == 0 {
            tracing::debug!("Receipt not found in {}", self.processing_key);
        }
        Ok(())
    }

    async fn release(&self, receipt: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        // Only a receipt still in processing goes back, so a message acknowledged
        // in the meantime is not resurrected.
        let released: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&self.processing_key)
            .key(&self.queue_key)
            .arg(receipt)
            .invoke_async(&mut conn)
            .await?;

        if released == 0 {
            tracing::debug!("Receipt not found in {}", self.processing_key);
        }
        Ok(())
    }

    async fn recover(&self) -> Result<usize> {
        let mut conn = self.connection().await?;
        let mut recovered = 0;

        loop {
            // Back onto the consumer end so recovered messages go out first.
            let moved: Option<String> = redis::cmd("LMOVE")
                .arg(&self.processing_key)
                .arg(&self.queue_key)
                .arg("RIGHT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;

            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(
                "Returned {} in-flight messages from {} to {}",
                recovered,
                self.processing_key,
                self.queue_key
            );
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_key_naming() {
        let redis_client = redis::Client::open("redis://localhost:6379").unwrap();
        let queue = RedisQueue::new(redis_client, "image-uploads");
        assert_eq!(queue.queue_key, "image-uploads");
        assert_eq!(queue.processing_key, "image-uploads:processing");
    }

    fn packed(cmd: &redis::Cmd) -> String {
        String::from_utf8_lossy(&cmd.get_packed_command()).into_owned()
    }

    #[test]
    fn test_zero_wait_does_not_block() {
        let redis_client = redis::Client::open("redis://localhost:6379").unwrap();
        let queue = RedisQueue::new(redis_client, "image-uploads");

        let polled = packed(&queue.first_move(Duration::ZERO));
        assert!(polled.contains("$5\r\nLMOVE\r\n"));
        assert!(!polled.contains("BLMOVE"));
        assert!(polled.starts_with("*5\r\n"));

        let blocking = packed(&queue.first_move(Duration::from_secs(2)));
        assert!(blocking.contains("$6\r\nBLMOVE\r\n"));
        assert!(blocking.starts_with("*6\r\n"));
    }

    #[test]
    fn test_decode_envelope_keeps_raw_receipt() {
        let raw = r#"{"id":"abc","body":"{\"event\":\"ImageUploaded\"}"}"#.to_string();
        let message = RedisQueue::decode(raw.clone());
        assert_eq!(message.id, "abc");
        assert_eq!(message.body, r#"{"event":"ImageUploaded"}"#);
        assert_eq!(message.receipt, raw);
    }

    #[test]
    fn test_decode_foreign_payload() {
        let message = RedisQueue::decode("not json".to_string());
        assert_eq!(message.id, "");
        assert_eq!(message.body, "not json");
        assert_eq!(message.receipt, "not json");
    }
}
