use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::db::{MemoryMetadataStore, MetadataStore, PgMetadataStore};
use crate::notify::{EmailMailer, MemoryNotifier, Notifier, RedisTopic};
use crate::queue::{MemoryQueue, Queue, RedisQueue};
use crate::storage::{MemoryObjectStore, ObjectStore, S3ObjectStore};

/// The four remote capabilities the service is built on
#[derive(Clone)]
pub struct Backends {
    pub object_store: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub queue: Arc<dyn Queue>,
    pub notifier: Arc<dyn Notifier>,
}

impl Backends {
    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.backend {
            BackendKind::Memory => {
                info!("Using in-memory backends");
                Ok(Self::in_memory())
            }
            BackendKind::Aws => Self::connect(config).await,
        }
    }

    async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;
        info!("Database connection established");

        if config.database.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations applied");
        }

        let object_store = S3ObjectStore::new(&config.storage).await;

        let redis_client =
            redis::Client::open(config.redis.url.as_str()).context("Invalid REDIS_URL")?;
        let queue = RedisQueue::new(redis_client.clone(), &config.redis.queue_name);

        let mut topic = RedisTopic::new(redis_client, &config.redis.topic_name);
        if let Some(email) = &config.email {
            let mailer = EmailMailer::new(email).context("Failed to configure SMTP mailer")?;
            topic = topic.with_mailer(Arc::new(mailer));
            info!("E-mail delivery enabled via {}", email.smtp_host);
        }

        Ok(Self {
            object_store: Arc::new(object_store),
            metadata: Arc::new(PgMetadataStore::new(pool)),
            queue: Arc::new(queue),
            notifier: Arc::new(topic),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            object_store: Arc::new(MemoryObjectStore::new()),
            metadata: Arc::new(MemoryMetadataStore::new()),
            queue: Arc::new(MemoryQueue::new()),
            notifier: Arc::new(MemoryNotifier::new()),
        }
    }
}
