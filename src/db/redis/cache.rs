use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::Domain;

/// Keys for the read-side caches, one namespace per derived view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendations(Uuid, Domain),
    ProfileSummary(Uuid, Domain),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(user_id, domain) => {
                write!(f, "recs:{}:{}", user_id, domain)
            }
            CacheKey::ProfileSummary(user_id, domain) => {
                write!(f, "profile:{}:{}", user_id, domain)
            }
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Operation for the asynchronous cache writer
enum CacheWriteOp {
    Set { key: String, value: String, ttl: u64 },
    Delete { key: String },
}

/// Cache handler for storing, retrieving, and invalidating cached views
///
/// Writes and invalidations go through a background task so rating
/// submissions and recommendation reads never block on Redis.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteOp>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to
    /// flush all pending operations to Redis.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache operations
    ///
    /// Continuously receives operations from the channel and applies them
    /// to Redis. On shutdown signal, flushes all remaining operations
    /// before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteOp>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(op) = write_rx.recv() => {
                    if let Err(e) = Self::apply_to_redis(&client, op).await {
                        tracing::error!(error = %e, "Failed to apply cache operation");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining operations");

                    while let Ok(op) = write_rx.try_recv() {
                        if let Err(e) = Self::apply_to_redis(&client, op).await {
                            tracing::error!(error = %e, "Failed to flush cache operation during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Applies a single operation to Redis
    async fn apply_to_redis(client: &Client, op: CacheWriteOp) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        match op {
            CacheWriteOp::Set { key, value, ttl } => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            CacheWriteOp::Delete { key } => {
                let _: () = conn.del(key).await?;
            }
        }
        Ok(())
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` on a miss; deserialization failures surface as
    /// internal errors rather than being treated as misses.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// Serializes the value and hands it to the background writer; the
    /// actual Redis write happens later, so a failed write only costs a
    /// cache miss.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let op = CacheWriteOp::Set {
            key: format!("{}", key),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(op) {
            tracing::error!(error = %e, "Failed to send cache write");
        }
    }

    /// Drops a cached view asynchronously
    ///
    /// Called when a rating lands so stale recommendation lists and
    /// profile summaries are not served past the write.
    pub fn invalidate_in_background(&self, key: &CacheKey) {
        let op = CacheWriteOp::Delete {
            key: format!("{}", key),
        };

        if let Err(e) = self.write_tx.send(op) {
            tracing::error!(error = %e, "Failed to send cache invalidation");
        }
    }
}
