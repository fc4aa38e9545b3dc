use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppResult;

/// Keys of values memoized in Redis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Text-to-vector result for one embedding model
    Embedding { model: String, text: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Embedding { model, text } => write!(f, "embed:{}:{}", model, text.trim()),
        }
    }
}

/// Opens a Redis client; connections are made lazily per operation
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

/// A serialized value waiting to be written
struct PendingWrite {
    key: String,
    json: String,
    ttl_secs: u64,
}

/// Redis-backed cache with reads on the caller's task and writes on a
/// background writer
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    pending_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer once queued writes are flushed
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).await.is_err() {
            tracing::warn!("Cache writer already stopped");
        } else {
            tracing::info!("Cache writer shutdown requested");
        }
    }
}

impl Cache {
    /// Builds the cache and spawns its writer task
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(Self::run_writer(redis_client.clone(), pending_rx, shutdown_rx));

        (
            Self {
                redis_client,
                pending_tx,
            },
            CacheWriterHandle { shutdown_tx },
        )
    }

    async fn run_writer(
        client: Client,
        mut pending_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer started");
        let mut failed: u64 = 0;

        loop {
            tokio::select! {
                Some(write) = pending_rx.recv() => {
                    if let Err(e) = Self::store(&client, write).await {
                        failed += 1;
                        tracing::error!(error = %e, failed, "Cache write failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Senders may outlive the writer, so only drain what is already queued
                    let mut flushed = 0u64;
                    while let Ok(write) = pending_rx.try_recv() {
                        match Self::store(&client, write).await {
                            Ok(()) => flushed += 1,
                            Err(e) => {
                                failed += 1;
                                tracing::error!(error = %e, "Cache write failed during shutdown");
                            }
                        }
                    }
                    tracing::info!(flushed, failed, "Cache writer stopped");
                    break;
                }
            }
        }
    }

    async fn store(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.json, write.ttl_secs).await?;
        Ok(())
    }

    /// Reads a cached value
    ///
    /// An entry that no longer deserializes into `T` is logged and treated as
    /// a miss so the caller recomputes and overwrites it.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key.to_string()).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Queues a write and returns immediately; failures are only logged
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache value not serializable");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl_secs,
        };
        if self.pending_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}
