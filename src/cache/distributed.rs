//! Distributed token tier.
//!
//! The shared store holds only the raw token string under one key. Every
//! operation is best-effort: callers treat any [`CacheError`] as a miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, Runtime};
use redis::AsyncCommands;
use thiserror::Error;
use tracing::info;

use crate::config::types::CacheConfig;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("distributed cache is not configured")]
    NotConfigured,
    #[error("distributed cache unavailable: {0}")]
    Unavailable(String),
    #[error("distributed cache call timed out after {0:?}")]
    Timeout(Duration),
}

impl CacheError {
    /// metric label
    pub fn reason(&self) -> &'static str {
        match self {
            CacheError::NotConfigured => "not_configured",
            CacheError::Unavailable(_) => "unavailable",
            CacheError::Timeout(_) => "timeout",
        }
    }
}

#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// Selected when no distributed store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl DistributedCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::NotConfigured)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        Err(CacheError::NotConfigured)
    }
}

/// Redis-backed tier shared by every replica.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    /// Builds the pool lazily; no connection is attempted until first use.
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let pool = deadpool_redis::Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DistributedCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

pub fn build_distributed_cache(config: &CacheConfig) -> Result<Arc<dyn DistributedCache>, CacheError> {
    match config.redis_url.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(url) => {
            info!("distributed token cache: redis, key '{}'", config.key);
            Ok(Arc::new(RedisCache::from_url(url)?))
        }
        None => {
            info!("distributed token cache not configured, running with local memory only");
            Ok(Arc::new(NoopCache))
        }
    }
}
