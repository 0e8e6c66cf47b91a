//! Redis StateStore implementation.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use crate::error::PortError;
use crate::ports::state::StateStore;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

/// Key/value store living under `{store_name}:` in Redis.
#[derive(Clone)]
pub struct RedisStateStore {
    pool: RedisPool,
    store_name: String,
}

impl RedisStateStore {
    pub fn new(pool: RedisPool, store_name: impl Into<String>) -> Self {
        Self {
            pool,
            store_name: store_name.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.store_name, key)
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn save_state(&self, key: &str, value: String) -> Result<(), PortError> {
        let mut conn = self.pool.connection().await?;
        conn.set::<_, _, ()>(self.key(key), value)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, PortError> {
        let mut conn = self.pool.connection().await?;
        let value: Option<String> = conn
            .get(self.key(key))
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(value)
    }

    async fn delete_state(&self, key: &str) -> Result<(), PortError> {
        let mut conn = self.pool.connection().await?;
        conn.del::<_, ()>(self.key(key))
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }
}
