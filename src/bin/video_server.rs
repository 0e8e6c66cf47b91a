//! Video Server Binary
//!
//! Ingest and marker API: publishes the `video-recorded` event that starts the
//! pipeline and keeps per-video recording markers in the state store.
//!
//! Environment Variables: see `ApiConfig` (`PUB_TOPIC`, `STATE_STORE_NAME`, ...).

use std::sync::Arc;
use tracing::info;
use vidchain::adapters::http::{api_router, ApiState};
use vidchain::adapters::redis::{RedisBroker, RedisPool, RedisStateStore};
use vidchain::config::ApiConfig;
use vidchain::{logging, runtime};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ApiConfig::from_env()?;
    logging::init();

    // 1. Adapters
    let pool = RedisPool::new(&config.broker.redis_url)?;
    let broker = RedisBroker::new(
        pool.clone(),
        config.broker.pubsub_name.clone(),
        config.broker.max_deliveries,
    );
    let store = RedisStateStore::new(pool, config.state_store_name.clone());

    // 2. HTTP Layer
    let state = ApiState::new(Arc::new(broker), config.pub_topic.clone(), Arc::new(store));
    info!(pub_topic = %config.pub_topic, "video server starting");
    runtime::serve(api_router(state), &config.server).await?;
    Ok(())
}
