//! Merger Binary
//!
//! Consumes `video-recorded` events, concatenates the recording's chunks into
//! one file and publishes `video-merged`.
//!
//! Environment Variables: see `StageConfig` (`SUB_TOPIC`, `PUB_TOPIC`, `WORKERS`, ...).

use std::sync::Arc;
use tracing::info;
use vidchain::adapters::ffmpeg::FfmpegCli;
use vidchain::adapters::redis::{RedisBroker, RedisPool};
use vidchain::application::merger::MergerService;
use vidchain::application::stage::Downstream;
use vidchain::config::{StageConfig, StageKind};
use vidchain::{logging, runtime};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StageConfig::from_env(StageKind::Merger)?;
    logging::init();

    // 1. Adapters
    let pool = RedisPool::new(&config.broker.redis_url)?;
    let broker = RedisBroker::new(
        pool,
        config.broker.pubsub_name.clone(),
        config.broker.max_deliveries,
    );
    let ffmpeg = FfmpegCli::new(&config.media.ffmpeg_bin).with_timeout(config.media.timeout);

    // 2. Stage
    let pub_topic = config
        .pub_topic
        .clone()
        .ok_or("the merger needs a PUB_TOPIC to publish merged videos to")?;
    let merger = Arc::new(MergerService::new(
        ffmpeg,
        Downstream::new(broker.clone(), pub_topic),
    ));

    // 3. Workers and push route
    if config.workers > 0 {
        broker.requeue_in_flight(&config.sub_topic).await?;
    }
    info!(sub_topic = %config.sub_topic, "merger starting");
    runtime::run_stage(
        merger,
        broker,
        &config.sub_topic,
        config.workers,
        &config.subscription_route,
        &config.server,
    )
    .await?;
    Ok(())
}
