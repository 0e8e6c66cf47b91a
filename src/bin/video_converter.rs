//! Converter Binary
//!
//! Consumes `video-merged` events, remuxes the merged file into the target
//! container and publishes `video-converted`.
//!
//! Environment Variables: see `StageConfig` (`CONVERTED_EXTENSION`, `WORKERS`, ...).

use std::sync::Arc;
use tracing::info;
use vidchain::adapters::ffmpeg::FfmpegCli;
use vidchain::adapters::redis::{RedisBroker, RedisPool};
use vidchain::application::converter::ConverterService;
use vidchain::application::stage::Downstream;
use vidchain::config::{StageConfig, StageKind};
use vidchain::{logging, runtime};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StageConfig::from_env(StageKind::Converter)?;
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
        .ok_or("the converter needs a PUB_TOPIC to publish converted videos to")?;
    let converter = Arc::new(ConverterService::new(
        ffmpeg,
        Downstream::new(broker.clone(), pub_topic),
        config.media.converted_extension.clone(),
    ));

    // 3. Workers and push route
    if config.workers > 0 {
        broker.requeue_in_flight(&config.sub_topic).await?;
    }
    info!(
        sub_topic = %config.sub_topic,
        container = %config.media.converted_extension,
        "converter starting"
    );
    runtime::run_stage(
        converter,
        broker,
        &config.sub_topic,
        config.workers,
        &config.subscription_route,
        &config.server,
    )
    .await?;
    Ok(())
}
