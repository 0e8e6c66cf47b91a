//! Compressor Binary
//!
//! Consumes `video-converted` events and re-encodes the file with the
//! configured codecs. Publishes the compressed reference only when
//! `PUB_TOPIC` is set; otherwise this is the last stage.
//!
//! Environment Variables: see `StageConfig` (`VIDEO_CODEC`, `AUDIO_CODEC`, ...).

use std::sync::Arc;
use tracing::info;
use vidchain::adapters::ffmpeg::FfmpegCli;
use vidchain::adapters::redis::{RedisBroker, RedisPool};
use vidchain::application::compressor::CompressorService;
use vidchain::application::stage::Downstream;
use vidchain::config::{StageConfig, StageKind};
use vidchain::{logging, runtime};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StageConfig::from_env(StageKind::Compressor)?;
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
    let downstream = config
        .pub_topic
        .clone()
        .map(|topic| Downstream::new(broker.clone(), topic));
    let compressor = Arc::new(CompressorService::new(
        ffmpeg,
        downstream,
        config.media.profile.clone(),
    ));

    // 3. Workers and push route
    if config.workers > 0 {
        broker.requeue_in_flight(&config.sub_topic).await?;
    }
    info!(
        sub_topic = %config.sub_topic,
        video_codec = %config.media.profile.video,
        audio_codec = %config.media.profile.audio,
        "compressor starting"
    );
    runtime::run_stage(
        compressor,
        broker,
        &config.sub_topic,
        config.workers,
        &config.subscription_route,
        &config.server,
    )
    .await?;
    Ok(())
}
