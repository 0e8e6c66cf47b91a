//! Monolith Binary - Single-process deployment
//!
//! Runs the ingest and marker API and all three stages in one process. The
//! stages are chained over Redis when `REDIS_URL` is set and over the
//! in-process broker otherwise.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use vidchain::adapters::ffmpeg::FfmpegCli;
use vidchain::adapters::http::{api_router, ApiState};
use vidchain::adapters::memory::{MemoryBroker, MemoryStateStore};
use vidchain::adapters::redis::{RedisBroker, RedisPool, RedisStateStore};
use vidchain::application::compressor::CompressorService;
use vidchain::application::converter::ConverterService;
use vidchain::application::merger::MergerService;
use vidchain::application::stage::Downstream;
use vidchain::config::{MonolithConfig, StageKind};
use vidchain::domain::topics;
use vidchain::ports::broker::{EventPublisher, EventSubscriber};
use vidchain::ports::state::StateStore;
use vidchain::{logging, runtime};

/// Start the three stage worker pools on `broker`.
fn start_stages<B>(broker: B, ffmpeg: FfmpegCli, config: &MonolithConfig) -> Vec<JoinHandle<()>>
where
    B: EventPublisher + EventSubscriber + Clone + 'static,
{
    let merger = Arc::new(MergerService::new(
        ffmpeg.clone(),
        Downstream::new(broker.clone(), topics::VIDEO_MERGED),
    ));
    let converter = Arc::new(ConverterService::new(
        ffmpeg.clone(),
        Downstream::new(broker.clone(), topics::VIDEO_CONVERTED),
        config.media.converted_extension.clone(),
    ));
    let compressor = Arc::new(CompressorService::new(
        ffmpeg,
        None::<Downstream<B>>,
        config.media.profile.clone(),
    ));

    let mut handles = runtime::spawn_workers(
        merger,
        broker.clone(),
        StageKind::Merger.default_sub_topic(),
        config.workers,
    );
    handles.extend(runtime::spawn_workers(
        converter,
        broker.clone(),
        StageKind::Converter.default_sub_topic(),
        config.workers,
    ));
    handles.extend(runtime::spawn_workers(
        compressor,
        broker,
        StageKind::Compressor.default_sub_topic(),
        config.workers,
    ));
    handles
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MonolithConfig::from_env()?;
    logging::init();

    let ffmpeg = FfmpegCli::new(&config.media.ffmpeg_bin).with_timeout(config.media.timeout);

    // 1. Adapters, 2. Stages
    let (publisher, store, handles) = match &config.redis_url {
        Some(url) => {
            let pool = RedisPool::new(url)?;
            let broker = RedisBroker::new(
                pool.clone(),
                config.api.broker.pubsub_name.clone(),
                config.api.broker.max_deliveries,
            );
            let store: Arc<dyn StateStore> =
                Arc::new(RedisStateStore::new(pool, config.api.state_store_name.clone()));
            info!("using Redis broker and state store");
            if config.workers > 0 {
                for kind in [StageKind::Merger, StageKind::Converter, StageKind::Compressor] {
                    broker.requeue_in_flight(kind.default_sub_topic()).await?;
                }
            }
            let handles = start_stages(broker.clone(), ffmpeg, &config);
            let publisher: Arc<dyn EventPublisher> = Arc::new(broker);
            (publisher, store, handles)
        }
        None => {
            let broker = MemoryBroker::new(config.api.broker.max_deliveries);
            let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
            info!("REDIS_URL not set, using in-process broker and state store");
            let handles = start_stages(broker.clone(), ffmpeg, &config);
            let publisher: Arc<dyn EventPublisher> = Arc::new(broker);
            (publisher, store, handles)
        }
    };

    // 3. HTTP Layer
    let state = ApiState::new(publisher, StageKind::Merger.default_sub_topic(), store);
    let result = runtime::serve(api_router(state), &config.api.server).await;
    for handle in handles {
        handle.abort();
    }
    result?;
    Ok(())
}
