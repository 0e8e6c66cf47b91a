//! Process wiring shared by the binaries: serving HTTP and hosting a stage.

use crate::adapters::http::subscriber_router;
use crate::application::stage::{Stage, StageRunner};
use crate::config::ServerConfig;
use crate::ports::broker::EventSubscriber;
use axum::Router;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Serve `app` until ctrl-c.
pub async fn serve(app: Router, server: &ServerConfig) -> io::Result<()> {
    let listener = TcpListener::bind(server.bind_addr()).await?;
    info!(addr = %server.bind_addr(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            error!(error = %e, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Spawn `workers` pull loops of `stage` on `topic`.
pub fn spawn_workers<S, B>(
    stage: Arc<S>,
    broker: B,
    topic: &str,
    workers: usize,
) -> Vec<JoinHandle<()>>
where
    S: Stage,
    B: EventSubscriber + 'static,
{
    if workers == 0 {
        info!(stage = S::NAME, "pull workers disabled");
        return Vec::new();
    }
    let runner = Arc::new(StageRunner::new(stage, broker, topic));
    let handles = runner.start(workers);
    info!(stage = S::NAME, workers, topic, "started pull workers");
    handles
}

/// Host one stage: pull workers on its topic plus the push route and health check.
pub async fn run_stage<S, B>(
    stage: Arc<S>,
    broker: B,
    topic: &str,
    workers: usize,
    route: &str,
    server: &ServerConfig,
) -> io::Result<()>
where
    S: Stage,
    B: EventSubscriber + 'static,
{
    let handles = spawn_workers(stage.clone(), broker, topic, workers);
    let result = serve(subscriber_router(stage, route), server).await;
    for handle in handles {
        handle.abort();
    }
    result
}
