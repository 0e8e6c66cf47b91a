//! Shared plumbing of the pipeline stages: decoding, outcome mapping,
//! downstream publishing and the pull worker loop.

use crate::domain::outcome::Outcome;
use crate::error::{PipelineError, PortError};
use crate::ports::broker::{EventPublisher, EventSubscriber};
use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 5;

/// One step of the pipeline: consumes one event type from one topic.
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    type Event: DeserializeOwned + fmt::Debug + Send;

    const NAME: &'static str;

    async fn process(&self, event: Self::Event) -> Result<(), PipelineError>;
}

/// Decode an inbound payload, unwrapping a CloudEvents envelope if present.
pub fn decode_event<T: DeserializeOwned>(payload: &str) -> Result<T, PipelineError> {
    let value: Value = serde_json::from_str(payload)?;
    let data = match value {
        Value::Object(mut envelope) if envelope.contains_key("specversion") => {
            match envelope.remove("data") {
                Some(Value::String(inner)) => serde_json::from_str(&inner)?,
                Some(data) => data,
                None => {
                    return Err(PipelineError::InvalidEvent(
                        "cloud event carries no data".to_string(),
                    ))
                }
            }
        }
        other => other,
    };
    Ok(serde_json::from_value(data)?)
}

/// Run `stage` on one raw payload and classify the result.
pub async fn dispatch<S: Stage>(stage: &S, payload: &str) -> Outcome {
    let event = match decode_event::<S::Event>(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(stage = S::NAME, error = %e, "dropping undecodable event");
            return Outcome::reject(e);
        }
    };
    info!(stage = S::NAME, ?event, "received");

    match AssertUnwindSafe(stage.process(event)).catch_unwind().await {
        Ok(Ok(())) => Outcome::Acknowledge,
        Ok(Err(e)) if e.is_retryable() => {
            warn!(stage = S::NAME, error = %e, "processing failed, requesting redelivery");
            Outcome::redeliver(e)
        }
        Ok(Err(e)) => {
            warn!(stage = S::NAME, error = %e, "rejecting event");
            Outcome::reject(e)
        }
        Err(_) => {
            error!(stage = S::NAME, "handler panicked, requesting redelivery");
            Outcome::redeliver("handler panicked")
        }
    }
}

/// Publisher bound to the topic a stage feeds.
#[derive(Debug, Clone)]
pub struct Downstream<P> {
    publisher: P,
    topic: String,
}

impl<P: EventPublisher> Downstream<P> {
    pub fn new(publisher: P, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    pub async fn publish<T: Serialize + fmt::Debug + Sync>(
        &self,
        event: &T,
    ) -> Result<(), PipelineError> {
        let payload = serde_json::to_string(event)?;
        self.publisher
            .publish(&self.topic, payload)
            .await
            .map_err(|source| PipelineError::Publish {
                topic: self.topic.clone(),
                source,
            })?;
        info!(topic = %self.topic, ?event, "published");
        Ok(())
    }
}

/// Map the result of an external media process to a pipeline error.
pub(crate) fn check_media(
    operation: &'static str,
    result: io::Result<Output>,
) -> Result<(), PipelineError> {
    let output = result.map_err(|source| match source.kind() {
        io::ErrorKind::TimedOut => PipelineError::MediaTimedOut { operation, source },
        _ => PipelineError::MediaSpawn { operation, source },
    })?;
    if output.status.success() {
        return Ok(());
    }
    Err(PipelineError::MediaFailed {
        operation,
        status: output.status,
        stderr: stderr_tail(&output.stderr),
    })
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

/// Pulls messages of one topic and feeds them to a stage.
pub struct StageRunner<S, B> {
    stage: Arc<S>,
    broker: B,
    topic: String,
    poll_timeout: Duration,
}

impl<S, B> StageRunner<S, B>
where
    S: Stage,
    B: EventSubscriber + 'static,
{
    pub fn new(stage: Arc<S>, broker: B, topic: impl Into<String>) -> Self {
        Self {
            stage,
            broker,
            topic: topic.into(),
            poll_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Spawn `workers` concurrent worker loops.
    pub fn start(self: Arc<Self>, workers: usize) -> Vec<JoinHandle<()>> {
        (0..workers)
            .map(|id| {
                let runner = self.clone();
                tokio::spawn(async move {
                    runner.run_worker_loop(id).await;
                })
            })
            .collect()
    }

    pub async fn run_worker_loop(&self, worker_id: usize) {
        info!(stage = S::NAME, worker_id, topic = %self.topic, "worker started");
        loop {
            if let Err(e) = self.run_once().await {
                error!(stage = S::NAME, worker_id, error = %e, "broker error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    /// Receive, process and settle at most one message.
    pub async fn run_once(&self) -> Result<Option<Outcome>, PortError> {
        let Some(delivery) = self.broker.receive(&self.topic, self.poll_timeout).await? else {
            return Ok(None);
        };

        let span = info_span!(
            "delivery",
            stage = S::NAME,
            id = %delivery.id,
            attempt = delivery.attempt
        );
        let outcome = dispatch(self.stage.as_ref(), &delivery.payload)
            .instrument(span)
            .await;
        debug!(stage = S::NAME, id = %delivery.id, ?outcome, "settling");
        self.broker.settle(delivery, &outcome).await?;
        Ok(Some(outcome))
    }
}
