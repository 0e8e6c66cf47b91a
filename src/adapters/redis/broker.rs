//! Redis EventPublisher / EventSubscriber implementation.
//!
//! Each topic is a list. Receiving moves the head into a per-topic processing
//! list so a message survives a worker crash until it has been settled.
//! Settling removes it from the processing list and re-enqueues or
//! dead-letters it in one MULTI/EXEC transaction. Messages stranded in the
//! processing list by a crashed worker are put back by `requeue_in_flight`.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use super::{DEAD_LETTER_SUFFIX, PROCESSING_SUFFIX};
use crate::domain::outcome::Outcome;
use crate::error::PortError;
use crate::ports::broker::{Delivery, EventPublisher, EventSubscriber};
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, Pipeline};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// What actually sits in the topic lists.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    id: Uuid,
    attempt: u32,
    payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Clone)]
pub struct RedisBroker {
    pool: RedisPool,
    pubsub_name: String,
    max_deliveries: u32,
}

impl RedisBroker {
    pub fn new(pool: RedisPool, pubsub_name: impl Into<String>, max_deliveries: u32) -> Self {
        Self {
            pool,
            pubsub_name: pubsub_name.into(),
            max_deliveries: max_deliveries.max(1),
        }
    }

    fn queue_key(&self, topic: &str) -> String {
        format!("{}:{}", self.pubsub_name, topic)
    }

    fn processing_key(&self, topic: &str) -> String {
        format!("{}{}", self.queue_key(topic), PROCESSING_SUFFIX)
    }

    /// Move every message left in the processing list of `topic` back onto its
    /// queue. Run before starting the workers of a topic.
    pub async fn requeue_in_flight(&self, topic: &str) -> Result<usize, RedisAdapterError> {
        let queue = self.queue_key(topic);
        let processing = self.processing_key(topic);
        let mut conn = self.pool.connection().await?;

        let mut moved = 0;
        loop {
            let message: Option<String> = conn.rpoplpush(&processing, &queue).await?;
            if message.is_none() {
                break;
            }
            moved += 1;
        }
        if moved > 0 {
            info!(topic, moved, "requeued in-flight messages");
        }
        Ok(moved)
    }

    async fn push(&self, key: String, envelope: &Envelope) -> Result<(), RedisAdapterError> {
        let json = serde_json::to_string(envelope)?;
        let mut conn = self.pool.connection().await?;
        conn.lpush::<_, _, ()>(key, json).await?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisBroker {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PortError> {
        let envelope = Envelope {
            id: Uuid::new_v4(),
            attempt: 0,
            payload,
            reason: None,
        };
        self.push(self.queue_key(topic), &envelope).await?;
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for RedisBroker {
    async fn receive(&self, topic: &str, timeout: Duration) -> Result<Option<Delivery>, PortError> {
        let queue = self.queue_key(topic);
        let processing = self.processing_key(topic);
        let mut conn = self.pool.connection().await?;

        let raw: Option<String> = conn
            .brpoplpush(&queue, &processing, timeout.as_secs_f64())
            .await
            .map_err(RedisAdapterError::from)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let delivery = match serde_json::from_str::<Envelope>(&raw) {
            Ok(envelope) => Delivery {
                id: envelope.id,
                topic: topic.to_string(),
                attempt: envelope.attempt,
                payload: envelope.payload,
                receipt: raw,
            },
            // Pushed by something other than this broker: hand over as-is.
            Err(_) => Delivery {
                id: Uuid::new_v4(),
                topic: topic.to_string(),
                attempt: 0,
                payload: raw.clone(),
                receipt: raw,
            },
        };
        Ok(Some(delivery))
    }

    async fn settle(&self, delivery: Delivery, outcome: &Outcome) -> Result<(), PortError> {
        let queue = self.queue_key(&delivery.topic);
        let processing = self.processing_key(&delivery.topic);

        let next_attempt = delivery.attempt.saturating_add(1);
        let target = match outcome {
            Outcome::Acknowledge => None,
            Outcome::Redeliver { .. } if next_attempt < self.max_deliveries => Some((queue, None)),
            Outcome::Redeliver { reason } | Outcome::Reject { reason } => {
                warn!(
                    topic = %delivery.topic,
                    id = %delivery.id,
                    attempt = delivery.attempt,
                    reason = %reason,
                    "dead-lettering message"
                );
                Some((format!("{}{}", queue, DEAD_LETTER_SUFFIX), Some(reason.clone())))
            }
        };

        let requeue = match target {
            None => None,
            Some((key, reason)) => {
                let envelope = Envelope {
                    id: delivery.id,
                    attempt: next_attempt,
                    payload: delivery.payload,
                    reason,
                };
                let json = serde_json::to_string(&envelope).map_err(RedisAdapterError::from)?;
                Some((key, json))
            }
        };

        let mut conn = self.pool.connection().await?;
        settle_pipeline(&processing, &delivery.receipt, requeue)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }
}

/// Remove a delivery from the processing list and, optionally, push its next
/// envelope onto `key`, as one transaction.
fn settle_pipeline(processing: &str, receipt: &str, requeue: Option<(String, String)>) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().lrem(processing, 1, receipt).ignore();
    if let Some((key, json)) = requeue {
        pipe.lpush(key, json).ignore();
    }
    pipe
}
