use crate::domain::outcome::Outcome;
use crate::error::PortError;
use crate::ports::broker::{Delivery, EventPublisher, EventSubscriber};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Message {
    id: Uuid,
    attempt: u32,
    payload: String,
}

#[derive(Debug, Default)]
struct TopicQueue {
    ready: VecDeque<Message>,
    in_flight: HashMap<Uuid, Message>,
    dead: Vec<Message>,
}

#[derive(Debug)]
struct Inner {
    topics: Mutex<HashMap<String, TopicQueue>>,
    notify: Notify,
    max_deliveries: u32,
}

/// Work queue per topic with at-least-once delivery between local tasks.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new(max_deliveries: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                notify: Notify::new(),
                max_deliveries: max_deliveries.max(1),
            }),
        }
    }

    /// Messages waiting to be received on `topic`.
    pub async fn pending(&self, topic: &str) -> usize {
        let topics = self.inner.topics.lock().await;
        topics.get(topic).map_or(0, |q| q.ready.len())
    }

    /// Payloads that were rejected or ran out of deliveries on `topic`.
    pub async fn dead_letters(&self, topic: &str) -> Vec<String> {
        let topics = self.inner.topics.lock().await;
        topics
            .get(topic)
            .map(|q| q.dead.iter().map(|m| m.payload.clone()).collect())
            .unwrap_or_default()
    }

    async fn take(&self, topic: &str) -> Option<Delivery> {
        let mut topics = self.inner.topics.lock().await;
        let queue = topics.get_mut(topic)?;
        let message = queue.ready.pop_front()?;
        queue.in_flight.insert(message.id, message.clone());
        Some(Delivery {
            id: message.id,
            topic: topic.to_string(),
            attempt: message.attempt,
            payload: message.payload,
            receipt: message.id.to_string(),
        })
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl EventPublisher for MemoryBroker {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PortError> {
        let message = Message {
            id: Uuid::new_v4(),
            attempt: 0,
            payload,
        };
        self.inner
            .topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .ready
            .push_back(message);
        self.inner.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MemoryBroker {
    async fn receive(&self, topic: &str, timeout: Duration) -> Result<Option<Delivery>, PortError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before looking so a concurrent publish is not missed.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivery) = self.take(topic).await {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn settle(&self, delivery: Delivery, outcome: &Outcome) -> Result<(), PortError> {
        let mut topics = self.inner.topics.lock().await;
        let queue = topics.entry(delivery.topic.clone()).or_default();
        let Some(mut message) = queue.in_flight.remove(&delivery.id) else {
            return Err(format!("delivery {} is not in flight", delivery.id).into());
        };

        message.attempt = message.attempt.saturating_add(1);
        match outcome {
            Outcome::Acknowledge => {}
            Outcome::Redeliver { .. } if message.attempt < self.inner.max_deliveries => {
                queue.ready.push_back(message);
                self.inner.notify.notify_waiters();
            }
            Outcome::Redeliver { reason } | Outcome::Reject { reason } => {
                warn!(topic = %delivery.topic, id = %delivery.id, reason = %reason, "dead-lettering message");
                queue.dead.push(message);
            }
        }
        Ok(())
    }
}
