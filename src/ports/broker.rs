use crate::domain::outcome::Outcome;
use crate::error::PortError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// One message handed to a subscriber.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: Uuid,
    pub topic: String,
    /// Number of earlier deliveries of the same message.
    pub attempt: u32,
    pub payload: String,
    /// Adapter-specific handle used to settle the delivery.
    pub(crate) receipt: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a JSON payload to a topic
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PortError>;
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Wait up to `timeout` for the next message on `topic`.
    /// The message stays in flight until it is settled.
    async fn receive(&self, topic: &str, timeout: Duration)
        -> Result<Option<Delivery>, PortError>;

    /// Acknowledge, redeliver or dead-letter an in-flight message.
    async fn settle(&self, delivery: Delivery, outcome: &Outcome) -> Result<(), PortError>;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PortError> {
        (**self).publish(topic, payload).await
    }
}

#[async_trait]
impl<T: EventSubscriber + ?Sized> EventSubscriber for Arc<T> {
    async fn receive(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Option<Delivery>, PortError> {
        (**self).receive(topic, timeout).await
    }

    async fn settle(&self, delivery: Delivery, outcome: &Outcome) -> Result<(), PortError> {
        (**self).settle(delivery, outcome).await
    }
}
