use serde::Serialize;
use std::fmt;

/// What the broker should do with a message once its handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Processed; drop the message.
    Acknowledge,
    /// Transient failure; deliver the same message again.
    Redeliver { reason: String },
    /// The message can never succeed; dead-letter it.
    Reject { reason: String },
}

impl Outcome {
    pub fn redeliver(reason: impl fmt::Display) -> Self {
        Outcome::Redeliver {
            reason: reason.to_string(),
        }
    }

    pub fn reject(reason: impl fmt::Display) -> Self {
        Outcome::Reject {
            reason: reason.to_string(),
        }
    }

    /// Status word of the push-subscription response.
    pub fn status(&self) -> DeliveryStatus {
        match self {
            Outcome::Acknowledge => DeliveryStatus::Success,
            Outcome::Redeliver { .. } => DeliveryStatus::Retry,
            Outcome::Reject { .. } => DeliveryStatus::Drop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Success,
    Retry,
    Drop,
}
