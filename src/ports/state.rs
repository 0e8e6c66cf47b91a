use crate::error::PortError;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable key/value store. Last write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_state(&self, key: &str, value: String) -> Result<(), PortError>;

    async fn get_state(&self, key: &str) -> Result<Option<String>, PortError>;

    /// Deleting a missing key is not an error.
    async fn delete_state(&self, key: &str) -> Result<(), PortError>;
}

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn save_state(&self, key: &str, value: String) -> Result<(), PortError> {
        (**self).save_state(key, value).await
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, PortError> {
        (**self).get_state(key).await
    }

    async fn delete_state(&self, key: &str) -> Result<(), PortError> {
        (**self).delete_state(key).await
    }
}
