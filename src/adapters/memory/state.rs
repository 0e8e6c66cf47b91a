use crate::error::PortError;
use crate::ports::state::StateStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save_state(&self, key: &str, value: String) -> Result<(), PortError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn delete_state(&self, key: &str) -> Result<(), PortError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_overwrites_and_delete_is_idempotent() {
        let store = MemoryStateStore::new();
        store.save_state("k", "1".to_string()).await.unwrap();
        store.save_state("k", "2".to_string()).await.unwrap();
        assert_eq!(store.get_state("k").await.unwrap().as_deref(), Some("2"));

        store.delete_state("k").await.unwrap();
        store.delete_state("k").await.unwrap();
        assert_eq!(store.get_state("k").await.unwrap(), None);
    }
}
