//! Recording markers keyed by video slug.

use crate::domain::markers::RecordingMarker;
use crate::error::PortError;
use crate::ports::state::StateStore;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("Video recording marker not found")]
    NotFound,

    #[error("failed to encode marker: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("state store error: {0}")]
    Store(PortError),
}

pub struct MarkerService<S> {
    store: S,
}

impl<S: StateStore> MarkerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create or overwrite the marker of `slug`.
    pub async fn set(&self, slug: &str, marker: &RecordingMarker) -> Result<(), MarkerError> {
        let value = serde_json::to_string(marker)?;
        self.store
            .save_state(slug, value)
            .await
            .map_err(MarkerError::Store)?;
        info!(slug, ?marker, "marker set");
        Ok(())
    }

    /// A stored value that no longer decodes counts as missing.
    pub async fn get(&self, slug: &str) -> Result<RecordingMarker, MarkerError> {
        let value = self
            .store
            .get_state(slug)
            .await
            .map_err(MarkerError::Store)?
            .ok_or(MarkerError::NotFound)?;
        serde_json::from_str(&value).map_err(|e| {
            warn!(slug, error = %e, "stored marker is not decodable");
            MarkerError::NotFound
        })
    }

    pub async fn delete(&self, slug: &str) -> Result<(), MarkerError> {
        self.store
            .delete_state(slug)
            .await
            .map_err(MarkerError::Store)?;
        info!(slug, "marker deleted");
        Ok(())
    }
}
