//! Error types shared by the pipeline stages.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Boxed error returned by port implementations.
pub type PortError = Box<dyn Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("chunk file name {name:?} has no integer sequence index")]
    InvalidChunkName { name: String },

    #[error("sequence index {index} appears more than once ({first:?}, {second:?})")]
    DuplicateChunkIndex {
        index: u64,
        first: String,
        second: String,
    },

    #[error("no chunks for slug {slug:?} in {dir:?}")]
    EmptyChunkSet { slug: String, dir: PathBuf },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} could not run: {source}")]
    MediaSpawn {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out: {source}")]
    MediaTimedOut {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} exited with {status}: {stderr}")]
    MediaFailed {
        operation: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to publish to {topic:?}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: PortError,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether redelivering the same message may succeed.
    ///
    /// Malformed input and missing chunks will look the same on every delivery;
    /// infrastructure failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Decode(_)
            | PipelineError::InvalidEvent(_)
            | PipelineError::InvalidChunkName { .. }
            | PipelineError::DuplicateChunkIndex { .. }
            | PipelineError::EmptyChunkSet { .. } => false,
            PipelineError::Io { .. }
            | PipelineError::MediaSpawn { .. }
            | PipelineError::MediaTimedOut { .. }
            | PipelineError::MediaFailed { .. }
            | PipelineError::Publish { .. } => true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}
