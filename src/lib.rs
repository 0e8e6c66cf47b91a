//! Vidchain - Event-driven lesson video pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Event schemas, file naming, chunk ordering, delivery outcomes
//! - ports/: Trait definitions (broker, state store, media tool)
//! - adapters/: Concrete implementations (Redis, in-memory, ffmpeg, HTTP)
//! - application/: Stage services (merger, converter, compressor) and the API services
//! - config: Environment configuration
//!
//! # Binaries
//! - `video_server`: ingest and marker API
//! - `video_merger`, `video_converter`, `video_compressor`: one stage each
//! - `monolith`: API and every stage in one process

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;
pub mod runtime;

pub use error::{ConfigError, PipelineError, PortError};
