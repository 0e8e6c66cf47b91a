//! Redis adapter.
//!
//! This module provides Redis-backed implementations of:
//! - `EventPublisher` / `EventSubscriber`: one reliable list queue per topic
//! - `StateStore`: plain string keys under the state store name

mod broker;
mod error;
mod pool;
mod state;

pub use broker::RedisBroker;
pub use error::RedisAdapterError;
pub use pool::RedisPool;
pub use state::RedisStateStore;

/// Redis key suffixes
const PROCESSING_SUFFIX: &str = ":processing";
const DEAD_LETTER_SUFFIX: &str = ":dead";
