//! In-process adapters.
//!
//! Used by the monolith when no Redis is configured and by the tests. Nothing
//! here survives a restart.

mod broker;
mod state;

pub use broker::MemoryBroker;
pub use state::MemoryStateStore;
