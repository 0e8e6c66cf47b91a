//! Ports - Trait definitions for everything outside the process.

pub mod broker;
pub mod media;
pub mod state;
