//! Adapters - Concrete implementations of ports.

pub mod ffmpeg;
pub mod http;
pub mod memory;
pub mod redis;
