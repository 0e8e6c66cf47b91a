use serde::{Deserialize, Serialize};

/// Codec pair the compressor encodes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecProfile {
    pub video: String,
    pub audio: String,
}

impl Default for CodecProfile {
    fn default() -> Self {
        Self {
            video: String::from("h264"),
            audio: String::from("mp2"),
        }
    }
}
