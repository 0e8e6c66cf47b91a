//! Domain layer - Pure business logic.

pub mod chunks;
pub mod markers;
pub mod media;
pub mod outcome;
pub mod video;

/// Default topic names of the pipeline chain.
pub mod topics {
    pub const VIDEO_RECORDED: &str = "video-recorded";
    pub const VIDEO_MERGED: &str = "video-merged";
    pub const VIDEO_CONVERTED: &str = "video-converted";
}
