//! Codec compressor stage: `converted` in, optionally `compressed` out.
//!
//! Without a downstream topic this is the end of the pipeline and a successful
//! transcode is the completion signal.

use super::cleanup::CleanupGuard;
use super::stage::{check_media, Downstream, Stage};
use crate::domain::media::CodecProfile;
use crate::domain::video::VideoReference;
use crate::error::PipelineError;
use crate::ports::broker::EventPublisher;
use crate::ports::media::MediaTool;
use async_trait::async_trait;
use tracing::info;

const STAGE: &str = "compressor";

pub struct CompressorService<M, P> {
    media: M,
    downstream: Option<Downstream<P>>,
    profile: CodecProfile,
}

impl<M, P> CompressorService<M, P>
where
    M: MediaTool,
    P: EventPublisher,
{
    pub fn new(media: M, downstream: Option<Downstream<P>>, profile: CodecProfile) -> Self {
        Self {
            media,
            downstream,
            profile,
        }
    }

    /// Re-encode `{path}/{title}.{extension}` into `{path}/{title}_compressed.mp4`.
    ///
    /// A missing source fails before the destination is touched. Otherwise the
    /// source is consumed whatever the transcode outcome, and the destination
    /// only survives a successful transcode.
    pub async fn compress(&self, video: &VideoReference) -> Result<VideoReference, PipelineError> {
        video.validate()?;
        let source_path = video.raw_path();
        let compressed_path = video.compressed_path();

        // A redelivery after success finds no source; leave the output alone.
        tokio::fs::metadata(&source_path)
            .await
            .map_err(|e| PipelineError::io(&source_path, e))?;

        let mut cleanup = CleanupGuard::new(STAGE);
        cleanup.register(&source_path);
        cleanup.register(&compressed_path);

        tokio::fs::File::create(&compressed_path)
            .await
            .map_err(|e| PipelineError::io(&compressed_path, e))?;

        info!(
            from = %source_path.display(),
            to = %compressed_path.display(),
            video_codec = %self.profile.video,
            audio_codec = %self.profile.audio,
            "transcoding"
        );
        check_media(
            "transcode",
            self.media
                .transcode(&source_path, &compressed_path, &self.profile)
                .await,
        )?;
        cleanup.keep(&compressed_path);

        Ok(video.compressed())
    }
}

#[async_trait]
impl<M, P> Stage for CompressorService<M, P>
where
    M: MediaTool + 'static,
    P: EventPublisher + 'static,
{
    type Event = VideoReference;
    const NAME: &'static str = STAGE;

    async fn process(&self, event: VideoReference) -> Result<(), PipelineError> {
        let compressed = self.compress(&event).await?;
        match &self.downstream {
            Some(downstream) => downstream.publish(&compressed).await,
            None => {
                info!(output = %compressed.raw_path().display(), "pipeline complete");
                Ok(())
            }
        }
    }
}
