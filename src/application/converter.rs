//! Container converter stage: `merged` in, `converted` out.

use super::cleanup::CleanupGuard;
use super::stage::{check_media, Downstream, Stage};
use crate::domain::video::{ConvertRequest, VideoReference};
use crate::error::PipelineError;
use crate::ports::broker::EventPublisher;
use crate::ports::media::MediaTool;
use async_trait::async_trait;
use tracing::info;

const STAGE: &str = "converter";

pub struct ConverterService<M, P> {
    media: M,
    downstream: Downstream<P>,
    target_extension: String,
}

impl<M, P> ConverterService<M, P>
where
    M: MediaTool,
    P: EventPublisher,
{
    pub fn new(media: M, downstream: Downstream<P>, target_extension: impl Into<String>) -> Self {
        Self {
            media,
            downstream,
            target_extension: target_extension.into(),
        }
    }

    /// Stream-copy the raw file into the target container.
    ///
    /// A missing raw file fails before the destination is touched. Otherwise the
    /// destination is truncated up front and removed again on failure, and the
    /// raw file is removed once the remux has been attempted, successful or not.
    pub async fn convert(&self, request: &ConvertRequest) -> Result<VideoReference, PipelineError> {
        let source = request.source();
        source.validate()?;
        let target = VideoReference::new(
            source.title.clone(),
            source.path.clone(),
            request.target_extension(&self.target_extension),
        );
        target.validate()?;

        let raw_path = source.raw_path();
        let converted_path = target.raw_path();
        if raw_path == converted_path {
            return Err(PipelineError::InvalidEvent(format!(
                "{} is already in the target container",
                raw_path.display()
            )));
        }

        // A redelivery after success finds no raw file; leave the output alone.
        tokio::fs::metadata(&raw_path)
            .await
            .map_err(|e| PipelineError::io(&raw_path, e))?;

        let mut cleanup = CleanupGuard::new(STAGE);
        cleanup.register(&raw_path);
        cleanup.register(&converted_path);
        tokio::fs::File::create(&converted_path)
            .await
            .map_err(|e| PipelineError::io(&converted_path, e))?;

        info!(from = %raw_path.display(), to = %converted_path.display(), "remuxing");
        check_media("remux", self.media.remux(&raw_path, &converted_path).await)?;
        cleanup.keep(&converted_path);

        Ok(target)
    }
}

#[async_trait]
impl<M, P> Stage for ConverterService<M, P>
where
    M: MediaTool + 'static,
    P: EventPublisher + 'static,
{
    type Event = ConvertRequest;
    const NAME: &'static str = STAGE;

    async fn process(&self, event: ConvertRequest) -> Result<(), PipelineError> {
        let converted = self.convert(&event).await?;
        self.downstream.publish(&converted).await
    }
}
