//! Entry point of the pipeline: turns a recording notification into the
//! first event.

use super::stage::Downstream;
use crate::domain::video::RecordedVideo;
use crate::error::PipelineError;
use crate::ports::broker::EventPublisher;

pub struct IngestService<P> {
    downstream: Downstream<P>,
}

impl<P: EventPublisher> IngestService<P> {
    pub fn new(downstream: Downstream<P>) -> Self {
        Self { downstream }
    }

    /// Publish the recording to the entry topic as received.
    pub async fn record(&self, video: &RecordedVideo) -> Result<(), PipelineError> {
        self.downstream.publish(video).await
    }
}
