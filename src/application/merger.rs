//! Chunk merger stage: `video-recorded` in, `merged` out.

use super::cleanup::CleanupGuard;
use super::stage::{check_media, Downstream, Stage};
use crate::domain::chunks::{render_manifest, scan_chunks, MANIFEST_FILE_NAME};
use crate::domain::video::{RecordedVideo, VideoReference};
use crate::error::PipelineError;
use crate::ports::broker::EventPublisher;
use crate::ports::media::MediaTool;
use async_trait::async_trait;
use tracing::{debug, info};

const STAGE: &str = "merger";

pub struct MergerService<M, P> {
    media: M,
    downstream: Downstream<P>,
}

impl<M, P> MergerService<M, P>
where
    M: MediaTool,
    P: EventPublisher,
{
    pub fn new(media: M, downstream: Downstream<P>) -> Self {
        Self { media, downstream }
    }

    /// Concatenate the recording's chunks into `{outputPath}/{title}.{extension}`.
    ///
    /// Every well-formed chunk and the manifest are removed before this returns,
    /// whether the merge succeeded or not.
    pub async fn merge(&self, video: &RecordedVideo) -> Result<VideoReference, PipelineError> {
        video.validate()?;
        let slug = video.slug();
        let chunk_dir = video.chunk_dir();

        let scan = scan_chunks(chunk_dir, slug, &video.extension).await?;
        let mut cleanup = CleanupGuard::new(STAGE);
        for chunk in &scan.chunks {
            cleanup.register(&chunk.path);
        }
        let chunks = scan.ordered(slug, chunk_dir)?;
        for chunk in &chunks {
            debug!(index = chunk.index, name = %chunk.name, "chunk");
        }

        let manifest_path = chunk_dir.join(MANIFEST_FILE_NAME);
        cleanup.register(&manifest_path);
        tokio::fs::write(&manifest_path, render_manifest(&chunks))
            .await
            .map_err(|e| PipelineError::io(&manifest_path, e))?;

        let output_dir = video.output_dir();
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| PipelineError::io(output_dir, e))?;

        let merged_path = video.merged_path();
        cleanup.register(&merged_path);
        info!(chunks = chunks.len(), output = %merged_path.display(), "merging");
        check_media(
            "concat",
            self.media.concat(&manifest_path, &merged_path).await,
        )?;
        cleanup.keep(&merged_path);

        Ok(video.merged())
    }
}

#[async_trait]
impl<M, P> Stage for MergerService<M, P>
where
    M: MediaTool + 'static,
    P: EventPublisher + 'static,
{
    type Event = RecordedVideo;
    const NAME: &'static str = STAGE;

    async fn process(&self, event: RecordedVideo) -> Result<(), PipelineError> {
        let merged = self.merge(&event).await?;
        self.downstream.publish(&merged).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::stage::dispatch;
    use crate::application::testing::{exit_failed, exit_ok};
    use crate::domain::outcome::Outcome;
    use crate::ports::broker::MockEventPublisher;
    use crate::ports::media::MockMediaTool;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    /// Concatenate the files named in a concat manifest, like the demuxer would.
    fn concat_from_manifest(manifest: &Path, output: &Path) -> std::io::Result<()> {
        let listing = std::fs::read_to_string(manifest)?;
        let mut merged = Vec::new();
        for line in listing.lines() {
            let quoted = line.strip_prefix("file '").and_then(|l| l.strip_suffix('\''));
            let path = quoted.expect("manifest line").replace(r"'\''", "'");
            merged.extend(std::fs::read(path)?);
        }
        std::fs::write(output, merged)
    }

    fn concatenating_media() -> MockMediaTool {
        let mut media = MockMediaTool::new();
        media.expect_concat().returning(|manifest, output| {
            concat_from_manifest(manifest, output)?;
            Ok(exit_ok())
        });
        media
    }

    fn publisher_expecting(times: usize) -> MockEventPublisher {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .times(times)
            .returning(|_, _| Ok(()));
        publisher
    }

    fn recording(dir: &Path, out: &Path) -> RecordedVideo {
        RecordedVideo {
            title: "lesson-title".to_string(),
            path: dir.to_path_buf(),
            slug: Some("lesson".to_string()),
            chunk_dir_path: None,
            extension: "webm".to_string(),
            output_path: Some(out.to_path_buf()),
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_merges_in_index_order_and_cleans_up() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(chunks.path(), "lesson_0.webm", "A");
        write(chunks.path(), "lesson_2.webm", "C");
        write(chunks.path(), "lesson_10.webm", "D");
        write(chunks.path(), "lesson_1.webm", "B");
        let unrelated = write(chunks.path(), "other_0.webm", "X");
        let wrong_ext = write(chunks.path(), "lesson_3.mp4", "Y");

        let merger = MergerService::new(
            concatenating_media(),
            Downstream::new(publisher_expecting(0), "video-merged"),
        );
        let video = recording(chunks.path(), out.path());
        let merged = merger.merge(&video).await.unwrap();

        assert_eq!(merged, VideoReference::new("lesson-title", out.path(), "webm"));
        let output = out.path().join("lesson-title.webm");
        assert_eq!(std::fs::read_to_string(output).unwrap(), "ABCD");

        let mut left: Vec<String> = std::fs::read_dir(chunks.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["lesson_3.mp4", "other_0.webm"]);
        assert!(unrelated.exists() && wrong_ext.exists());
    }

    #[tokio::test]
    async fn test_sibling_recording_with_longer_slug_is_left_alone() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(chunks.path(), "lesson_0.webm", "A");
        write(chunks.path(), "lesson_1.webm", "B");
        let sibling = write(chunks.path(), "lesson_advanced_5.webm", "Z");

        let merger = MergerService::new(
            concatenating_media(),
            Downstream::new(publisher_expecting(0), "video-merged"),
        );
        merger
            .merge(&recording(chunks.path(), out.path()))
            .await
            .unwrap();

        let output = out.path().join("lesson-title.webm");
        assert_eq!(std::fs::read_to_string(output).unwrap(), "AB");
        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "Z");
    }

    #[tokio::test]
    async fn test_manifest_lists_chunks_in_order() {
        let chunks = tempdir().unwrap();
        write(chunks.path(), "lesson_0.webm", "");
        write(chunks.path(), "lesson_2.webm", "");
        write(chunks.path(), "lesson_1.webm", "");

        let mut media = MockMediaTool::new();
        media.expect_concat().times(1).returning(|manifest, _| {
            let listing = std::fs::read_to_string(manifest)?;
            let names: Vec<&str> = listing
                .lines()
                .map(|l| l.rsplit('/').next().unwrap().trim_end_matches('\''))
                .collect();
            assert_eq!(names, vec!["lesson_0.webm", "lesson_1.webm", "lesson_2.webm"]);
            assert!(manifest.ends_with(MANIFEST_FILE_NAME));
            Ok(exit_ok())
        });

        let merger = MergerService::new(media, Downstream::new(publisher_expecting(0), "t"));
        merger
            .merge(&recording(chunks.path(), chunks.path()))
            .await
            .unwrap();
        assert!(!chunks.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_empty_chunk_set_is_rejected_without_output() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        let mut media = MockMediaTool::new();
        media.expect_concat().never();

        let merger = MergerService::new(media, Downstream::new(publisher_expecting(0), "t"));
        let payload = serde_json::to_string(&recording(chunks.path(), out.path())).unwrap();
        let outcome = dispatch(&merger, &payload).await;

        assert!(matches!(outcome, Outcome::Reject { .. }));
        assert!(!out.path().join("lesson-title.webm").exists());
        assert!(!chunks.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_concat_failure_removes_chunks_and_requests_redelivery() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        let first = write(chunks.path(), "lesson_0.webm", "A");
        let second = write(chunks.path(), "lesson_1.webm", "B");

        let mut media = MockMediaTool::new();
        media.expect_concat().returning(|_, output| {
            std::fs::write(output, b"partial")?;
            Ok(exit_failed("Invalid data found when processing input"))
        });

        let merger = MergerService::new(media, Downstream::new(publisher_expecting(0), "t"));
        let payload = serde_json::to_string(&recording(chunks.path(), out.path())).unwrap();
        let outcome = dispatch(&merger, &payload).await;

        match outcome {
            Outcome::Redeliver { reason } => assert!(reason.contains("Invalid data")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!first.exists() && !second.exists());
        assert!(!chunks.path().join(MANIFEST_FILE_NAME).exists());
        assert!(!out.path().join("lesson-title.webm").exists());
    }

    #[tokio::test]
    async fn test_invalid_chunk_name_aborts_and_keeps_malformed_file() {
        let chunks = tempdir().unwrap();
        let valid = write(chunks.path(), "lesson_0.webm", "A");
        let malformed = write(chunks.path(), "lesson_final.webm", "?");

        let mut media = MockMediaTool::new();
        media.expect_concat().never();
        let merger = MergerService::new(media, Downstream::new(publisher_expecting(0), "t"));

        let err = merger
            .merge(&recording(chunks.path(), chunks.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidChunkName { .. }));
        assert!(!valid.exists());
        assert!(malformed.exists());
    }

    #[tokio::test]
    async fn test_duplicate_index_is_rejected() {
        let chunks = tempdir().unwrap();
        write(chunks.path(), "lesson_1.webm", "A");
        write(chunks.path(), "lesson_01.webm", "B");

        let mut media = MockMediaTool::new();
        media.expect_concat().never();
        let merger = MergerService::new(media, Downstream::new(publisher_expecting(0), "t"));

        let err = merger
            .merge(&recording(chunks.path(), chunks.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateChunkIndex { index: 1, .. }));
        assert_eq!(std::fs::read_dir(chunks.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_process_publishes_merged_event() {
        let chunks = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(chunks.path(), "lesson_0.webm", "A");

        let expected = serde_json::to_string(&VideoReference::new(
            "lesson-title",
            out.path(),
            "webm",
        ))
        .unwrap();
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(move |topic, payload| topic.to_string() == "video-merged" && *payload == expected)
            .times(1)
            .returning(|_, _| Ok(()));

        let merger = MergerService::new(
            concatenating_media(),
            Downstream::new(publisher, "video-merged"),
        );
        let payload = serde_json::to_string(&recording(chunks.path(), out.path())).unwrap();
        assert_eq!(dispatch(&merger, &payload).await, Outcome::Acknowledge);
    }
}
