use crate::domain::media::CodecProfile;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;

/// External audio/video engine. Each call runs to completion (or fails) before
/// returning; the exit status is left for the caller to inspect.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Concatenate the files listed in a concat manifest, without re-encoding.
    async fn concat(&self, manifest: &Path, output: &Path) -> io::Result<Output>;

    /// Copy all streams into a new container.
    async fn remux(&self, input: &Path, output: &Path) -> io::Result<Output>;

    /// Re-encode video and audio with the given codecs, overwriting `output`.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &CodecProfile,
    ) -> io::Result<Output>;
}
