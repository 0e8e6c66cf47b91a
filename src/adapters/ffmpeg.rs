//! `MediaTool` backed by the ffmpeg command line.

use crate::domain::media::CodecProfile;
use crate::ports::media::MediaTool;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FfmpegCli {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill the process and fail with `TimedOut` once `timeout` has elapsed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, operation: &str, args: Vec<OsString>) -> io::Result<Output> {
        let mut command = TokioCommand::new(&self.binary);
        command
            .arg("-nostdin")
            .arg("-hide_banner")
            .arg("-y")
            .args(args)
            .kill_on_drop(true);
        debug!(operation, ?command, "running ffmpeg");

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} did not finish within {:?}", operation, limit),
                    )
                })?,
            None => command.output().await,
        }
    }
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        manifest.into(),
        "-c".into(),
        "copy".into(),
        "-avoid_negative_ts".into(),
        "make_non_negative".into(),
        output.into(),
    ]
}

fn remux_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.into(),
        "-c".into(),
        "copy".into(),
        output.into(),
    ]
}

fn transcode_args(input: &Path, output: &Path, profile: &CodecProfile) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.into(),
        "-c:v".into(),
        profile.video.as_str().into(),
        "-c:a".into(),
        profile.audio.as_str().into(),
        output.into(),
    ]
}

#[async_trait]
impl MediaTool for FfmpegCli {
    async fn concat(&self, manifest: &Path, output: &Path) -> io::Result<Output> {
        self.run("concat", concat_args(manifest, output)).await
    }

    async fn remux(&self, input: &Path, output: &Path) -> io::Result<Output> {
        self.run("remux", remux_args(input, output)).await
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &CodecProfile,
    ) -> io::Result<Output> {
        self.run("transcode", transcode_args(input, output, profile))
            .await
    }
}
