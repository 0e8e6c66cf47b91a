use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Container every converted video ends up in.
pub const CONVERTED_CONTAINER: &str = "mp4";

const COMPRESSED_SUFFIX: &str = "_compressed";

/// A video artifact at one pipeline stage.
///
/// `title`, `path` and `extension` are enough to derive every file name the
/// stage reads or writes. Serialized as `{title, path, extension}`, which is the
/// shape of the `merged` and `converted` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    pub title: String,
    pub path: PathBuf,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl VideoReference {
    pub fn new(title: impl Into<String>, path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            extension: extension.into(),
            slug: None,
        }
    }

    /// `{path}/{title}.{extension}`
    pub fn raw_path(&self) -> PathBuf {
        self.path.join(format!("{}.{}", self.title, self.extension))
    }

    /// `{path}/{title}_compressed.mp4`
    pub fn compressed_path(&self) -> PathBuf {
        self.path
            .join(format!("{}{}.{}", self.title, COMPRESSED_SUFFIX, CONVERTED_CONTAINER))
    }

    /// Reference to the compressed artifact, shaped so its `raw_path` is the
    /// compressed file.
    pub fn compressed(&self) -> VideoReference {
        VideoReference::new(
            format!("{}{}", self.title, COMPRESSED_SUFFIX),
            self.path.clone(),
            CONVERTED_CONTAINER,
        )
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_file_stem("title", &self.title)?;
        validate_file_stem("extension", &self.extension)
    }
}

/// Entry event published by the ingest service (`video-recorded`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedVideo {
    pub title: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_dir_path: Option<PathBuf>,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl RecordedVideo {
    /// Chunk file prefix. Falls back to the title.
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.title)
    }

    pub fn chunk_dir(&self) -> &Path {
        self.chunk_dir_path.as_deref().unwrap_or(&self.path)
    }

    pub fn output_dir(&self) -> &Path {
        self.output_path.as_deref().unwrap_or(&self.path)
    }

    /// `{outputPath}/{title}.{extension}`
    pub fn merged_path(&self) -> PathBuf {
        self.merged().raw_path()
    }

    /// The `merged` event describing the output of this recording.
    pub fn merged(&self) -> VideoReference {
        VideoReference::new(
            self.title.clone(),
            self.output_dir().to_path_buf(),
            self.extension.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_file_stem("title", &self.title)?;
        validate_file_stem("slug", self.slug())?;
        validate_file_stem("extension", &self.extension)
    }
}

/// Converter inbound event: a raw file plus the container to move it into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub title: String,
    pub path: PathBuf,
    #[serde(alias = "rawExtension")]
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_extension: Option<String>,
}

impl ConvertRequest {
    pub fn source(&self) -> VideoReference {
        VideoReference::new(self.title.clone(), self.path.clone(), self.extension.clone())
    }

    pub fn target_extension<'a>(&'a self, default: &'a str) -> &'a str {
        self.converted_extension.as_deref().unwrap_or(default)
    }
}

/// Names used to build file paths must stay inside their directory.
fn validate_file_stem(field: &str, value: &str) -> Result<(), PipelineError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !value.contains('/') => Ok(()),
        _ => Err(PipelineError::InvalidEvent(format!(
            "{} {:?} must be a single file name component",
            field, value
        ))),
    }
}
