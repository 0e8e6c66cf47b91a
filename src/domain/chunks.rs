//! Recording chunks and the concat manifest built from them.
//!
//! A recording arrives as a directory of fragments named `{slug}_{index}.{extension}`.
//! Only regular files with the slug prefix and the extension suffix are
//! considered; among those, the token after the final `_` must be an integer.

use crate::error::PipelineError;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manifest file name, written next to the chunks.
pub const MANIFEST_FILE_NAME: &str = "concat-list.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoChunk {
    pub name: String,
    pub index: u64,
    pub path: PathBuf,
}

/// Matches chunk file names for one slug/extension pair.
#[derive(Debug, Clone)]
pub struct ChunkPattern {
    regex: Regex,
}

impl ChunkPattern {
    pub fn new(slug: &str, extension: &str) -> Result<Self, PipelineError> {
        let pattern = format!(
            r"^{}_(?P<rest>.*)\.{}$",
            regex::escape(slug),
            regex::escape(extension)
        );
        let regex = Regex::new(&pattern)
            .map_err(|e| PipelineError::InvalidEvent(format!("chunk pattern: {}", e)))?;
        Ok(Self { regex })
    }

    /// `None` when the name is not a chunk of this recording at all.
    ///
    /// A remainder containing `_` belongs to another recording whose slug
    /// starts with `{slug}_` and is never a member.
    pub fn parse(&self, name: &str) -> Option<Result<u64, PipelineError>> {
        let captures = self.regex.captures(name)?;
        let index = captures.name("rest").map_or("", |m| m.as_str());
        if index.contains('_') {
            return None;
        }
        Some(parse_index(index).ok_or_else(|| PipelineError::InvalidChunkName {
            name: name.to_string(),
        }))
    }
}

fn parse_index(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Result of scanning a chunk directory.
#[derive(Debug, Default)]
pub struct ChunkScan {
    /// Well-formed chunks in directory-listing order.
    pub chunks: Vec<VideoChunk>,
    /// First candidate whose index could not be parsed.
    pub invalid: Option<String>,
}

impl ChunkScan {
    /// Turn the scan into the merge order, or the reason there is none.
    pub fn ordered(&self, slug: &str, dir: &Path) -> Result<Vec<VideoChunk>, PipelineError> {
        if let Some(name) = &self.invalid {
            return Err(PipelineError::InvalidChunkName { name: name.clone() });
        }
        if self.chunks.is_empty() {
            return Err(PipelineError::EmptyChunkSet {
                slug: slug.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        order_chunks(self.chunks.clone())
    }
}

/// List the chunks of `slug` in `dir`, non-recursively.
pub async fn scan_chunks(
    dir: &Path,
    slug: &str,
    extension: &str,
) -> Result<ChunkScan, PipelineError> {
    let dir = tokio::fs::canonicalize(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))?;
    let pattern = ChunkPattern::new(slug, extension)?;
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| PipelineError::io(&dir, e))?;

    let mut scan = ChunkScan::default();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(&dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| PipelineError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!(dir = %dir.display(), name = ?raw, "skipping file name that is not UTF-8");
                continue;
            }
        };
        match pattern.parse(&name) {
            None => continue,
            Some(Ok(index)) => scan.chunks.push(VideoChunk {
                path: dir.join(&name),
                name,
                index,
            }),
            Some(Err(_)) => {
                scan.invalid.get_or_insert(name);
            }
        }
    }
    Ok(scan)
}

/// Sort ascending by index. Two chunks with the same index are an input error.
pub fn order_chunks(mut chunks: Vec<VideoChunk>) -> Result<Vec<VideoChunk>, PipelineError> {
    chunks.sort_by_key(|chunk| chunk.index);
    if let Some(pair) = chunks.windows(2).find(|w| w[0].index == w[1].index) {
        return Err(PipelineError::DuplicateChunkIndex {
            index: pair[0].index,
            first: pair[0].name.clone(),
            second: pair[1].name.clone(),
        });
    }
    Ok(chunks)
}

/// Concat demuxer manifest: one `file '<path>'` line per chunk.
pub fn render_manifest(chunks: &[VideoChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let path = chunk.path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", path)
        })
        .collect()
}
