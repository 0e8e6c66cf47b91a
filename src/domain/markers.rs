use serde::{Deserialize, Serialize};

/// Bookmark into a lesson recording, stored under the video slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMarker {
    pub lesson_index: i64,
    pub lesson_slug: String,
}
