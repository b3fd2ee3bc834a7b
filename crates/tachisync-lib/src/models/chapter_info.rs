use serde::{Deserialize, Serialize};

/// A type represent chapter, normalized across source.
///
/// Has no identity beyond `url` within a single sync pass.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChapterInfo {
    pub url: String,
    pub name: String,
    pub scanlator: Option<String>,
    /// `-1.0` when the source does not know the number
    pub chapter_number: f64,
    /// milliseconds since epoch, `0` when unknown
    pub date_upload: i64,
}

impl ChapterInfo {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            scanlator: None,
            chapter_number: -1.0,
            date_upload: 0,
        }
    }
}
