use serde::{Deserialize, Serialize};

/// A type represent source
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub nsfw: bool,
    /// Local sources read from disk and may legitimately have no chapters
    #[serde(default)]
    pub local: bool,
}
