use serde::{Deserialize, Serialize};

/// A type represent manga details, normalized across source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MangaInfo {
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub cover_url: Option<String>,
}
