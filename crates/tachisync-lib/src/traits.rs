use async_trait::async_trait;

use crate::models::{ChapterInfo, MangaInfo, SourceInfo};
use anyhow::Result;

#[async_trait]
pub trait Source: Send + Sync {
    fn get_source_info(&self) -> SourceInfo;

    async fn get_manga_detail(&self, url: String) -> Result<MangaInfo>;

    async fn get_chapters(&self, url: String) -> Result<Vec<ChapterInfo>>;
}
