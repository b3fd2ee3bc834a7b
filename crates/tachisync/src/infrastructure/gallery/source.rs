use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tachisync_lib::prelude::{ChapterInfo, MangaInfo, Source, SourceInfo};

use crate::domain::{
    entities::favorite::{EXH_SOURCE_ID, parse_gallery_url},
    repositories::gallery::GalleryRepository,
};

/// Exposes the gallery site through the generic source interface
pub struct GallerySource<G>
where
    G: GalleryRepository,
{
    info: SourceInfo,
    gallery: G,
}

impl<G> GallerySource<G>
where
    G: GalleryRepository,
{
    pub fn new(source_id: i64, base_url: &str, gallery: G) -> Self {
        let name = if source_id == EXH_SOURCE_ID {
            "ExHentai"
        } else {
            "E-Hentai"
        };

        Self {
            info: SourceInfo {
                id: source_id,
                name: name.to_string(),
                url: base_url.to_string(),
                nsfw: true,
                local: false,
            },
            gallery,
        }
    }
}

#[async_trait]
impl<G> Source for GallerySource<G>
where
    G: GalleryRepository + 'static,
{
    fn get_source_info(&self) -> SourceInfo {
        self.info.clone()
    }

    async fn get_manga_detail(&self, url: String) -> Result<MangaInfo> {
        let (gid, token) =
            parse_gallery_url(&url).ok_or_else(|| anyhow!("{url} is not a gallery url"))?;
        let gallery = self.gallery.fetch_gallery(&gid, &token).await?;

        Ok(MangaInfo {
            source_id: self.info.id,
            title: gallery.title.clone(),
            url: gallery.url(),
            cover_url: None,
        })
    }

    async fn get_chapters(&self, url: String) -> Result<Vec<ChapterInfo>> {
        let (gid, token) =
            parse_gallery_url(&url).ok_or_else(|| anyhow!("{url} is not a gallery url"))?;
        let gallery = self.gallery.fetch_gallery(&gid, &token).await?;

        Ok(gallery.chapters())
    }
}
