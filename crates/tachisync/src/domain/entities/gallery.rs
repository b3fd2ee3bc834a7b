use tachisync_lib::models::ChapterInfo;

use super::favorite::{gallery_url, FavoriteEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryVersion {
    pub gid: String,
    pub token: String,
    pub title: String,
    pub posted: i64,
}

/// A gallery page as scraped from the gallery site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    pub gid: String,
    pub token: String,
    pub title: String,
    /// milliseconds since epoch, `0` when the page had no posted date
    pub posted: i64,
    /// newer uploads of the same work, oldest first
    pub newer_versions: Vec<GalleryVersion>,
}

impl Gallery {
    pub fn url(&self) -> String {
        gallery_url(&self.gid, &self.token)
    }

    /// A gallery is exposed as one chapter per version, newest first.
    pub fn chapters(&self) -> Vec<ChapterInfo> {
        let mut chapters = Vec::with_capacity(self.newer_versions.len() + 1);
        chapters.push(ChapterInfo {
            url: self.url(),
            name: format!("v1: {}", self.title),
            scanlator: None,
            chapter_number: 1.0,
            date_upload: self.posted,
        });

        for (index, version) in self.newer_versions.iter().enumerate() {
            let number = index + 2;
            chapters.push(ChapterInfo {
                url: gallery_url(&version.gid, &version.token),
                name: format!("v{number}: {}", version.title),
                scanlator: None,
                chapter_number: number as f64,
                date_upload: version.posted,
            });
        }

        chapters.reverse();
        chapters
    }
}

/// Everything the favorites page lists for the logged in account
#[derive(Debug, Clone, Default)]
pub struct RemoteFavorites {
    /// favorite slot names, index is the slot number
    pub categories: Vec<String>,
    pub galleries: Vec<FavoriteEntry>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_chapters_newest_first() {
        let gallery = Gallery {
            gid: "100".to_string(),
            token: "aaa".to_string(),
            title: "Original".to_string(),
            posted: 1_000,
            newer_versions: vec![
                GalleryVersion {
                    gid: "200".to_string(),
                    token: "bbb".to_string(),
                    title: "Revised".to_string(),
                    posted: 2_000,
                },
                GalleryVersion {
                    gid: "300".to_string(),
                    token: "ccc".to_string(),
                    title: "Final".to_string(),
                    posted: 3_000,
                },
            ],
        };

        let chapters = gallery.chapters();

        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].url, "/g/300/ccc/");
        assert_eq!(chapters[0].name, "v3: Final");
        assert_eq!(chapters[0].chapter_number, 3.0);
        assert_eq!(chapters[2].url, "/g/100/aaa/");
        assert_eq!(chapters[2].name, "v1: Original");
        assert_eq!(chapters[2].date_upload, 1_000);
    }
}
