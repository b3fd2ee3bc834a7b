use tachisync_lib::models::ChapterInfo;

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub id: i64,
    pub manga_id: i64,
    pub url: String,
    pub name: String,
    pub scanlator: Option<String>,
    pub chapter_number: f64,
    pub source_order: i64,
    pub date_upload: i64,
    pub date_fetch: i64,
    pub read: bool,
    pub bookmark: bool,
    pub last_page_read: i64,
    /// Soft-deleted chapters are kept for history and read state but hidden from normal lists
    pub deleted: bool,
}

impl Default for Chapter {
    fn default() -> Self {
        Self {
            id: 0,
            manga_id: 0,
            url: "".to_string(),
            name: "".to_string(),
            scanlator: None,
            chapter_number: -1.0,
            source_order: 0,
            date_upload: 0,
            date_fetch: 0,
            read: false,
            bookmark: false,
            last_page_read: 0,
            deleted: false,
        }
    }
}

impl Chapter {
    pub fn from_source(ch: ChapterInfo, manga_id: i64, source_order: i64) -> Self {
        Self {
            manga_id,
            url: ch.url,
            name: ch.name,
            scanlator: ch.scanlator,
            chapter_number: ch.chapter_number,
            source_order,
            date_upload: ch.date_upload,
            ..Default::default()
        }
    }

    pub fn is_recognized_number(&self) -> bool {
        self.chapter_number >= 0.0
    }
}
