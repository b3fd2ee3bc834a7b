#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manga {
    pub id: i64,
    pub source_id: i64,
    pub url: String,
    pub title: String,
    pub favorite: bool,
    /// last time the chapter list changed, milliseconds since epoch
    pub last_update: i64,
    /// milliseconds since epoch
    pub next_update: i64,
    /// days between updates, negative when fixed by the user
    pub fetch_interval: i32,
    pub date_added: i64,
}
