use std::collections::HashSet;

pub const EH_SOURCE_ID: i64 = 6901;
pub const EXH_SOURCE_ID: i64 = 6902;

/// Highest favorites slot index on the gallery site
pub const MAX_CATEGORIES: i32 = 9;

pub fn is_gallery_source(source_id: i64) -> bool {
    source_id == EH_SOURCE_ID || source_id == EXH_SOURCE_ID
}

/// Source ids a gallery may be stored under locally, `preferred` first.
pub fn gallery_source_ids(preferred: i64) -> Vec<i64> {
    let mut ids = vec![preferred];
    ids.extend(
        [EXH_SOURCE_ID, EH_SOURCE_ID]
            .into_iter()
            .filter(|id| *id != preferred),
    );
    ids
}

pub fn gallery_url(gid: &str, token: &str) -> String {
    format!("/g/{gid}/{token}/")
}

/// Extract `(gid, token)` from either a relative `/g/{gid}/{token}/` url or an absolute one.
pub fn parse_gallery_url(url: &str) -> Option<(String, String)> {
    let mut segments = url
        .split(['?', '#'])
        .next()?
        .split('/')
        .skip_while(|segment| *segment != "g")
        .skip(1);

    let gid = segments.next().filter(|s| !s.is_empty())?;
    let token = segments.next().filter(|s| !s.is_empty())?;
    if !gid.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((gid.to_string(), token.to_string()))
}

/// One remote-favorited gallery as of the last completed sync
#[derive(Debug, Clone)]
pub struct FavoriteEntry {
    pub gid: String,
    pub token: String,
    pub category: i32,
    pub title: String,
}

impl FavoriteEntry {
    pub fn gallery_url(&self) -> String {
        gallery_url(&self.gid, &self.token)
    }

    fn key(&self) -> (&str, &str, i32) {
        (&self.gid, &self.token, self.category)
    }
}

// title is display only, an entry is the same favorite when gid, token and slot match
impl PartialEq for FavoriteEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FavoriteEntry {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<FavoriteEntry>,
    pub removed: Vec<FavoriteEntry>,
}

impl ChangeSet {
    pub fn between(current: &[FavoriteEntry], snapshot: &[FavoriteEntry]) -> Self {
        let current_keys: HashSet<_> = current.iter().map(FavoriteEntry::key).collect();
        let snapshot_keys: HashSet<_> = snapshot.iter().map(FavoriteEntry::key).collect();

        Self {
            added: current
                .iter()
                .filter(|entry| !snapshot_keys.contains(&entry.key()))
                .cloned()
                .collect(),
            removed: snapshot
                .iter()
                .filter(|entry| !current_keys.contains(&entry.key()))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
