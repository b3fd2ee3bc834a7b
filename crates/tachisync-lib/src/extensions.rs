use std::sync::Arc;

use fnv::FnvHashMap;

use crate::{error::Error, models::SourceInfo, traits::Source};

/// In-process registry of the sources the host knows about, keyed by source id
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: FnvHashMap<i64, Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: Arc<dyn Source>) -> Result<(), Error> {
        let id = source.get_source_info().id;
        if self.sources.contains_key(&id) {
            return Err(Error::SourceExists(id));
        }
        self.sources.insert(id, source);

        Ok(())
    }

    pub fn unload(&mut self, id: i64) -> Result<Arc<dyn Source>, Error> {
        self.sources.remove(&id).ok_or(Error::SourceNotFound(id))
    }

    pub fn get(&self, id: i64) -> Result<Arc<dyn Source>, Error> {
        self.sources
            .get(&id)
            .cloned()
            .ok_or(Error::SourceNotFound(id))
    }

    pub fn list(&self) -> Vec<SourceInfo> {
        let mut list: Vec<SourceInfo> = self
            .sources
            .values()
            .map(|source| source.get_source_info())
            .collect();
        list.sort_by_key(|info| info.id);

        list
    }
}
