//! Virtual file url index.

use crate::entity::EntityId;
use crate::file_url::VirtualFileUrl;
use crate::persistent::PersistentMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Url-valued properties in both directions.
#[derive(Clone)]
pub(crate) struct FileUrlIndex {
    by_url: PersistentMap<VirtualFileUrl, Arc<HashSet<(EntityId, Arc<str>)>>>,
    by_entity: PersistentMap<EntityId, Arc<[(Arc<str>, VirtualFileUrl)]>>,
}

impl FileUrlIndex {
    pub(crate) fn new(shards: usize) -> Self {
        Self {
            by_url: PersistentMap::new(shards),
            by_entity: PersistentMap::new(shards),
        }
    }

    pub(crate) fn insert(&mut self, id: EntityId, urls: Vec<(Arc<str>, VirtualFileUrl)>) {
        if urls.is_empty() {
            return;
        }
        for (property, url) in &urls {
            Arc::make_mut(self.by_url.get_or_insert_default(url.clone()))
                .insert((id, Arc::clone(property)));
        }
        self.by_entity.insert(id, urls.into());
    }

    pub(crate) fn remove(&mut self, id: EntityId) {
        let Some(urls) = self.by_entity.remove(&id) else {
            return;
        };
        for (property, url) in urls.iter() {
            let now_empty = match self.by_url.get_mut(url) {
                Some(holders) => {
                    let holders = Arc::make_mut(holders);
                    holders.remove(&(id, Arc::clone(property)));
                    holders.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.by_url.remove(url);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_url.len()
    }

    pub(crate) fn sharing(&self, other: &Self) -> (usize, usize) {
        (
            self.by_url.shared_shards(&other.by_url) + self.by_entity.shared_shards(&other.by_entity),
            self.by_url.shard_count() + self.by_entity.shard_count(),
        )
    }
}

/// Read-only view of the url index of a snapshot or builder.
#[derive(Clone, Copy)]
pub struct VirtualFileUrlIndex<'a> {
    index: &'a FileUrlIndex,
}

impl<'a> VirtualFileUrlIndex<'a> {
    pub(crate) fn new(index: &'a FileUrlIndex) -> Self {
        Self { index }
    }

    /// Iterates `(entity, property)` pairs whose property holds `url`.
    pub fn find_entities_by_url(
        &self,
        url: &VirtualFileUrl,
    ) -> impl Iterator<Item = (EntityId, &'a str)> + 'a {
        self.index
            .by_url
            .get(url)
            .into_iter()
            .flat_map(|holders| holders.iter().map(|(id, property)| (*id, &**property)))
    }

    /// Returns the `(property, url)` pairs held by an entity.
    #[must_use]
    pub fn urls_of(&self, id: EntityId) -> &'a [(Arc<str>, VirtualFileUrl)] {
        self.index.by_entity.get(&id).map_or(&[], |urls| urls)
    }

    /// Returns true if any entity holds `url`.
    #[must_use]
    pub fn contains_url(&self, url: &VirtualFileUrl) -> bool {
        self.index.by_url.contains_key(url)
    }

    /// Returns the number of distinct urls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no entity holds a url.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for VirtualFileUrlIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileUrlIndex")
            .field("urls", &self.len())
            .finish()
    }
}
