//! Entity source index.

use crate::entity::{EntityId, EntitySource};
use crate::persistent::{PersistentMap, PersistentSet};

/// Groups entity IDs by their [`EntitySource`].
#[derive(Clone)]
pub(crate) struct SourceIndex {
    by_source: PersistentMap<EntitySource, PersistentSet<EntityId>>,
    shards: usize,
}

impl SourceIndex {
    pub(crate) fn new(shards: usize) -> Self {
        Self {
            by_source: PersistentMap::new(shards),
            shards,
        }
    }

    pub(crate) fn insert(&mut self, source: &EntitySource, id: EntityId) {
        // Per-source sets use few shards; most sources hold a handful of ids.
        let shards = self.set_shards();
        match self.by_source.get_mut(source) {
            Some(ids) => {
                ids.insert(id);
            }
            None => {
                let mut ids = PersistentSet::new(shards);
                ids.insert(id);
                self.by_source.insert(source.clone(), ids);
            }
        }
    }

    pub(crate) fn remove(&mut self, source: &EntitySource, id: EntityId) {
        let now_empty = match self.by_source.get_mut(source) {
            Some(ids) => {
                ids.remove(&id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_source.remove(source);
        }
    }

    /// Iterates sources together with their entity IDs.
    pub(crate) fn iter(
        &self,
    ) -> impl Iterator<Item = (&EntitySource, impl Iterator<Item = EntityId> + '_)> + '_ {
        self.by_source
            .iter()
            .map(|(source, ids)| (source, ids.iter().copied()))
    }

    /// Returns the number of entities with the given source.
    pub(crate) fn count(&self, source: &EntitySource) -> usize {
        self.by_source.get(source).map_or(0, PersistentSet::len)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, source: &EntitySource, id: EntityId) -> bool {
        self.by_source
            .get(source)
            .is_some_and(|ids| ids.contains(&id))
    }

    /// Returns the number of distinct sources.
    pub(crate) fn len(&self) -> usize {
        self.by_source.len()
    }

    pub(crate) fn sharing(&self, other: &Self) -> (usize, usize) {
        (
            self.by_source.shared_shards(&other.by_source),
            self.by_source.shard_count(),
        )
    }

    fn set_shards(&self) -> usize {
        (self.shards / 4).max(1)
    }
}
