//! Named external mappings from entity IDs to caller-owned values.

use crate::entity::EntityId;
use crate::persistent::PersistentMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A value stored in an external mapping.
pub type MappingValue = Arc<dyn Any + Send + Sync>;

type Entries = PersistentMap<EntityId, MappingValue>;

/// One entry-level difference between two mapping registries.
pub(crate) enum MappingEdit {
    Set {
        name: Arc<str>,
        id: EntityId,
        value: MappingValue,
    },
    Remove {
        name: Arc<str>,
        id: EntityId,
    },
}

/// All named mappings of a store.
#[derive(Clone)]
pub(crate) struct MappingRegistry {
    mappings: Arc<BTreeMap<Arc<str>, Entries>>,
    shards: usize,
}

impl MappingRegistry {
    pub(crate) fn new(shards: usize) -> Self {
        Self {
            mappings: Arc::new(BTreeMap::new()),
            shards,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Entries> {
        self.mappings.get(name)
    }

    pub(crate) fn set(&mut self, name: &str, id: EntityId, value: MappingValue) -> Option<MappingValue> {
        let shards = self.shards;
        let mappings = Arc::make_mut(&mut self.mappings);
        if let Some(entries) = mappings.get_mut(name) {
            return entries.insert(id, value);
        }
        let mut entries = PersistentMap::new(shards);
        entries.insert(id, value);
        mappings.insert(Arc::from(name), entries);
        None
    }

    pub(crate) fn remove(&mut self, name: &str, id: EntityId) -> Option<MappingValue> {
        if !self.get(name)?.contains_key(&id) {
            return None;
        }
        let mappings = Arc::make_mut(&mut self.mappings);
        let entries = mappings.get_mut(name)?;
        let previous = entries.remove(&id);
        if entries.is_empty() {
            mappings.remove(name);
        }
        previous
    }

    /// Drops the entries of an entity from every mapping holding it.
    pub(crate) fn remove_entity(&mut self, id: EntityId) {
        let holding: Vec<Arc<str>> = self
            .mappings
            .iter()
            .filter(|(_, entries)| entries.contains_key(&id))
            .map(|(name, _)| Arc::clone(name))
            .collect();
        for name in holding {
            self.remove(&name, id);
        }
    }

    /// Drops a whole mapping. Returns true if it existed.
    pub(crate) fn clear(&mut self, name: &str) -> bool {
        if !self.mappings.contains_key(name) {
            return false;
        }
        Arc::make_mut(&mut self.mappings).remove(name).is_some()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.mappings.keys().map(|name| &**name)
    }

    /// Iterates `(name, value)` pairs held by an entity.
    pub(crate) fn entries_of(&self, id: EntityId) -> impl Iterator<Item = (&str, &MappingValue)> + '_ {
        self.mappings
            .iter()
            .filter_map(move |(name, entries)| entries.get(&id).map(|value| (&**name, value)))
    }

    /// Lists the entry edits that turn `base` into `self`.
    ///
    /// Values are compared by pointer; shards still shared with `base` are
    /// skipped without being visited.
    pub(crate) fn edits_since(&self, base: &Self) -> Vec<MappingEdit> {
        let mut edits = Vec::new();
        if Arc::ptr_eq(&self.mappings, &base.mappings) {
            return edits;
        }
        for (name, entries) in self.mappings.iter() {
            let before = base.mappings.get(name);
            if before.is_some_and(|before| entries.shared_shards(before) == entries.shard_count()) {
                continue;
            }
            for (id, value) in entries.iter() {
                let unchanged = before
                    .and_then(|before| before.get(id))
                    .is_some_and(|old| Arc::ptr_eq(old, value));
                if !unchanged {
                    edits.push(MappingEdit::Set {
                        name: Arc::clone(name),
                        id: *id,
                        value: Arc::clone(value),
                    });
                }
            }
            if let Some(before) = before {
                edits.extend(
                    before
                        .keys()
                        .filter(|id| !entries.contains_key(*id))
                        .map(|id| MappingEdit::Remove {
                            name: Arc::clone(name),
                            id: *id,
                        }),
                );
            }
        }
        for (name, before) in base.mappings.iter() {
            if self.mappings.contains_key(name) {
                continue;
            }
            edits.extend(before.keys().map(|id| MappingEdit::Remove {
                name: Arc::clone(name),
                id: *id,
            }));
        }
        edits
    }

    /// Returns the total number of entries across all mappings.
    pub(crate) fn entry_count(&self) -> usize {
        self.mappings.values().map(PersistentMap::len).sum()
    }
}

/// Read-only view of one named mapping.
///
/// Views of unknown names are empty.
#[derive(Clone, Copy)]
pub struct ExternalMapping<'a> {
    entries: Option<&'a Entries>,
}

impl<'a> ExternalMapping<'a> {
    pub(crate) fn new(entries: Option<&'a Entries>) -> Self {
        Self { entries }
    }

    /// Returns the value mapped to `id`, if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, id: EntityId) -> Option<&'a T> {
        self.get_raw(id)?.downcast_ref::<T>()
    }

    /// Returns the untyped value mapped to `id`.
    pub fn get_raw(&self, id: EntityId) -> Option<&'a MappingValue> {
        self.entries?.get(&id)
    }

    /// Returns true if `id` has a value.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.is_some_and(|entries| entries.contains_key(&id))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.map_or(0, PersistentMap::len)
    }

    /// Returns true if the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &'a MappingValue)> + 'a {
        self.entries
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(id, value)| (*id, value)))
    }
}

impl fmt::Debug for ExternalMapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalMapping")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::LineageId;
    use crate::types::EntityTypeId;

    fn ids(n: u32) -> Vec<EntityId> {
        let lineage = LineageId::new();
        (0..n)
            .map(|slot| EntityId::new(lineage, EntityTypeId::new(0), slot))
            .collect()
    }

    #[test]
    fn set_and_get_typed() {
        let ids = ids(1);
        let mut registry = MappingRegistry::new(4);
        registry.set("bridge", ids[0], Arc::new(42u32));

        let view = ExternalMapping::new(registry.get("bridge"));
        assert_eq!(view.get::<u32>(ids[0]), Some(&42));
        assert_eq!(view.get::<String>(ids[0]), None);
        assert!(view.contains(ids[0]));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn unknown_name_is_empty() {
        let registry = MappingRegistry::new(4);
        let view = ExternalMapping::new(registry.get("missing"));
        assert!(view.is_empty());
        assert_eq!(view.iter().count(), 0);
        assert!(view.get_raw(ids(1)[0]).is_none());
    }

    #[test]
    fn remove_entity_touches_every_mapping() {
        let ids = ids(2);
        let mut registry = MappingRegistry::new(4);
        registry.set("a", ids[0], Arc::new(1u8));
        registry.set("b", ids[0], Arc::new(2u8));
        registry.set("b", ids[1], Arc::new(3u8));

        registry.remove_entity(ids[0]);

        assert!(registry.get("a").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(registry.entries_of(ids[0]).count(), 0);
        assert_eq!(registry.entries_of(ids[1]).count(), 1);
        assert_eq!(registry.entry_count(), 1);
    }

    #[test]
    fn clear_and_isolation() {
        let ids = ids(1);
        let mut registry = MappingRegistry::new(4);
        registry.set("a", ids[0], Arc::new("x"));
        let frozen = registry.clone();

        assert!(registry.clear("a"));
        assert!(!registry.clear("a"));
        assert!(registry.get("a").is_none());
        assert!(ExternalMapping::new(frozen.get("a")).contains(ids[0]));
    }

    fn summarize(edits: &[MappingEdit]) -> Vec<(String, u32, bool)> {
        let mut out: Vec<_> = edits
            .iter()
            .map(|edit| match edit {
                MappingEdit::Set { name, id, .. } => (name.to_string(), id.slot(), true),
                MappingEdit::Remove { name, id } => (name.to_string(), id.slot(), false),
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn edits_since_base() {
        let ids = ids(3);
        let mut base = MappingRegistry::new(4);
        base.set("a", ids[0], Arc::new(1u8));
        base.set("a", ids[1], Arc::new(2u8));
        base.set("gone", ids[2], Arc::new(3u8));
        base.set("same", ids[2], Arc::new(4u8));
        assert!(base.clone().edits_since(&base).is_empty());

        let mut current = base.clone();
        current.set("a", ids[0], Arc::new(10u8));
        current.remove("a", ids[1]);
        current.set("a", ids[2], Arc::new(30u8));
        current.clear("gone");
        current.set("new", ids[1], Arc::new(5u8));

        assert_eq!(
            summarize(&current.edits_since(&base)),
            vec![
                ("a".to_owned(), 0, true),
                ("a".to_owned(), 1, false),
                ("a".to_owned(), 2, true),
                ("gone".to_owned(), 2, false),
                ("new".to_owned(), 1, true),
            ]
        );
    }
}
