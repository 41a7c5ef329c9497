//! Entity table grouped by entity type.

use crate::entity::{EntityData, EntityId};
use crate::persistent::ChunkedArena;
use crate::types::EntityTypeId;
use std::sync::Arc;

/// Entity records keyed by [`EntityId`], one arena per entity type.
///
/// The per-type arenas double as the type index: listing all entities of a
/// type walks a single arena and never touches other types.
#[derive(Clone)]
pub(crate) struct EntityTable {
    types: Arc<Vec<ChunkedArena<Arc<EntityData>>>>,
    len: usize,
}

impl EntityTable {
    /// Creates an empty table for `type_count` types.
    pub(crate) fn new(type_count: usize, chunk_bits: u32) -> Self {
        let empty = ChunkedArena::new(chunk_bits);
        Self {
            types: Arc::new(vec![empty; type_count]),
            len: 0,
        }
    }

    /// Returns the record for an ID.
    ///
    /// Callers check the lineage first; the stored ID is compared as well so a
    /// foreign ID with a matching slot never yields a record.
    pub(crate) fn get(&self, id: EntityId) -> Option<&Arc<EntityData>> {
        self.types
            .get(id.entity_type().index())?
            .get(id.slot())
            .filter(|data| data.id() == id)
    }

    /// Returns true if the ID is present.
    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Stores a record under its own ID, returning the record it replaced.
    ///
    /// The type must be known to the table.
    pub(crate) fn insert(&mut self, data: Arc<EntityData>) -> Option<Arc<EntityData>> {
        let id = data.id();
        let arena = Arc::make_mut(&mut self.types).get_mut(id.entity_type().index())?;
        let previous = arena.insert(id.slot(), data);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Removes a record.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Arc<EntityData>> {
        if !self.contains(id) {
            return None;
        }
        let arena = Arc::make_mut(&mut self.types).get_mut(id.entity_type().index())?;
        let previous = arena.remove(id.slot());
        if previous.is_some() {
            self.len -= 1;
        }
        previous
    }

    /// Iterates the records of one type in slot order.
    pub(crate) fn entities(
        &self,
        type_id: EntityTypeId,
    ) -> impl Iterator<Item = &Arc<EntityData>> + '_ {
        self.types
            .get(type_id.index())
            .into_iter()
            .flat_map(|arena| arena.iter().map(|(_, data)| data))
    }

    /// Returns the number of records of one type.
    pub(crate) fn count(&self, type_id: EntityTypeId) -> usize {
        self.types
            .get(type_id.index())
            .map_or(0, ChunkedArena::len)
    }

    /// Returns the total number of records.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns `(shared, total)` chunk counts relative to `other`.
    pub(crate) fn sharing(&self, other: &Self) -> (usize, usize) {
        self.types
            .iter()
            .zip(other.types.iter())
            .fold((0, 0), |(shared, total), (a, b)| {
                (shared + a.shared_chunks(b), total + a.chunk_count())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntitySource, Fields, LineageId};

    fn record(lineage: LineageId, type_id: u32, slot: u32) -> Arc<EntityData> {
        let id = EntityId::new(lineage, EntityTypeId::new(type_id), slot);
        Arc::new(EntityData::new(
            id,
            EntitySource::from("test"),
            Fields::new().with("slot", i64::from(slot)),
        ))
    }

    #[test]
    fn insert_get_remove() {
        let lineage = LineageId::new();
        let mut table = EntityTable::new(2, 4);
        let a = record(lineage, 0, 3);
        let b = record(lineage, 1, 3);

        assert!(table.insert(Arc::clone(&a)).is_none());
        assert!(table.insert(Arc::clone(&b)).is_none());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a.id()), Some(&a));
        assert_eq!(table.get(b.id()), Some(&b));

        assert_eq!(table.remove(a.id()), Some(a.clone()));
        assert!(table.get(a.id()).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn foreign_id_with_same_slot_is_not_found() {
        let mut table = EntityTable::new(1, 4);
        let ours = record(LineageId::new(), 0, 0);
        let theirs = record(LineageId::new(), 0, 0);
        table.insert(ours);

        assert!(table.get(theirs.id()).is_none());
        assert!(table.remove(theirs.id()).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entities_by_type() {
        let lineage = LineageId::new();
        let mut table = EntityTable::new(2, 2);
        for slot in 0..5 {
            table.insert(record(lineage, 0, slot));
        }
        table.insert(record(lineage, 1, 0));

        assert_eq!(table.entities(EntityTypeId::new(0)).count(), 5);
        assert_eq!(table.count(EntityTypeId::new(1)), 1);
        assert_eq!(table.entities(EntityTypeId::new(7)).count(), 0);
    }

    #[test]
    fn unknown_type_is_not_stored() {
        let mut table = EntityTable::new(1, 2);
        assert!(table.insert(record(LineageId::new(), 4, 0)).is_none());
        assert_eq!(table.len(), 0);
    }
}
