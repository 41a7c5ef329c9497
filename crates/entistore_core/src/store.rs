//! The entity table together with its indices.
//!
//! [`EntityStore`] is the read surface shared by [`Snapshot`](crate::Snapshot)
//! and [`Builder`](crate::Builder); both dereference to it. Its mutating
//! methods are crate-private and only reachable through a builder.

use crate::config::Config;
use crate::entity::{EntityData, EntityId, EntitySource, EntityUpdate, Fields, LineageId, SymbolicId};
use crate::error::{StoreError, StoreResult};
use crate::file_url::VirtualFileUrl;
use crate::index::{FileUrlIndex, SourceIndex, SymbolicIndex, VirtualFileUrlIndex};
use crate::lineage::Lineage;
use crate::mapping::{ExternalMapping, MappingRegistry, MappingValue};
use crate::schema::SchemaRegistry;
use crate::table::EntityTable;
use crate::types::EntityTypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Entities grouped by source, then by type.
pub type EntitiesBySource = BTreeMap<EntitySource, BTreeMap<EntityTypeId, Vec<Arc<EntityData>>>>;

/// Index keys the schema derives from an entity's fields.
struct Derived {
    symbolic: Option<SymbolicId>,
    references: Vec<SymbolicId>,
    urls: Vec<(Arc<str>, VirtualFileUrl)>,
}

/// Entity table, indices and external mappings of one store version.
///
/// Cloning is cheap: every component is a persistent structure, and a clone
/// shares all of them until one side writes.
#[derive(Clone)]
pub struct EntityStore {
    lineage: Arc<Lineage>,
    table: EntityTable,
    symbolic: SymbolicIndex,
    sources: SourceIndex,
    urls: FileUrlIndex,
    mappings: MappingRegistry,
}

impl EntityStore {
    /// Creates an empty store in a fresh lineage. `config` is already validated.
    pub(crate) fn new(config: Config, schemas: Arc<SchemaRegistry>) -> Self {
        let table = EntityTable::new(schemas.len(), config.arena_chunk_bits);
        let shards = config.index_shards;
        Self {
            lineage: Arc::new(Lineage::new(config, schemas)),
            table,
            symbolic: SymbolicIndex::new(shards),
            sources: SourceIndex::new(shards),
            urls: FileUrlIndex::new(shards),
            mappings: MappingRegistry::new(shards),
        }
    }

    // ---- read surface ----

    /// Iterates all entities of a type.
    ///
    /// The iterator is lazy and can be recreated any number of times; each
    /// pass over the same store yields the same entities.
    pub fn entities(&self, type_id: EntityTypeId) -> impl Iterator<Item = &Arc<EntityData>> + '_ {
        self.table.entities(type_id)
    }

    /// Iterates entities of `type_id` whose fields reference `target`.
    ///
    /// Served from the reverse reference index; the table is not scanned.
    pub fn referrers<'a>(
        &'a self,
        target: &SymbolicId,
        type_id: EntityTypeId,
    ) -> impl Iterator<Item = &'a Arc<EntityData>> + 'a {
        self.symbolic
            .referrers(target)
            .filter(move |id| id.entity_type() == type_id)
            .filter_map(move |id| self.table.get(id))
    }

    /// Returns the entity claiming a symbolic id.
    pub fn resolve(&self, symbolic_id: &SymbolicId) -> Option<&Arc<EntityData>> {
        self.symbolic
            .resolve(symbolic_id)
            .and_then(|id| self.table.get(id))
    }

    /// Returns true if some entity claims the symbolic id.
    #[must_use]
    pub fn contains(&self, symbolic_id: &SymbolicId) -> bool {
        self.symbolic.contains(symbolic_id)
    }

    /// Returns an entity by ID.
    ///
    /// IDs minted by another lineage are rejected rather than reported absent.
    pub fn entity(&self, id: EntityId) -> StoreResult<Option<&Arc<EntityData>>> {
        self.lineage.check(id)?;
        Ok(self.table.get(id))
    }

    /// Returns true if the entity is present.
    #[must_use]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        id.lineage() == self.lineage.id() && self.table.contains(id)
    }

    /// Returns the symbolic id an entity claims.
    pub fn symbolic_id_of(&self, id: EntityId) -> Option<&SymbolicId> {
        self.symbolic.symbolic_id_of(id)
    }

    /// Returns the symbolic ids an entity references.
    pub fn references_of(&self, id: EntityId) -> &[SymbolicId] {
        self.symbolic.references_of(id)
    }

    /// Returns a view of a named external mapping.
    pub fn external_mapping(&self, name: &str) -> ExternalMapping<'_> {
        ExternalMapping::new(self.mappings.get(name))
    }

    /// Iterates the names of non-empty external mappings.
    pub fn external_mapping_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.mappings.names()
    }

    /// Returns a view of the virtual file url index.
    pub fn virtual_file_url_index(&self) -> VirtualFileUrlIndex<'_> {
        VirtualFileUrlIndex::new(&self.urls)
    }

    /// Groups the entities whose source matches `predicate` by source and type.
    ///
    /// Each entity appears exactly once; groups are ordered by entity ID.
    pub fn entities_by_source(&self, predicate: impl Fn(&EntitySource) -> bool) -> EntitiesBySource {
        let mut grouped = EntitiesBySource::new();
        for (source, ids) in self.sources.iter() {
            if !predicate(source) {
                continue;
            }
            let by_type = grouped.entry(source.clone()).or_default();
            for id in ids {
                if let Some(data) = self.table.get(id) {
                    by_type
                        .entry(id.entity_type())
                        .or_default()
                        .push(Arc::clone(data));
                }
            }
        }
        for entities in grouped.values_mut().flat_map(BTreeMap::values_mut) {
            entities.sort_by_key(|data| data.id());
        }
        grouped
    }

    /// Returns the IDs of entities whose source matches `predicate`.
    pub(crate) fn ids_by_source(&self, predicate: impl Fn(&EntitySource) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .sources
            .iter()
            .filter(|(source, _)| predicate(source))
            .flat_map(|(_, ids)| ids)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the total number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.table.len()
    }

    /// Returns the number of entities of one type.
    #[must_use]
    pub fn entity_count_of(&self, type_id: EntityTypeId) -> usize {
        self.table.count(type_id)
    }

    /// Returns the number of entities with the given source.
    #[must_use]
    pub fn source_count(&self, source: &EntitySource) -> usize {
        self.sources.count(source)
    }

    /// Returns true if the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Returns the lineage this store belongs to.
    #[must_use]
    pub fn lineage(&self) -> LineageId {
        self.lineage.id()
    }

    /// Returns the schema registry.
    #[must_use]
    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        self.lineage.schemas()
    }

    /// Returns the lineage configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        self.lineage.config()
    }

    // ---- crate internals ----

    pub(crate) fn table(&self) -> &EntityTable {
        &self.table
    }

    pub(crate) fn symbolic_index(&self) -> &SymbolicIndex {
        &self.symbolic
    }

    pub(crate) fn source_index(&self) -> &SourceIndex {
        &self.sources
    }

    pub(crate) fn url_index(&self) -> &FileUrlIndex {
        &self.urls
    }

    pub(crate) fn mappings(&self) -> &MappingRegistry {
        &self.mappings
    }

    fn derive(&self, type_id: EntityTypeId, fields: &Fields) -> StoreResult<Derived> {
        let schema = self.lineage.schemas().schema(type_id)?;
        Ok(Derived {
            symbolic: schema.symbolic_id(fields),
            references: schema.references(fields),
            urls: schema.file_urls(fields),
        })
    }

    fn get_checked(&self, id: EntityId) -> StoreResult<&Arc<EntityData>> {
        self.entity(id)?
            .ok_or_else(|| StoreError::entity_not_found(id))
    }

    fn attach(&mut self, data: &Arc<EntityData>, derived: Derived) {
        let id = data.id();
        self.table.insert(Arc::clone(data));
        if let Some(symbolic_id) = derived.symbolic {
            self.symbolic.claim(id, symbolic_id);
        }
        self.symbolic.add_references(id, derived.references);
        self.sources.insert(data.source(), id);
        self.urls.insert(id, derived.urls);
    }

    fn detach(&mut self, data: &EntityData) {
        let id = data.id();
        self.symbolic.release(id);
        self.symbolic.remove_references(id);
        self.sources.remove(data.source(), id);
        self.urls.remove(id);
    }

    /// Adds a new entity with a freshly minted ID.
    pub(crate) fn insert_new(
        &mut self,
        type_id: EntityTypeId,
        source: EntitySource,
        fields: Fields,
    ) -> StoreResult<Arc<EntityData>> {
        let derived = self.derive(type_id, &fields)?;
        if let Some(symbolic_id) = &derived.symbolic {
            self.symbolic.check_claim(symbolic_id, None)?;
        }
        let id = self.lineage.allocate(type_id)?;
        let data = Arc::new(EntityData::new(id, source, fields));
        self.attach(&data, derived);
        Ok(data)
    }

    /// Adds an entity that keeps the ID it was minted with.
    pub(crate) fn insert_existing(&mut self, data: &Arc<EntityData>) -> StoreResult<()> {
        let id = data.id();
        if self.entity(id)?.is_some() {
            return Err(StoreError::EntityExists { entity_id: id });
        }
        let derived = self.derive(id.entity_type(), data.fields())?;
        if let Some(symbolic_id) = &derived.symbolic {
            self.symbolic.check_claim(symbolic_id, None)?;
        }
        self.attach(data, derived);
        Ok(())
    }

    /// Replaces the content of an entity, returning the old and new records.
    pub(crate) fn replace(
        &mut self,
        id: EntityId,
        update: EntityUpdate,
    ) -> StoreResult<(Arc<EntityData>, Arc<EntityData>)> {
        let old = Arc::clone(self.get_checked(id)?);
        let derived = self.derive(id.entity_type(), &update.fields)?;
        if let Some(symbolic_id) = &derived.symbolic {
            self.symbolic.check_claim(symbolic_id, Some(id))?;
        }
        let new = Arc::new(EntityData::new(id, update.source, update.fields));
        self.detach(&old);
        self.attach(&new, derived);
        Ok((old, new))
    }

    /// Removes an entity together with its index and mapping entries.
    pub(crate) fn delete(&mut self, id: EntityId) -> StoreResult<Arc<EntityData>> {
        let old = Arc::clone(self.get_checked(id)?);
        self.detach(&old);
        self.table.remove(id);
        self.mappings.remove_entity(id);
        Ok(old)
    }

    pub(crate) fn set_mapping(
        &mut self,
        name: &str,
        id: EntityId,
        value: MappingValue,
    ) -> StoreResult<Option<MappingValue>> {
        self.get_checked(id)?;
        Ok(self.mappings.set(name, id, value))
    }

    pub(crate) fn remove_mapping(&mut self, name: &str, id: EntityId) -> StoreResult<Option<MappingValue>> {
        self.lineage.check(id)?;
        Ok(self.mappings.remove(name, id))
    }

    pub(crate) fn clear_mapping(&mut self, name: &str) -> bool {
        self.mappings.clear(name)
    }

    /// Copies every mapping entry `other` holds for `from` onto `to`.
    pub(crate) fn copy_mappings(&mut self, other: &EntityStore, from: EntityId, to: EntityId) {
        for (name, value) in other.mappings.entries_of(from) {
            self.mappings.set(name, to, Arc::clone(value));
        }
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("lineage", &self.lineage.id())
            .field("entities", &self.table.len())
            .field("symbolic_ids", &self.symbolic.len())
            .finish_non_exhaustive()
    }
}
