//! Mutable working copies that commit into snapshots.

use crate::changes::{ChangeLog, EntityChange};
use crate::config::Config;
use crate::entity::{EntityData, EntityId, EntitySource, EntityUpdate, Fields, SymbolicId};
use crate::error::{StoreError, StoreResult};
use crate::mapping::MappingEdit;
use crate::schema::SchemaRegistry;
use crate::snapshot::Snapshot;
use crate::store::EntityStore;
use crate::types::{EntityTypeId, StoreVersion};
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of [`Builder::replace_by_source`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Matching entities with no counterpart in the replacement.
    pub removed: usize,
    /// Replacement entities with no counterpart in the builder.
    pub added: usize,
    /// Kept entities whose content changed.
    pub modified: usize,
    /// Kept entities whose content was already equal.
    pub unchanged: usize,
}

impl ReplaceSummary {
    /// Returns true if the builder was changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.removed + self.added + self.modified > 0
    }
}

/// Outcome of [`Builder::apply_changes_from`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Entities added with their original IDs.
    pub added: usize,
    /// Entities removed.
    pub removed: usize,
    /// Entities replaced by the other builder's version.
    pub modified: usize,
    /// Removals and replacements of entities this builder no longer holds.
    pub skipped: usize,
    /// External mapping entries set or removed.
    pub mappings: usize,
}

/// Store plus change log. Cloning is cheap, which makes bulk operations
/// atomic: they run on a clone that replaces the original only on success.
#[derive(Clone)]
struct Working {
    store: EntityStore,
    changes: Option<ChangeLog>,
}

impl Working {
    fn add(
        &mut self,
        type_id: EntityTypeId,
        source: EntitySource,
        fields: Fields,
    ) -> StoreResult<Arc<EntityData>> {
        let data = self.store.insert_new(type_id, source, fields)?;
        if let Some(changes) = &mut self.changes {
            changes.added(&data);
        }
        Ok(data)
    }

    fn add_existing(&mut self, data: &Arc<EntityData>) -> StoreResult<()> {
        self.store.insert_existing(data)?;
        if let Some(changes) = &mut self.changes {
            changes.added(data);
        }
        Ok(())
    }

    fn remove(&mut self, id: EntityId) -> StoreResult<Arc<EntityData>> {
        let old = self.store.delete(id)?;
        if let Some(changes) = &mut self.changes {
            changes.removed(&old);
        }
        Ok(old)
    }

    fn modify(&mut self, id: EntityId, update: EntityUpdate) -> StoreResult<Arc<EntityData>> {
        let (old, new) = self.store.replace(id, update)?;
        if let Some(changes) = &mut self.changes {
            changes.replaced(&old, &new);
        }
        Ok(new)
    }

    fn reset_changes(&mut self) {
        if let Some(changes) = &mut self.changes {
            *changes = ChangeLog::new(self.store.config().index_shards);
        }
    }
}

/// A single-owner, mutable working copy of the store.
///
/// A builder starts from a snapshot (or empty) and shares every untouched
/// part of it. Each operation keeps all indices consistent and leaves the
/// builder unchanged when it fails. [`to_snapshot`](Self::to_snapshot)
/// publishes the current state; the builder stays usable afterwards and
/// continues from the snapshot it produced.
///
/// # Example
///
/// ```rust
/// use entistore_core::{Builder, DeclaredSchema, EntitySource, Fields, SchemaRegistry, SymbolicId};
/// use std::sync::Arc;
///
/// let mut schemas = SchemaRegistry::new();
/// let module = schemas
///     .register("module", DeclaredSchema::new().symbolic_id("module", "name"))
///     .unwrap();
///
/// let mut builder = Builder::new(Arc::new(schemas));
/// builder
///     .add_entity(module, EntitySource::from("gradle"), Fields::new().with("name", "core"))
///     .unwrap();
/// let snapshot = builder.to_snapshot();
///
/// assert!(snapshot.resolve(&SymbolicId::new("module", "core")).is_some());
/// ```
pub struct Builder {
    working: Working,
    base: Snapshot,
    dirty: bool,
}

impl Builder {
    /// Creates an empty builder in a new lineage with the default config.
    #[must_use]
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        Self::empty(Config::default(), schemas)
    }

    /// Creates an empty builder in a new lineage.
    pub fn with_config(config: Config, schemas: Arc<SchemaRegistry>) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::empty(config, schemas))
    }

    fn empty(config: Config, schemas: Arc<SchemaRegistry>) -> Self {
        let store = EntityStore::new(config, schemas);
        debug!(
            lineage = %store.lineage(),
            types = store.schemas().len(),
            "created lineage"
        );
        Self::from_snapshot(Snapshot::new(store, StoreVersion::INITIAL))
    }

    pub(crate) fn from_snapshot(base: Snapshot) -> Self {
        let store = base.store().clone();
        let changes = store
            .config()
            .track_changes
            .then(|| ChangeLog::new(store.config().index_shards));
        Self {
            working: Working { store, changes },
            base,
            dirty: false,
        }
    }

    /// Returns the snapshot this builder currently continues from.
    #[must_use]
    pub fn base_snapshot(&self) -> &Snapshot {
        &self.base
    }

    /// Returns the version of the base snapshot.
    #[must_use]
    pub fn base_version(&self) -> StoreVersion {
        self.base.version()
    }

    /// Adds an entity and returns its new ID.
    pub fn add_entity(
        &mut self,
        type_id: EntityTypeId,
        source: impl Into<EntitySource>,
        fields: Fields,
    ) -> StoreResult<EntityId> {
        let data = self.working.add(type_id, source.into(), fields)?;
        trace!(entity = %data.id(), source = %data.source(), "added entity");
        self.dirty = true;
        Ok(data.id())
    }

    /// Removes an entity and its external mapping entries.
    pub fn remove_entity(&mut self, id: EntityId) -> StoreResult<Arc<EntityData>> {
        let old = self.working.remove(id)?;
        trace!(entity = %id, "removed entity");
        self.dirty = true;
        Ok(old)
    }

    /// Edits an entity in place and returns its new version.
    ///
    /// The ID is unchanged. The symbolic id follows the edited fields; if it
    /// collides with another entity's the call fails and nothing changes. An
    /// edit that leaves the content equal is not recorded.
    pub fn modify_entity(
        &mut self,
        id: EntityId,
        edit: impl FnOnce(&mut EntityUpdate),
    ) -> StoreResult<Arc<EntityData>> {
        let current = self
            .working
            .store
            .entity(id)?
            .ok_or_else(|| StoreError::entity_not_found(id))?;
        let mut update = EntityUpdate::from_data(current);
        edit(&mut update);
        if update.source == *current.source() && update.fields == *current.fields() {
            return Ok(Arc::clone(current));
        }
        let new = self.working.modify(id, update)?;
        trace!(entity = %id, "modified entity");
        self.dirty = true;
        Ok(new)
    }

    /// Associates a value with an entity in the named external mapping.
    pub fn set_mapping<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        id: EntityId,
        value: T,
    ) -> StoreResult<()> {
        self.working.store.set_mapping(name, id, Arc::new(value))?;
        self.dirty = true;
        Ok(())
    }

    /// Removes an entity's entry from the named mapping.
    ///
    /// Returns true if an entry was removed.
    pub fn remove_mapping(&mut self, name: &str, id: EntityId) -> StoreResult<bool> {
        let removed = self.working.store.remove_mapping(name, id)?.is_some();
        self.dirty |= removed;
        Ok(removed)
    }

    /// Drops every entry of the named mapping.
    pub fn clear_external_mapping(&mut self, name: &str) -> bool {
        let cleared = self.working.store.clear_mapping(name);
        self.dirty |= cleared;
        cleared
    }

    /// Publishes the current state as a snapshot.
    ///
    /// Untouched parts of the table and indices are shared with the previous
    /// snapshot. Without edits since the last call, the same snapshot
    /// instance is returned again.
    pub fn to_snapshot(&mut self) -> Snapshot {
        if !self.dirty {
            return self.base.clone();
        }
        let version = self.base.version().next();
        let changes = self.working.changes.as_ref().map_or(0, ChangeLog::len);
        let snapshot = Snapshot::new(self.working.store.clone(), version);
        debug!(
            lineage = %snapshot.lineage(),
            %version,
            entities = snapshot.entity_count(),
            changes,
            "published snapshot"
        );
        self.working.reset_changes();
        self.base = snapshot.clone();
        self.dirty = false;
        snapshot
    }

    /// Returns true if entities differ from the base snapshot.
    ///
    /// Without change tracking this is true after any edit. External mapping
    /// edits are not entity changes: `to_snapshot` publishes them even when
    /// this returns false.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.working.changes {
            Some(changes) => !changes.is_empty(),
            None => self.dirty,
        }
    }

    /// Returns the net entity changes since the base snapshot, per type and
    /// ordered by ID.
    pub fn collect_changes(&self) -> StoreResult<BTreeMap<EntityTypeId, Vec<EntityChange>>> {
        self.working
            .changes
            .as_ref()
            .map(ChangeLog::collect)
            .ok_or(StoreError::ChangeTrackingDisabled)
    }

    /// Replaces every entity whose source matches `predicate` with the
    /// matching entities of `replacement`.
    ///
    /// A matching entity keeps its ID and mapping entries when the
    /// replacement holds an entity of the same type with the same symbolic
    /// id; it is modified only if the content differs. Other matching
    /// entities are removed, and the remaining replacement entities are
    /// added with fresh IDs, taking their mapping entries along.
    ///
    /// Both stores must share one schema registry. On error nothing changes.
    pub fn replace_by_source(
        &mut self,
        predicate: impl Fn(&EntitySource) -> bool,
        replacement: &EntityStore,
    ) -> StoreResult<ReplaceSummary> {
        if !Arc::ptr_eq(self.schemas(), replacement.schemas()) {
            return Err(StoreError::SchemaMismatch);
        }
        let mut working = self.working.clone();
        let mut summary = ReplaceSummary::default();

        let old_ids = working.store.ids_by_source(&predicate);
        let mut claimable: HashMap<(EntityTypeId, SymbolicId), EntityId> = old_ids
            .iter()
            .filter_map(|&id| {
                let symbolic_id = working.store.symbolic_id_of(id)?;
                Some(((id.entity_type(), symbolic_id.clone()), id))
            })
            .collect();

        let mut kept = Vec::new();
        let mut fresh = Vec::new();
        for id in replacement.ids_by_source(&predicate) {
            let Some(data) = replacement.table().get(id) else {
                continue;
            };
            let matched = replacement
                .symbolic_id_of(id)
                .and_then(|symbolic_id| claimable.remove(&(id.entity_type(), symbolic_id.clone())));
            match matched {
                Some(old_id) => kept.push((old_id, Arc::clone(data))),
                None => fresh.push(Arc::clone(data)),
            }
        }

        let kept_ids: HashSet<EntityId> = kept.iter().map(|(id, _)| *id).collect();
        for id in old_ids.into_iter().filter(|id| !kept_ids.contains(id)) {
            working.remove(id)?;
            summary.removed += 1;
        }
        for (id, data) in kept {
            let unchanged = working
                .store
                .entity(id)?
                .is_some_and(|current| current.same_content(&data));
            if unchanged {
                summary.unchanged += 1;
                continue;
            }
            working.modify(id, EntityUpdate::from_data(&data))?;
            summary.modified += 1;
        }
        for data in fresh {
            let added = working.add(
                data.entity_type(),
                data.source().clone(),
                data.fields().clone(),
            )?;
            working.store.copy_mappings(replacement, data.id(), added.id());
            summary.added += 1;
        }

        debug!(
            removed = summary.removed,
            added = summary.added,
            modified = summary.modified,
            unchanged = summary.unchanged,
            "replaced entities by source"
        );
        self.working = working;
        self.dirty |= summary.changed();
        Ok(summary)
    }

    /// Replays the changes of a sibling builder onto this one.
    ///
    /// `other` must belong to the same lineage and track changes. Removals
    /// are applied first, then replacements, then additions, then external
    /// mapping edits. Added entities keep their IDs. Removals and
    /// replacements of entities this builder does not hold are skipped;
    /// replacements of entities it does hold overwrite its own version.
    /// Mapping entries are replayed per entry: values `other` set replace
    /// this builder's, entries it removed are removed here, and entries of
    /// entities this builder does not hold are dropped. On error nothing
    /// changes.
    pub fn apply_changes_from(&mut self, other: &Builder) -> StoreResult<ApplySummary> {
        if other.lineage() != self.lineage() {
            return Err(StoreError::LineageMismatch {
                expected: self.lineage(),
                actual: other.lineage(),
            });
        }
        let log = other
            .working
            .changes
            .as_ref()
            .ok_or(StoreError::ChangeTrackingDisabled)?;

        let mut removals = Vec::new();
        let mut replacements = Vec::new();
        let mut additions = Vec::new();
        for change in log.collect().into_values().flatten() {
            match change {
                EntityChange::Removed(old) => removals.push(old),
                EntityChange::Replaced { new, .. } => replacements.push(new),
                EntityChange::Added(new) => additions.push(new),
            }
        }

        let mut working = self.working.clone();
        let mut summary = ApplySummary::default();
        for old in removals {
            if working.store.contains_entity(old.id()) {
                working.remove(old.id())?;
                summary.removed += 1;
            } else {
                summary.skipped += 1;
            }
        }
        for new in replacements {
            if working.store.contains_entity(new.id()) {
                working.modify(new.id(), EntityUpdate::from_data(&new))?;
                summary.modified += 1;
            } else {
                summary.skipped += 1;
            }
        }
        for new in additions {
            working.add_existing(&new)?;
            summary.added += 1;
        }
        for edit in other.working.store.mappings().edits_since(other.base.mappings()) {
            match edit {
                MappingEdit::Set { name, id, value } => {
                    if working.store.contains_entity(id) {
                        working.store.set_mapping(&name, id, value)?;
                        summary.mappings += 1;
                    }
                }
                MappingEdit::Remove { name, id } => {
                    if working.store.remove_mapping(&name, id)?.is_some() {
                        summary.mappings += 1;
                    }
                }
            }
        }

        debug!(
            added = summary.added,
            removed = summary.removed,
            modified = summary.modified,
            skipped = summary.skipped,
            mappings = summary.mappings,
            "applied changes from sibling builder"
        );
        self.working = working;
        self.dirty |= summary.added + summary.removed + summary.modified + summary.mappings > 0;
        Ok(summary)
    }
}

impl Deref for Builder {
    type Target = EntityStore;

    fn deref(&self) -> &EntityStore {
        &self.working.store
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("base_version", &self.base.version())
            .field("dirty", &self.dirty)
            .field("store", &self.working.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeclaredSchema;

    struct Types {
        module: EntityTypeId,
        library: EntityTypeId,
    }

    fn setup(config: Config) -> (Builder, Types) {
        let mut schemas = SchemaRegistry::new();
        let module = schemas
            .register(
                "module",
                DeclaredSchema::new()
                    .symbolic_id("module", "name")
                    .references("dependencies"),
            )
            .unwrap();
        let library = schemas
            .register("library", DeclaredSchema::new().symbolic_id("library", "name"))
            .unwrap();
        let builder = Builder::with_config(config, Arc::new(schemas)).unwrap();
        (builder, Types { module, library })
    }

    fn named(name: &str) -> Fields {
        Fields::new().with("name", name)
    }

    fn module(name: &str) -> SymbolicId {
        SymbolicId::new("module", name)
    }

    #[test]
    fn add_commit_resolve() {
        let (mut builder, types) = setup(Config::default());
        let id = builder.add_entity(types.module, "s", named("A")).unwrap();
        let snapshot = builder.to_snapshot();

        assert_eq!(snapshot.resolve(&module("A")).map(|d| d.id()), Some(id));
        assert_eq!(snapshot.version(), StoreVersion::new(1));

        let again = builder.to_snapshot();
        assert!(again.ptr_eq(&snapshot));
    }

    #[test]
    fn empty_builder_publishes_initial_version() {
        let (mut builder, _) = setup(Config::default());
        let snapshot = builder.to_snapshot();
        assert_eq!(snapshot.version(), StoreVersion::INITIAL);
        assert!(snapshot.is_empty());
        assert!(!builder.has_changes());
    }

    #[test]
    fn builder_continues_after_commit() {
        let (mut builder, types) = setup(Config::default());
        builder.add_entity(types.module, "s", named("A")).unwrap();
        let first = builder.to_snapshot();
        builder.add_entity(types.module, "s", named("B")).unwrap();
        let second = builder.to_snapshot();

        assert_eq!(first.entity_count(), 1);
        assert_eq!(second.entity_count(), 2);
        assert_eq!(second.version(), first.version().next());
        assert_eq!(builder.base_version(), second.version());
    }

    #[test]
    fn duplicate_add_leaves_builder_unchanged() {
        let (mut builder, types) = setup(Config::default());
        builder.add_entity(types.module, "s", named("A")).unwrap();
        let before = builder.collect_changes().unwrap();

        let err = builder.add_entity(types.module, "t", named("A")).unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(builder.entity_count(), 1);
        assert_eq!(builder.collect_changes().unwrap(), before);
    }

    #[test]
    fn same_name_in_different_kinds_is_allowed() {
        let (mut builder, types) = setup(Config::default());
        builder.add_entity(types.module, "s", named("core")).unwrap();
        builder.add_entity(types.library, "s", named("core")).unwrap();
        assert_eq!(builder.entity_count(), 2);
    }

    #[test]
    fn modify_renames_symbolic_id() {
        let (mut builder, types) = setup(Config::default());
        let id = builder.add_entity(types.module, "s", named("A")).unwrap();
        builder.to_snapshot();

        let new = builder
            .modify_entity(id, |update| {
                update.set("name", "B");
            })
            .unwrap();

        assert_eq!(new.id(), id);
        assert!(builder.resolve(&module("A")).is_none());
        assert_eq!(builder.resolve(&module("B")), Some(&new));
        let changes = builder.collect_changes().unwrap();
        assert!(matches!(
            changes[&types.module][0],
            EntityChange::Replaced { .. }
        ));
    }

    #[test]
    fn noop_modify_is_not_recorded() {
        let (mut builder, types) = setup(Config::default());
        let id = builder.add_entity(types.module, "s", named("A")).unwrap();
        let snapshot = builder.to_snapshot();

        builder
            .modify_entity(id, |update| {
                update.set("name", "A");
            })
            .unwrap();

        assert!(!builder.has_changes());
        assert!(builder.to_snapshot().ptr_eq(&snapshot));
    }

    #[test]
    fn modify_missing_entity_fails() {
        let (mut builder, types) = setup(Config::default());
        let id = builder.add_entity(types.module, "s", named("A")).unwrap();
        builder.remove_entity(id).unwrap();
        assert!(matches!(
            builder.modify_entity(id, |_| {}),
            Err(StoreError::EntityNotFound { .. })
        ));
        // Added then removed before any commit: nothing to report.
        assert!(!builder.has_changes());
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let (mut builder, types) = setup(Config::default());
        let a = builder.add_entity(types.module, "s", named("A")).unwrap();
        builder.remove_entity(a).unwrap();
        let b = builder.add_entity(types.module, "s", named("A")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn mapping_removed_with_entity() {
        let (mut builder, types) = setup(Config::default());
        let id = builder.add_entity(types.module, "s", named("A")).unwrap();
        builder.set_mapping("bridge", id, String::from("ModuleBridge")).unwrap();
        let with_mapping = builder.to_snapshot();

        builder.remove_entity(id).unwrap();
        let without = builder.to_snapshot();

        assert_eq!(
            with_mapping
                .external_mapping("bridge")
                .get::<String>(id)
                .map(String::as_str),
            Some("ModuleBridge")
        );
        assert!(without.external_mapping("bridge").is_empty());
    }

    #[test]
    fn mapping_edits_publish_new_snapshot() {
        let (mut builder, types) = setup(Config::default());
        let id = builder.add_entity(types.module, "s", named("A")).unwrap();
        let first = builder.to_snapshot();

        builder.set_mapping("bridge", id, 7u32).unwrap();
        let second = builder.to_snapshot();
        assert!(!second.ptr_eq(&first));

        assert!(builder.clear_external_mapping("bridge"));
        assert!(!builder.clear_external_mapping("bridge"));
        assert!(!builder.remove_mapping("bridge", id).unwrap());
        let third = builder.to_snapshot();
        assert!(third.external_mapping("bridge").is_empty());
        assert_eq!(second.external_mapping("bridge").get::<u32>(id), Some(&7));
    }

    #[test]
    fn change_log_resets_on_commit() {
        let (mut builder, types) = setup(Config::default());
        builder.add_entity(types.module, "s", named("A")).unwrap();
        assert!(builder.has_changes());
        builder.to_snapshot();
        assert!(!builder.has_changes());
        assert!(builder.collect_changes().unwrap().is_empty());
    }

    #[test]
    fn change_tracking_can_be_disabled() {
        let (mut builder, types) = setup(Config::new().track_changes(false));
        builder.add_entity(types.module, "s", named("A")).unwrap();
        assert!(builder.has_changes());
        assert_eq!(
            builder.collect_changes(),
            Err(StoreError::ChangeTrackingDisabled)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Builder::with_config(
            Config::new().index_shards(3),
            Arc::new(SchemaRegistry::new()),
        );
        assert!(matches!(result, Err(StoreError::InvalidConfig { .. })));
    }

    #[test]
    fn replace_by_source_keeps_matching_ids() {
        let (mut builder, types) = setup(Config::default());
        let a = builder.add_entity(types.module, "gradle", named("A")).unwrap();
        let b = builder.add_entity(types.module, "gradle", named("B")).unwrap();
        let other = builder.add_entity(types.module, "maven", named("M")).unwrap();
        builder.set_mapping("bridge", a, 1u8).unwrap();
        let before = builder.to_snapshot();

        let mut replacement = Builder::new(Arc::clone(builder.schemas()));
        let new_a = replacement
            .add_entity(
                types.module,
                "gradle",
                named("A").with("dependencies", vec![module("C")]),
            )
            .unwrap();
        let c = replacement.add_entity(types.module, "gradle", named("C")).unwrap();
        replacement.set_mapping("bridge", c, 3u8).unwrap();
        replacement.set_mapping("bridge", new_a, 9u8).unwrap();

        let summary = builder
            .replace_by_source(|s| s.as_str() == "gradle", &replacement)
            .unwrap();

        assert_eq!(
            summary,
            ReplaceSummary {
                removed: 1,
                added: 1,
                modified: 1,
                unchanged: 0
            }
        );
        assert_eq!(builder.resolve(&module("A")).map(|d| d.id()), Some(a));
        assert_eq!(builder.references_of(a), &[module("C")]);
        assert!(!builder.contains_entity(b));
        assert!(builder.contains_entity(other));
        let c_here = builder.resolve(&module("C")).map(|d| d.id()).unwrap();
        assert_eq!(c_here.lineage(), builder.lineage());
        let bridge = builder.external_mapping("bridge");
        assert_eq!(bridge.get::<u8>(a), Some(&1));
        assert_eq!(bridge.get::<u8>(c_here), Some(&3));
        // The base snapshot is untouched.
        assert!(before.contains(&module("B")));
    }

    #[test]
    fn replace_by_source_with_equal_content_is_a_noop() {
        let (mut builder, types) = setup(Config::default());
        builder.add_entity(types.module, "gradle", named("A")).unwrap();
        let snapshot = builder.to_snapshot();
        let replacement = snapshot.to_builder();

        let summary = builder
            .replace_by_source(|_| true, &replacement)
            .unwrap();

        assert_eq!(summary.unchanged, 1);
        assert!(!summary.changed());
        assert!(builder.to_snapshot().ptr_eq(&snapshot));
    }

    #[test]
    fn failed_replace_by_source_is_atomic() {
        let (mut builder, types) = setup(Config::default());
        builder.add_entity(types.module, "gradle", named("A")).unwrap();
        builder.add_entity(types.module, "maven", named("M")).unwrap();
        let before = builder.collect_changes().unwrap();

        let mut replacement = Builder::new(Arc::clone(builder.schemas()));
        replacement.add_entity(types.module, "gradle", named("M")).unwrap();

        let err = builder
            .replace_by_source(|s| s.as_str() == "gradle", &replacement)
            .unwrap_err();

        assert!(err.is_duplicate());
        assert!(builder.contains(&module("A")));
        assert_eq!(builder.collect_changes().unwrap(), before);
    }

    #[test]
    fn replace_by_source_requires_same_registry() {
        let (mut builder, _) = setup(Config::default());
        let (other, _) = setup(Config::default());
        assert_eq!(
            builder.replace_by_source(|_| true, &other),
            Err(StoreError::SchemaMismatch)
        );
    }

    #[test]
    fn apply_changes_from_sibling() {
        let (mut builder, types) = setup(Config::default());
        let a = builder.add_entity(types.module, "s", named("A")).unwrap();
        let b = builder.add_entity(types.module, "s", named("B")).unwrap();
        let base = builder.to_snapshot();

        let mut sibling = base.to_builder();
        sibling.remove_entity(a).unwrap();
        sibling
            .modify_entity(b, |update| {
                update.set("dependencies", vec![module("C")]);
            })
            .unwrap();
        let c = sibling.add_entity(types.module, "s", named("C")).unwrap();
        sibling.set_mapping("bridge", c, "c").unwrap();

        let mine = builder.add_entity(types.library, "s", named("L")).unwrap();
        assert_ne!(mine, c);

        let summary = builder.apply_changes_from(&sibling).unwrap();

        assert_eq!(
            summary,
            ApplySummary {
                added: 1,
                removed: 1,
                modified: 1,
                skipped: 0,
                mappings: 1,
            }
        );
        assert!(!builder.contains_entity(a));
        assert_eq!(builder.references_of(b), &[module("C")]);
        assert_eq!(builder.resolve(&module("C")).map(|d| d.id()), Some(c));
        assert_eq!(builder.external_mapping("bridge").get::<&str>(c), Some(&"c"));
        assert!(builder.contains_entity(mine));
    }

    #[test]
    fn apply_changes_carries_mapping_edits() {
        let (mut builder, types) = setup(Config::default());
        let a = builder.add_entity(types.module, "s", named("A")).unwrap();
        let b = builder.add_entity(types.module, "s", named("B")).unwrap();
        builder.set_mapping("bridge", b, 1u32).unwrap();
        builder.set_mapping("ui", a, "open").unwrap();
        builder.set_mapping("ui", b, "closed").unwrap();
        let base = builder.to_snapshot();

        let mut sibling = base.to_builder();
        sibling.set_mapping("bridge", a, 42u32).unwrap();
        assert!(sibling.remove_mapping("bridge", b).unwrap());
        assert!(sibling.clear_external_mapping("ui"));
        assert!(!sibling.has_changes());

        // Entries this builder added on its own survive the clear.
        let mine = builder.add_entity(types.module, "s", named("M")).unwrap();
        builder.set_mapping("ui", mine, "mine").unwrap();

        let summary = builder.apply_changes_from(&sibling).unwrap();
        assert_eq!(summary.mappings, 4);
        assert_eq!(summary.added + summary.removed + summary.modified, 0);

        let bridge = builder.external_mapping("bridge");
        assert_eq!(bridge.get::<u32>(a), Some(&42));
        assert_eq!(bridge.get::<u32>(b), None);
        let ui = builder.external_mapping("ui");
        assert_eq!(ui.len(), 1);
        assert_eq!(ui.get::<&str>(mine), Some(&"mine"));

        let published = builder.to_snapshot();
        assert_eq!(published.external_mapping("bridge").get::<u32>(a), Some(&42));
    }

    #[test]
    fn apply_changes_drops_mappings_of_missing_entities() {
        let (mut builder, types) = setup(Config::default());
        let a = builder.add_entity(types.module, "s", named("A")).unwrap();
        let base = builder.to_snapshot();

        let mut sibling = base.to_builder();
        sibling.set_mapping("bridge", a, 7u8).unwrap();
        builder.remove_entity(a).unwrap();

        let summary = builder.apply_changes_from(&sibling).unwrap();
        assert_eq!(summary.mappings, 0);
        assert!(builder.external_mapping("bridge").is_empty());
    }

    #[test]
    fn apply_changes_twice_fails_atomically() {
        let (mut builder, types) = setup(Config::default());
        let base = builder.to_snapshot();
        let mut sibling = base.to_builder();
        sibling.add_entity(types.module, "s", named("A")).unwrap();

        builder.apply_changes_from(&sibling).unwrap();
        let before = builder.entity_count();
        assert!(matches!(
            builder.apply_changes_from(&sibling),
            Err(StoreError::EntityExists { .. })
        ));
        assert_eq!(builder.entity_count(), before);
    }

    #[test]
    fn apply_changes_requires_same_lineage() {
        let (mut builder, _) = setup(Config::default());
        let (other, _) = setup(Config::default());
        assert!(matches!(
            builder.apply_changes_from(&other),
            Err(StoreError::LineageMismatch { .. })
        ));
    }

    #[test]
    fn apply_changes_skips_missing_entities() {
        let (mut builder, types) = setup(Config::default());
        let a = builder.add_entity(types.module, "s", named("A")).unwrap();
        let base = builder.to_snapshot();

        let mut sibling = base.to_builder();
        sibling.remove_entity(a).unwrap();
        builder.remove_entity(a).unwrap();

        let summary = builder.apply_changes_from(&sibling).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn sibling_builders_allocate_disjoint_ids() {
        let (mut builder, types) = setup(Config::default());
        let base = builder.to_snapshot();
        let mut left = base.to_builder();
        let mut right = base.to_builder();

        let l = left.add_entity(types.module, "s", named("L")).unwrap();
        let r = right.add_entity(types.module, "s", named("R")).unwrap();
        assert_ne!(l, r);
    }

    #[test]
    fn builder_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Builder>();
    }
}
