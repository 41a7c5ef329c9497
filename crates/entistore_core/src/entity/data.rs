//! Entity records.

use crate::entity::{EntityId, EntitySource, Fields, Value};
use crate::types::EntityTypeId;

/// An entity stored in a snapshot or builder.
///
/// Records are immutable once stored. A modification produces a new record
/// with the same [`EntityId`]; readers holding the old `Arc` keep seeing the
/// old data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityData {
    id: EntityId,
    source: EntitySource,
    fields: Fields,
}

impl EntityData {
    pub(crate) fn new(id: EntityId, source: EntitySource, fields: Fields) -> Self {
        Self { id, source, fields }
    }

    /// Returns the entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity type.
    #[must_use]
    pub fn entity_type(&self) -> EntityTypeId {
        self.id.entity_type()
    }

    /// Returns the provenance of this entity.
    #[must_use]
    pub fn source(&self) -> &EntitySource {
        &self.source
    }

    /// Returns the fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Looks up a single field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Compares type, source and fields, ignoring the ID.
    #[must_use]
    pub fn same_content(&self, other: &EntityData) -> bool {
        self.entity_type() == other.entity_type()
            && self.source == other.source
            && self.fields == other.fields
    }
}

/// Mutable view of an entity passed to `Builder::modify_entity`.
///
/// The type and ID of an entity cannot change; everything else can.
#[derive(Debug, Clone)]
pub struct EntityUpdate {
    /// Provenance of the entity.
    pub source: EntitySource,
    /// Fields of the entity.
    pub fields: Fields,
}

impl EntityUpdate {
    pub(crate) fn from_data(data: &EntityData) -> Self {
        Self {
            source: data.source.clone(),
            fields: data.fields.clone(),
        }
    }

    /// Sets a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.set(name, value);
        self
    }

    /// Removes a field.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.fields.remove(name);
        self
    }

    /// Changes the entity source.
    pub fn set_source(&mut self, source: impl Into<EntitySource>) -> &mut Self {
        self.source = source.into();
        self
    }
}
