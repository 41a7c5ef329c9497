//! Entity type schemas.
//!
//! The store treats entity fields as opaque. A schema tells it, per entity
//! type, which symbolic id an entity claims, which symbolic ids it references
//! and which file urls it points at. Everything else about a type is the
//! caller's business.
//!
//! Schemas are registered once in a [`SchemaRegistry`], which assigns each
//! type its [`EntityTypeId`]. The registry is frozen (shared behind an `Arc`)
//! when the first builder of a lineage is created.

use crate::entity::{Fields, SymbolicId, Value};
use crate::error::{StoreError, StoreResult};
use crate::file_url::VirtualFileUrl;
use crate::types::EntityTypeId;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Per-type extraction hooks used to maintain the indices.
///
/// Implementations must be deterministic: the same fields must always yield
/// the same ids and urls, otherwise removal cannot find what insertion added.
pub trait EntitySchema: Send + Sync {
    /// Returns the symbolic id claimed by an entity with these fields.
    fn symbolic_id(&self, _fields: &Fields) -> Option<SymbolicId> {
        None
    }

    /// Returns the distinct symbolic ids referenced by these fields.
    fn references(&self, _fields: &Fields) -> Vec<SymbolicId> {
        Vec::new()
    }

    /// Returns `(property, url)` pairs for every file url in these fields.
    fn file_urls(&self, _fields: &Fields) -> Vec<(Arc<str>, VirtualFileUrl)> {
        Vec::new()
    }
}

/// A schema described by field names.
///
/// # Example
///
/// ```rust,ignore
/// let module = DeclaredSchema::new()
///     .symbolic_id("module", "name")
///     .references("dependencies")
///     .file_url("content_root");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeclaredSchema {
    /// Symbolic id kind and the text field holding the name.
    symbolic: Option<(Arc<str>, String)>,
    /// Fields holding `Value::Ref` (or lists of them).
    reference_fields: Vec<String>,
    /// Fields holding `Value::Url` (or lists of them).
    url_fields: Vec<Arc<str>>,
}

impl DeclaredSchema {
    /// Creates a schema that extracts nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities claim `kind:<value of field>` as their symbolic id.
    #[must_use]
    pub fn symbolic_id(mut self, kind: impl Into<Arc<str>>, field: impl Into<String>) -> Self {
        self.symbolic = Some((kind.into(), field.into()));
        self
    }

    /// Declares a reference field.
    #[must_use]
    pub fn references(mut self, field: impl Into<String>) -> Self {
        self.reference_fields.push(field.into());
        self
    }

    /// Declares a file url field.
    #[must_use]
    pub fn file_url(mut self, field: impl Into<Arc<str>>) -> Self {
        self.url_fields.push(field.into());
        self
    }
}

impl EntitySchema for DeclaredSchema {
    fn symbolic_id(&self, fields: &Fields) -> Option<SymbolicId> {
        let (kind, field) = self.symbolic.as_ref()?;
        let name = fields.text(field)?;
        Some(SymbolicId::new(Arc::clone(kind), name))
    }

    fn references(&self, fields: &Fields) -> Vec<SymbolicId> {
        let mut found = BTreeSet::new();
        for field in &self.reference_fields {
            if let Some(value) = fields.get(field) {
                value.walk(&mut |v| {
                    if let Value::Ref(id) = v {
                        found.insert(id.clone());
                    }
                });
            }
        }
        found.into_iter().collect()
    }

    fn file_urls(&self, fields: &Fields) -> Vec<(Arc<str>, VirtualFileUrl)> {
        let mut found = Vec::new();
        for field in &self.url_fields {
            if let Some(value) = fields.get(field) {
                value.walk(&mut |v| {
                    if let Value::Url(url) = v {
                        found.push((Arc::clone(field), url.clone()));
                    }
                });
            }
        }
        found.sort();
        found.dedup();
        found
    }
}

struct RegisteredType {
    name: Arc<str>,
    schema: Arc<dyn EntitySchema>,
}

/// Registry of entity types.
#[derive(Default)]
pub struct SchemaRegistry {
    types: Vec<RegisteredType>,
    by_name: HashMap<Arc<str>, EntityTypeId>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type and returns its ID.
    pub fn register(
        &mut self,
        name: impl Into<Arc<str>>,
        schema: impl EntitySchema + 'static,
    ) -> StoreResult<EntityTypeId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(StoreError::DuplicateEntityType {
                name: name.to_string(),
            });
        }
        let type_id = EntityTypeId::new(self.types.len() as u32);
        self.by_name.insert(Arc::clone(&name), type_id);
        self.types.push(RegisteredType {
            name,
            schema: Arc::new(schema),
        });
        Ok(type_id)
    }

    /// Looks up a type by name.
    pub fn type_id(&self, name: &str) -> Option<EntityTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of a registered type.
    pub fn name(&self, type_id: EntityTypeId) -> Option<&str> {
        self.types.get(type_id.index()).map(|t| &*t.name)
    }

    /// Returns the schema of a registered type.
    pub fn schema(&self, type_id: EntityTypeId) -> StoreResult<&dyn EntitySchema> {
        self.types
            .get(type_id.index())
            .map(|t| t.schema.as_ref())
            .ok_or_else(|| StoreError::unknown_entity_type(type_id))
    }

    /// Iterates registered type IDs in registration order.
    pub fn type_ids(&self) -> impl Iterator<Item = EntityTypeId> {
        (0..self.types.len() as u32).map(EntityTypeId::new)
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.types.iter().map(|t| &t.name))
            .finish()
    }
}
