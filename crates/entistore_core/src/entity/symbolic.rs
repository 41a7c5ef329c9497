//! Symbolic entity identifiers and entity sources.

use std::fmt;
use std::sync::Arc;

/// A field-derived, stable key that other entities reference instead of
/// holding an [`EntityId`](crate::EntityId).
///
/// The `kind` namespaces the name: a module and a library may both be called
/// `core` without conflicting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolicId {
    kind: Arc<str>,
    name: Arc<str>,
}

impl SymbolicId {
    /// Creates a symbolic id.
    pub fn new(kind: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SymbolicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Provenance marker: which external origin produced an entity.
///
/// The store never interprets the value beyond grouping and filtering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntitySource(Arc<str>);

impl EntitySource {
    /// Creates an entity source.
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self(source.into())
    }

    /// Returns the source as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntitySource {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for EntitySource {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl fmt::Display for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
