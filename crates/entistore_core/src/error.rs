//! Error types for EntiStore.

use crate::entity::{EntityId, LineageId, SymbolicId};
use crate::types::EntityTypeId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// Lookups of unknown symbolic ids or mapping names are not errors; they
/// yield empty results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another entity already claims the symbolic id.
    #[error("symbolic id {symbolic_id} is already claimed by {existing}")]
    DuplicateSymbolicId {
        /// The contested symbolic id.
        symbolic_id: SymbolicId,
        /// The entity currently claiming it.
        existing: EntityId,
    },

    /// Entity not found in this store.
    #[error("entity not found: {entity_id}")]
    EntityNotFound {
        /// The entity ID that was not found.
        entity_id: EntityId,
    },

    /// Entity ID originates from an unrelated lineage.
    #[error("entity {entity_id} does not belong to lineage {expected}")]
    CrossLineage {
        /// The foreign entity ID.
        entity_id: EntityId,
        /// Lineage of the store the ID was used against.
        expected: LineageId,
    },

    /// Entity type is not registered in the schema registry.
    #[error("unknown entity type: {type_id}")]
    UnknownEntityType {
        /// The unregistered type.
        type_id: EntityTypeId,
    },

    /// An entity type with this name is already registered.
    #[error("entity type already registered: {name}")]
    DuplicateEntityType {
        /// Name of the type.
        name: String,
    },

    /// Entity is already present in this store.
    #[error("entity already exists: {entity_id}")]
    EntityExists {
        /// The duplicate entity ID.
        entity_id: EntityId,
    },

    /// Two stores belong to different lineages.
    #[error("lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch {
        /// Lineage of the receiving store.
        expected: LineageId,
        /// Lineage of the other store.
        actual: LineageId,
    },

    /// Two stores were built against different schema registries.
    #[error("stores use different schema registries")]
    SchemaMismatch,

    /// The lineage ran out of slots for an entity type.
    #[error("entity slots exhausted for {type_id}")]
    SlotsExhausted {
        /// The exhausted type.
        type_id: EntityTypeId,
    },

    /// The operation needs a change log but change tracking is disabled.
    #[error("change tracking is disabled for this lineage")]
    ChangeTrackingDisabled,

    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates a duplicate symbolic id error.
    pub fn duplicate_symbolic_id(symbolic_id: SymbolicId, existing: EntityId) -> Self {
        Self::DuplicateSymbolicId {
            symbolic_id,
            existing,
        }
    }

    /// Creates an entity not found error.
    pub fn entity_not_found(entity_id: EntityId) -> Self {
        Self::EntityNotFound { entity_id }
    }

    /// Creates a cross lineage error.
    pub fn cross_lineage(entity_id: EntityId, expected: LineageId) -> Self {
        Self::CrossLineage {
            entity_id,
            expected,
        }
    }

    /// Creates an unknown entity type error.
    pub fn unknown_entity_type(type_id: EntityTypeId) -> Self {
        Self::UnknownEntityType { type_id }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if this is a symbolic id conflict.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateSymbolicId { .. })
    }
}
