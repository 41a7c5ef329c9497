//! Entity and lineage identifiers.

use crate::types::EntityTypeId;
use std::fmt;
use uuid::Uuid;

/// Identifier of a store lineage.
///
/// A lineage is the tree of snapshots and builders descended from one empty
/// builder. Lineage IDs are random 128-bit UUIDs, so identifiers from two
/// independently created stores never compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineageId(Uuid);

impl LineageId {
    /// Creates a new random lineage ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LineageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineageId({})", self.0)
    }
}

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal identifier of an entity.
///
/// Entity IDs are:
/// - Unique within a lineage (sibling builders never share one)
/// - Stable across modification of the same entity
/// - Never reused once the entity is removed
///
/// IDs can only be minted by a builder, which makes it impossible to forge
/// an ID for a lineage the caller never touched.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    lineage: LineageId,
    type_id: EntityTypeId,
    slot: u32,
}

impl EntityId {
    pub(crate) const fn new(lineage: LineageId, type_id: EntityTypeId, slot: u32) -> Self {
        Self {
            lineage,
            type_id,
            slot,
        }
    }

    /// Returns the lineage this ID was minted in.
    #[inline]
    #[must_use]
    pub const fn lineage(&self) -> LineageId {
        self.lineage
    }

    /// Returns the type of the identified entity.
    #[inline]
    #[must_use]
    pub const fn entity_type(&self) -> EntityTypeId {
        self.type_id
    }

    /// Returns the table slot within the entity type.
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityId({}#{}@{})",
            self.type_id,
            self.slot,
            &self.lineage.0.simple().to_string()[..8]
        )
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_id, self.slot)
    }
}
