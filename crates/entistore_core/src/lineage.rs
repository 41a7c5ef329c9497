//! Lineage state shared by every snapshot and builder of one store.

use crate::config::Config;
use crate::entity::{EntityId, LineageId};
use crate::error::{StoreError, StoreResult};
use crate::schema::SchemaRegistry;
use crate::types::EntityTypeId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Immutable lineage settings plus the slot allocator.
///
/// Slots are handed out per entity type from a counter shared by all
/// builders of the lineage, so two builders forked from the same snapshot
/// never mint the same [`EntityId`], and a removed entity's slot is never
/// handed out again.
pub(crate) struct Lineage {
    id: LineageId,
    config: Config,
    schemas: Arc<SchemaRegistry>,
    next_slots: Mutex<Vec<u32>>,
}

impl Lineage {
    pub(crate) fn new(config: Config, schemas: Arc<SchemaRegistry>) -> Self {
        let next_slots = vec![0; schemas.len()];
        Self {
            id: LineageId::new(),
            config,
            schemas,
            next_slots: Mutex::new(next_slots),
        }
    }

    pub(crate) fn id(&self) -> LineageId {
        self.id
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Mints a fresh entity ID of the given type.
    pub(crate) fn allocate(&self, type_id: EntityTypeId) -> StoreResult<EntityId> {
        let mut next_slots = self.next_slots.lock();
        let next = next_slots
            .get_mut(type_id.index())
            .ok_or_else(|| StoreError::unknown_entity_type(type_id))?;
        let slot = *next;
        *next = slot
            .checked_add(1)
            .ok_or(StoreError::SlotsExhausted { type_id })?;
        Ok(EntityId::new(self.id, type_id, slot))
    }

    /// Fails unless `id` was minted in this lineage.
    pub(crate) fn check(&self, id: EntityId) -> StoreResult<()> {
        if id.lineage() == self.id {
            Ok(())
        } else {
            Err(StoreError::cross_lineage(id, self.id))
        }
    }
}

impl fmt::Debug for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lineage")
            .field("id", &self.id)
            .field("types", &self.schemas.len())
            .finish_non_exhaustive()
    }
}
