//! Change log of a builder relative to its base snapshot.

use crate::entity::{EntityData, EntityId};
use crate::persistent::PersistentMap;
use crate::types::EntityTypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Net change of one entity since the base snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityChange {
    /// The entity did not exist in the base snapshot.
    Added(Arc<EntityData>),
    /// The entity existed in the base snapshot and is gone.
    Removed(Arc<EntityData>),
    /// The entity exists on both sides with different content.
    Replaced {
        /// Version in the base snapshot.
        old: Arc<EntityData>,
        /// Current version.
        new: Arc<EntityData>,
    },
}

impl EntityChange {
    /// Returns the ID of the changed entity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Added(data) | Self::Removed(data) => data.id(),
            Self::Replaced { new, .. } => new.id(),
        }
    }

    /// Returns the type of the changed entity.
    #[must_use]
    pub fn entity_type(&self) -> EntityTypeId {
        self.id().entity_type()
    }
}

/// Net changes per entity.
///
/// Each entity has at most one entry, collapsed as edits arrive:
///
/// | recorded | then | result |
/// |----------|------|--------|
/// | added | removed | nothing |
/// | added | replaced | added (new) |
/// | replaced | replaced | replaced (original, new), or nothing if equal to the original |
/// | replaced | removed | removed (original) |
/// | removed | added | replaced (original, new), or nothing if equal to the original |
#[derive(Clone)]
pub(crate) struct ChangeLog {
    entries: PersistentMap<EntityId, EntityChange>,
}

impl ChangeLog {
    pub(crate) fn new(shards: usize) -> Self {
        Self {
            entries: PersistentMap::new(shards),
        }
    }

    pub(crate) fn added(&mut self, data: &Arc<EntityData>) {
        let id = data.id();
        let change = match self.entries.remove(&id) {
            Some(EntityChange::Removed(original)) => Self::replacement(original, data),
            _ => Some(EntityChange::Added(Arc::clone(data))),
        };
        if let Some(change) = change {
            self.entries.insert(id, change);
        }
    }

    pub(crate) fn removed(&mut self, data: &Arc<EntityData>) {
        let id = data.id();
        let change = match self.entries.remove(&id) {
            Some(EntityChange::Added(_)) => None,
            Some(EntityChange::Replaced { old, .. }) => Some(EntityChange::Removed(old)),
            _ => Some(EntityChange::Removed(Arc::clone(data))),
        };
        if let Some(change) = change {
            self.entries.insert(id, change);
        }
    }

    pub(crate) fn replaced(&mut self, old: &Arc<EntityData>, new: &Arc<EntityData>) {
        let id = new.id();
        let change = match self.entries.remove(&id) {
            Some(EntityChange::Added(_)) => Some(EntityChange::Added(Arc::clone(new))),
            Some(EntityChange::Replaced { old: original, .. }) => Self::replacement(original, new),
            _ => Some(EntityChange::Replaced {
                old: Arc::clone(old),
                new: Arc::clone(new),
            }),
        };
        if let Some(change) = change {
            self.entries.insert(id, change);
        }
    }

    fn replacement(original: Arc<EntityData>, new: &Arc<EntityData>) -> Option<EntityChange> {
        if original.same_content(new) {
            None
        } else {
            Some(EntityChange::Replaced {
                old: original,
                new: Arc::clone(new),
            })
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the changes grouped by type, each group ordered by entity ID.
    pub(crate) fn collect(&self) -> BTreeMap<EntityTypeId, Vec<EntityChange>> {
        let mut grouped: BTreeMap<EntityTypeId, Vec<EntityChange>> = BTreeMap::new();
        for change in self.iter() {
            grouped
                .entry(change.entity_type())
                .or_default()
                .push(change.clone());
        }
        for changes in grouped.values_mut() {
            changes.sort_by_key(EntityChange::id);
        }
        grouped
    }

    /// Iterates changes in unspecified order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &EntityChange> + '_ {
        self.entries.iter().map(|(_, change)| change)
    }
}
