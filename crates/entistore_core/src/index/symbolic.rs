//! Symbolic id index.

use crate::entity::{EntityId, SymbolicId};
use crate::error::{StoreError, StoreResult};
use crate::persistent::PersistentMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Maps symbolic ids to the entity claiming them, and tracks which entities
/// reference which symbolic ids.
///
/// Four maps are kept in step:
/// - `claims`: symbolic id to claiming entity (unique)
/// - `claimed_by`: entity to the symbolic id it claims
/// - `referrers`: symbolic id to the entities referencing it
/// - `references`: entity to the symbolic ids it references
///
/// References are stored by symbolic id, so they survive replacement of the
/// target entity and may point at ids nobody claims yet.
#[derive(Clone)]
pub(crate) struct SymbolicIndex {
    claims: PersistentMap<SymbolicId, EntityId>,
    claimed_by: PersistentMap<EntityId, SymbolicId>,
    referrers: PersistentMap<SymbolicId, Arc<HashSet<EntityId>>>,
    references: PersistentMap<EntityId, Arc<[SymbolicId]>>,
}

impl SymbolicIndex {
    pub(crate) fn new(shards: usize) -> Self {
        Self {
            claims: PersistentMap::new(shards),
            claimed_by: PersistentMap::new(shards),
            referrers: PersistentMap::new(shards),
            references: PersistentMap::new(shards),
        }
    }

    /// Returns the entity claiming a symbolic id.
    pub(crate) fn resolve(&self, symbolic_id: &SymbolicId) -> Option<EntityId> {
        self.claims.get(symbolic_id).copied()
    }

    /// Returns true if some entity claims the symbolic id.
    pub(crate) fn contains(&self, symbolic_id: &SymbolicId) -> bool {
        self.claims.contains_key(symbolic_id)
    }

    /// Returns the symbolic id claimed by an entity.
    pub(crate) fn symbolic_id_of(&self, id: EntityId) -> Option<&SymbolicId> {
        self.claimed_by.get(&id)
    }

    /// Fails if the symbolic id is claimed by an entity other than `claimant`.
    pub(crate) fn check_claim(
        &self,
        symbolic_id: &SymbolicId,
        claimant: Option<EntityId>,
    ) -> StoreResult<()> {
        match self.resolve(symbolic_id) {
            Some(existing) if Some(existing) != claimant => Err(
                StoreError::duplicate_symbolic_id(symbolic_id.clone(), existing),
            ),
            _ => Ok(()),
        }
    }

    /// Records a claim. The caller has run [`check_claim`](Self::check_claim).
    pub(crate) fn claim(&mut self, id: EntityId, symbolic_id: SymbolicId) {
        debug_assert!(self.check_claim(&symbolic_id, Some(id)).is_ok());
        self.claims.insert(symbolic_id.clone(), id);
        self.claimed_by.insert(id, symbolic_id);
    }

    /// Drops the claim held by an entity, if any.
    pub(crate) fn release(&mut self, id: EntityId) -> Option<SymbolicId> {
        let symbolic_id = self.claimed_by.remove(&id)?;
        if self.claims.get(&symbolic_id) == Some(&id) {
            self.claims.remove(&symbolic_id);
        }
        Some(symbolic_id)
    }

    /// Records the outgoing references of an entity.
    pub(crate) fn add_references(&mut self, id: EntityId, targets: Vec<SymbolicId>) {
        if targets.is_empty() {
            return;
        }
        for target in &targets {
            Arc::make_mut(self.referrers.get_or_insert_default(target.clone())).insert(id);
        }
        self.references.insert(id, targets.into());
    }

    /// Forgets the outgoing references of an entity.
    pub(crate) fn remove_references(&mut self, id: EntityId) {
        let Some(targets) = self.references.remove(&id) else {
            return;
        };
        for target in targets.iter() {
            let now_empty = match self.referrers.get_mut(target) {
                Some(set) => {
                    let set = Arc::make_mut(set);
                    set.remove(&id);
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.referrers.remove(target);
            }
        }
    }

    /// Iterates entities referencing a symbolic id.
    pub(crate) fn referrers(&self, target: &SymbolicId) -> impl Iterator<Item = EntityId> + '_ {
        self.referrers
            .get(target)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Returns the symbolic ids an entity references.
    pub(crate) fn references_of(&self, id: EntityId) -> &[SymbolicId] {
        self.references.get(&id).map_or(&[], |targets| targets)
    }

    /// Returns the number of claimed symbolic ids.
    pub(crate) fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns the number of distinct referenced symbolic ids.
    pub(crate) fn referenced_len(&self) -> usize {
        self.referrers.len()
    }

    /// Returns `(shared, total)` shard counts relative to `other`.
    pub(crate) fn sharing(&self, other: &Self) -> (usize, usize) {
        let shared = self.claims.shared_shards(&other.claims)
            + self.claimed_by.shared_shards(&other.claimed_by)
            + self.referrers.shared_shards(&other.referrers)
            + self.references.shared_shards(&other.references);
        (shared, 4 * self.claims.shard_count())
    }
}
