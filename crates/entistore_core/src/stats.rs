//! Store statistics and structural sharing diagnostics.
//!
//! # Usage
//!
//! ```rust,ignore
//! let before = builder.to_snapshot();
//! builder.add_entity(module, "gradle", fields)?;
//! let after = builder.to_snapshot();
//!
//! println!("{:?}", after.stats());
//! println!("shared: {:.0}%", after.sharing_with(&before).ratio() * 100.0);
//! ```

use crate::store::EntityStore;
use crate::types::EntityTypeId;
use std::collections::BTreeMap;

/// A point-in-time summary of a store's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of entities.
    pub entities: usize,
    /// Entity count per type, for types with at least one entity.
    pub entities_by_type: BTreeMap<EntityTypeId, usize>,
    /// Number of claimed symbolic ids.
    pub symbolic_ids: usize,
    /// Number of distinct symbolic ids referenced by some entity.
    pub referenced_ids: usize,
    /// Number of distinct entity sources.
    pub sources: usize,
    /// Number of distinct virtual file urls.
    pub file_urls: usize,
    /// Number of non-empty external mappings.
    pub mappings: usize,
    /// Total entries across all external mappings.
    pub mapping_entries: usize,
}

/// How much physical structure two stores share.
///
/// Counts are of table chunks and index shards; a shared part is one both
/// stores point to rather than a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharingReport {
    /// Table chunks shared with the other store.
    pub shared_chunks: usize,
    /// Table chunks in this store.
    pub total_chunks: usize,
    /// Index shards shared with the other store.
    pub shared_shards: usize,
    /// Index shards in this store.
    pub total_shards: usize,
}

impl SharingReport {
    /// Fraction of chunks and shards that are shared, in `0.0..=1.0`.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        let total = self.total_chunks + self.total_shards;
        if total == 0 {
            return 1.0;
        }
        (self.shared_chunks + self.shared_shards) as f64 / total as f64
    }
}

impl EntityStore {
    /// Returns a summary of this store's contents.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let entities_by_type = self
            .schemas()
            .type_ids()
            .map(|type_id| (type_id, self.entity_count_of(type_id)))
            .filter(|(_, count)| *count > 0)
            .collect();
        StoreStats {
            entities: self.entity_count(),
            entities_by_type,
            symbolic_ids: self.symbolic_index().len(),
            referenced_ids: self.symbolic_index().referenced_len(),
            sources: self.source_index().len(),
            file_urls: self.url_index().len(),
            mappings: self.mappings().names().count(),
            mapping_entries: self.mappings().entry_count(),
        }
    }

    /// Compares the physical layout of this store with `other`.
    ///
    /// Stores of unrelated lineages share nothing.
    #[must_use]
    pub fn sharing_with(&self, other: &EntityStore) -> SharingReport {
        let (shared_chunks, total_chunks) = self.table().sharing(other.table());
        let indices = [
            self.symbolic_index().sharing(other.symbolic_index()),
            self.source_index().sharing(other.source_index()),
            self.url_index().sharing(other.url_index()),
        ];
        let (shared_shards, total_shards) = indices
            .into_iter()
            .fold((0, 0), |(shared, total), (s, t)| (shared + s, total + t));
        SharingReport {
            shared_chunks,
            total_chunks,
            shared_shards,
            total_shards,
        }
    }
}
