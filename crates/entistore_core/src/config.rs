//! Store configuration.

use crate::error::{StoreError, StoreResult};

/// Configuration for a store lineage.
///
/// The configuration is fixed when the first (empty) builder of a lineage is
/// created and is inherited by every snapshot and builder derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of shards in each persistent index map. Must be a power of two.
    pub index_shards: usize,

    /// Log2 of the number of slots per entity table chunk.
    pub arena_chunk_bits: u32,

    /// Whether builders record a change log relative to their base snapshot.
    pub track_changes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_shards: 32,
            arena_chunk_bits: 6, // 64 slots per chunk
            track_changes: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of index shards.
    #[must_use]
    pub const fn index_shards(mut self, shards: usize) -> Self {
        self.index_shards = shards;
        self
    }

    /// Sets the entity table chunk size as a power of two.
    #[must_use]
    pub const fn arena_chunk_bits(mut self, bits: u32) -> Self {
        self.arena_chunk_bits = bits;
        self
    }

    /// Sets whether builders track changes.
    #[must_use]
    pub const fn track_changes(mut self, value: bool) -> Self {
        self.track_changes = value;
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> StoreResult<()> {
        if self.index_shards == 0 || !self.index_shards.is_power_of_two() {
            return Err(StoreError::invalid_config(format!(
                "index_shards must be a non-zero power of two, got {}",
                self.index_shards
            )));
        }
        if !(1..=12).contains(&self.arena_chunk_bits) {
            return Err(StoreError::invalid_config(format!(
                "arena_chunk_bits must be within 1..=12, got {}",
                self.arena_chunk_bits
            )));
        }
        Ok(())
    }
}
