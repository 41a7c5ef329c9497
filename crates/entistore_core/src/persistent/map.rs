//! Sharded hash map with copy-on-write shards.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Hash map with structural sharing.
///
/// Keys are spread over a fixed, power-of-two number of shards. Cloning the
/// map copies one `Arc`; writing through a clone copies the shard directory
/// and the one shard owning the key. Values are cloned when their shard is
/// copied, so large values should themselves be cheap to clone.
pub(crate) struct PersistentMap<K, V> {
    shards: Arc<Vec<Arc<HashMap<K, V>>>>,
    hasher: RandomState,
    len: usize,
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            shards: Arc::clone(&self.shards),
            hasher: self.hasher.clone(),
            len: self.len,
        }
    }
}

impl<K, V> PersistentMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates an empty map. `shards` must be a power of two.
    pub(crate) fn new(shards: usize) -> Self {
        debug_assert!(shards.is_power_of_two());
        // All shards start out as the same empty map.
        let empty = Arc::new(HashMap::new());
        Self {
            shards: Arc::new(vec![empty; shards]),
            hasher: RandomState::new(),
            len: 0,
        }
    }

    #[inline]
    fn shard_of(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) & (self.shards.len() - 1)
    }

    /// Returns the value for a key.
    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.shards[self.shard_of(key)].get(key)
    }

    /// Returns true if the key is present.
    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.shards[self.shard_of(key)].contains_key(key)
    }

    fn shard_mut(&mut self, shard: usize) -> &mut HashMap<K, V> {
        Arc::make_mut(&mut Arc::make_mut(&mut self.shards)[shard])
    }

    /// Inserts a value, returning the previous one.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let shard = self.shard_of(&key);
        let previous = self.shard_mut(shard).insert(key, value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Removes a key, returning its value.
    ///
    /// Absent keys leave the map untouched, so no shard is copied.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let shard = self.shard_of(key);
        if !self.shards[shard].contains_key(key) {
            return None;
        }
        let previous = self.shard_mut(shard).remove(key);
        self.len -= 1;
        previous
    }

    /// Returns a mutable reference to a present value.
    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let shard = self.shard_of(key);
        if !self.shards[shard].contains_key(key) {
            return None;
        }
        self.shard_mut(shard).get_mut(key)
    }

    /// Returns a mutable reference to the value, inserting a default first.
    pub(crate) fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let shard = self.shard_of(&key);
        if !self.shards[shard].contains_key(&key) {
            self.len += 1;
        }
        self.shard_mut(shard).entry(key).or_default()
    }

    /// Iterates all entries in unspecified order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.shards.iter().flat_map(|shard| shard.iter())
    }

    /// Iterates all keys in unspecified order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Returns the number of entries.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of shards.
    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Counts shards physically shared with `other`.
    pub(crate) fn shared_shards(&self, other: &Self) -> usize {
        self.shards
            .iter()
            .zip(other.shards.iter())
            .filter(|(a, b)| Arc::ptr_eq(a, b))
            .count()
    }
}

/// Hash set with structural sharing, backed by [`PersistentMap`].
pub(crate) struct PersistentSet<T>(PersistentMap<T, ()>);

impl<T> Clone for PersistentSet<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + Eq + Hash> PersistentSet<T> {
    /// Creates an empty set.
    pub(crate) fn new(shards: usize) -> Self {
        Self(PersistentMap::new(shards))
    }

    /// Adds a value; returns true if it was not present.
    pub(crate) fn insert(&mut self, value: T) -> bool {
        self.0.insert(value, ()).is_none()
    }

    /// Removes a value; returns true if it was present.
    pub(crate) fn remove(&mut self, value: &T) -> bool {
        self.0.remove(value).is_some()
    }

    /// Returns true if the value is present.
    #[cfg(test)]
    pub(crate) fn contains(&self, value: &T) -> bool {
        self.0.contains_key(value)
    }

    /// Iterates values in unspecified order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.0.keys()
    }

    /// Returns the number of values.
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
