//! Memoized queries over a snapshot.

use crate::snapshot::Snapshot;
use crate::types::StoreVersion;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

/// A derived computation whose result is cached per snapshot.
///
/// Queries are compared by value: two equal queries against the same snapshot
/// share one result. `evaluate` must be a pure function of the snapshot and
/// the query value.
pub trait Query: Hash + Eq + Clone + Send + Sync + 'static {
    /// Result of the query.
    type Output: Clone + Send + Sync + 'static;

    /// Computes the result from scratch.
    fn evaluate(&self, snapshot: &Snapshot) -> Self::Output;
}

/// One cache slot. Empty until the first evaluation completes.
struct CacheEntry<T> {
    version: StoreVersion,
    cell: OnceLock<T>,
}

struct Entries<Q: Query>(HashMap<Q, Arc<CacheEntry<Q::Output>>>);

/// Type-erased per-query-type entry map.
trait ErasedEntries: Send + Sync {
    fn computed(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<Q: Query> ErasedEntries for Entries<Q> {
    fn computed(&self) -> usize {
        self.0.values().filter(|entry| entry.cell.get().is_some()).count()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-snapshot query cache.
///
/// The lock only guards the map from query to entry. Evaluation happens
/// outside it, on the entry's `OnceLock`, so a query may call
/// [`Snapshot::cached`] for other queries while it runs, and concurrent
/// callers of the same query wait for a single evaluation.
#[derive(Default)]
pub(crate) struct QueryCache {
    by_type: Mutex<HashMap<TypeId, Box<dyn ErasedEntries>>>,
}

impl QueryCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn entry<Q: Query>(
        &self,
        query: &Q,
        version: StoreVersion,
    ) -> Option<Arc<CacheEntry<Q::Output>>> {
        let mut by_type = self.by_type.lock();
        let entries = by_type
            .entry(TypeId::of::<Q>())
            .or_insert_with(|| Box::new(Entries::<Q>(HashMap::new())))
            .as_any_mut()
            .downcast_mut::<Entries<Q>>()?;
        let entry = match entries.0.get(query) {
            Some(entry) if entry.version == version => Arc::clone(entry),
            _ => {
                let entry = Arc::new(CacheEntry {
                    version,
                    cell: OnceLock::new(),
                });
                entries.0.insert(query.clone(), Arc::clone(&entry));
                entry
            }
        };
        Some(entry)
    }

    pub(crate) fn get_or_evaluate<Q: Query>(&self, query: &Q, snapshot: &Snapshot) -> Q::Output {
        match self.entry(query, snapshot.version()) {
            Some(entry) => entry.cell.get_or_init(|| query.evaluate(snapshot)).clone(),
            None => query.evaluate(snapshot),
        }
    }

    /// Returns the number of computed results across all query types.
    pub(crate) fn computed(&self) -> usize {
        self.by_type
            .lock()
            .values()
            .map(|entries| entries.computed())
            .sum()
    }
}
