//! Immutable, versioned store snapshots.

use crate::builder::Builder;
use crate::query::{Query, QueryCache};
use crate::store::EntityStore;
use crate::types::StoreVersion;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

struct SnapshotInner {
    store: EntityStore,
    version: StoreVersion,
    cache: QueryCache,
}

/// An immutable view of the entity store.
///
/// Snapshots are cheap to clone and safe to share between threads. All read
/// operations come from [`EntityStore`], which a snapshot dereferences to.
/// Nothing reachable from a snapshot can change it; edits go through a
/// [`Builder`] obtained from [`to_builder`](Self::to_builder).
#[derive(Clone)]
pub struct Snapshot {
    inner: Arc<SnapshotInner>,
}

impl Snapshot {
    pub(crate) fn new(store: EntityStore, version: StoreVersion) -> Self {
        Self {
            inner: Arc::new(SnapshotInner {
                store,
                version,
                cache: QueryCache::new(),
            }),
        }
    }

    /// Returns the version of this snapshot.
    ///
    /// Versions increase with every commit along a chain of builders.
    #[must_use]
    pub fn version(&self) -> StoreVersion {
        self.inner.version
    }

    /// Returns a builder whose working copy starts out equal to this snapshot.
    #[must_use]
    pub fn to_builder(&self) -> Builder {
        Builder::from_snapshot(self.clone())
    }

    /// Evaluates a query, or returns the result cached on this snapshot.
    pub fn cached<Q: Query>(&self, query: &Q) -> Q::Output {
        self.inner.cache.get_or_evaluate(query, self)
    }

    /// Returns the number of query results cached on this snapshot.
    #[must_use]
    pub fn cached_query_count(&self) -> usize {
        self.inner.cache.computed()
    }

    /// Returns true if both handles refer to the same snapshot instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.inner.store
    }
}

impl Deref for Snapshot {
    type Target = EntityStore;

    fn deref(&self) -> &EntityStore {
        &self.inner.store
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.inner.version)
            .field("store", &self.inner.store)
            .finish()
    }
}
