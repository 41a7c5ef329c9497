//! Virtual file urls and the file-identity service contract.
//!
//! The store never resolves paths itself. A [`FileUrlManager`] hands out
//! stable [`VirtualFileUrl`] identifiers and the file url index stores only
//! those identifiers.

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable identifier for a file-system location.
///
/// Equality, ordering and hashing use the numeric id only; the url text is
/// carried for display and must agree with the id within one manager.
#[derive(Clone)]
pub struct VirtualFileUrl {
    id: u32,
    url: Arc<str>,
}

impl VirtualFileUrl {
    /// Creates a url handle. Intended for [`FileUrlManager`] implementations.
    pub fn new(id: u32, url: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }

    /// Returns the numeric identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the url text.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PartialEq for VirtualFileUrl {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VirtualFileUrl {}

impl PartialOrd for VirtualFileUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualFileUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for VirtualFileUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for VirtualFileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualFileUrl({}, {:?})", self.id, self.url)
    }
}

impl fmt::Display for VirtualFileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// File-identity service.
///
/// Implementations must return the same identifier for the same url for as
/// long as any store holding that identifier is alive.
pub trait FileUrlManager: Send + Sync {
    /// Returns the identifier for `url`, creating one if needed.
    fn get_or_create(&self, url: &str) -> VirtualFileUrl;

    /// Returns the identifier for `url` if one was created before.
    fn find(&self, url: &str) -> Option<VirtualFileUrl>;
}

/// In-memory [`FileUrlManager`] that interns url strings.
#[derive(Default)]
pub struct InternedFileUrls {
    urls: RwLock<HashMap<Arc<str>, VirtualFileUrl>>,
}

impl InternedFileUrls {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of interned urls.
    pub fn len(&self) -> usize {
        self.urls.read().len()
    }

    /// Returns true if no url was interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileUrlManager for InternedFileUrls {
    fn get_or_create(&self, url: &str) -> VirtualFileUrl {
        if let Some(existing) = self.urls.read().get(url) {
            return existing.clone();
        }
        let mut urls = self.urls.write();
        // Another thread may have interned it between the two locks.
        if let Some(existing) = urls.get(url) {
            return existing.clone();
        }
        let text: Arc<str> = Arc::from(url);
        let created = VirtualFileUrl::new(urls.len() as u32, Arc::clone(&text));
        urls.insert(text, created.clone());
        created
    }

    fn find(&self, url: &str) -> Option<VirtualFileUrl> {
        self.urls.read().get(url).cloned()
    }
}

impl fmt::Debug for InternedFileUrls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternedFileUrls")
            .field("len", &self.len())
            .finish()
    }
}
