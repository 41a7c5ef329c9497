//! Persistent collections with structural sharing.
//!
//! Every structure here is a two-level tree of `Arc`s. Clones are O(1) and
//! mutation copies only the path to the touched leaf via `Arc::make_mut`, so
//! a builder mutating its working copy never disturbs the snapshot it was
//! derived from, and a snapshot published from the builder shares every
//! untouched leaf with its predecessor.

mod arena;
mod map;

pub(crate) use arena::ChunkedArena;
pub(crate) use map::{PersistentMap, PersistentSet};
