//! # EntiStore Core
//!
//! In-memory, strongly-typed entity storage engine.
//!
//! This crate provides:
//! - Immutable, shareable [`Snapshot`]s and single-owner [`Builder`]s
//! - Persistent (copy-on-write) entity table and indices
//! - Symbolic id resolution and reverse reference lookup
//! - Entity source, virtual file url and external mapping indices
//! - Per-snapshot memoized queries
//!
//! ## Usage
//!
//! ```rust
//! use entistore_core::{Builder, DeclaredSchema, Fields, SchemaRegistry, SymbolicId};
//! use std::sync::Arc;
//!
//! let mut schemas = SchemaRegistry::new();
//! let module = schemas
//!     .register(
//!         "module",
//!         DeclaredSchema::new()
//!             .symbolic_id("module", "name")
//!             .references("dependencies"),
//!     )
//!     .unwrap();
//!
//! let mut builder = Builder::new(Arc::new(schemas));
//! builder
//!     .add_entity(module, "gradle", Fields::new().with("name", "util"))
//!     .unwrap();
//! builder
//!     .add_entity(
//!         module,
//!         "gradle",
//!         Fields::new()
//!             .with("name", "app")
//!             .with("dependencies", vec![SymbolicId::new("module", "util")]),
//!     )
//!     .unwrap();
//! let snapshot = builder.to_snapshot();
//!
//! let util = SymbolicId::new("module", "util");
//! assert!(snapshot.contains(&util));
//! assert_eq!(snapshot.referrers(&util, module).count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod changes;
mod config;
mod entity;
mod error;
mod file_url;
mod index;
mod lineage;
mod mapping;
mod persistent;
mod query;
mod schema;
mod snapshot;
mod stats;
mod store;
mod table;
mod types;

pub use builder::{ApplySummary, Builder, ReplaceSummary};
pub use changes::EntityChange;
pub use config::Config;
pub use entity::{EntityData, EntityId, EntitySource, EntityUpdate, Fields, LineageId, SymbolicId, Value};
pub use error::{StoreError, StoreResult};
pub use file_url::{FileUrlManager, InternedFileUrls, VirtualFileUrl};
pub use index::VirtualFileUrlIndex;
pub use mapping::{ExternalMapping, MappingValue};
pub use query::Query;
pub use schema::{DeclaredSchema, EntitySchema, SchemaRegistry};
pub use snapshot::Snapshot;
pub use stats::{SharingReport, StoreStats};
pub use store::{EntitiesBySource, EntityStore};
pub use types::{EntityTypeId, StoreVersion};
