//! # EntiStore Testkit
//!
//! Test utilities for EntiStore.
//!
//! This crate provides:
//! - A sample project-model schema and prebuilt stores
//! - Property-based operation generators using proptest
//! - An oracle-backed harness that checks store contents after every step
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use entistore_testkit::prelude::*;
//!
//! let model = ProjectModel::new();
//! let snapshot = model.sample_project();
//! assert!(snapshot.contains(&module_id("app")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
