//! Secondary indices over the entity table.
//!
//! Every index is built from persistent maps and maintained incrementally
//! by the store on each add, remove and replace.

mod file_url;
mod source;
mod symbolic;

pub use file_url::VirtualFileUrlIndex;

pub(crate) use file_url::FileUrlIndex;
pub(crate) use source::SourceIndex;
pub(crate) use symbolic::SymbolicIndex;
