//! Entity types and identifiers.

mod data;
mod id;
mod symbolic;
mod value;

pub use data::{EntityData, EntityUpdate};
pub use id::{EntityId, LineageId};
pub use symbolic::{EntitySource, SymbolicId};
pub use value::{Fields, Value};
