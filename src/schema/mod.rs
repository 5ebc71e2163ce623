//! Schema module defines the typed metadata model that the merger works on.
//!
//! A schema is a named, versioned collection of items (classes,
//! enumerations, units, formats, ...). Schemas reference each other, and a
//! [`SchemaGraph`] holds a set of them so that references can be resolved
//! across schema boundaries.

mod classes;
mod elements;
mod equals;
mod error;
mod graph;
mod hierarchy;
mod items;
mod names;
mod version;

pub use classes::*;
pub use elements::*;
pub use error::*;
pub use graph::*;
pub use hierarchy::*;
pub use items::*;
pub use names::*;
pub use version::*;
