//! Merge module - two-way merge of schema graphs.
//!
//! [`SchemaMerger`] pairs schemas across the two inputs, orders them by
//! reference, and merges each pair item by item. Hard failures roll back
//! the schema they occur in and surface as [`Issue`]s on the
//! [`MergeResult`].

mod classes;
mod context;
mod error;
mod issue;
mod items;
mod merger;
mod options;
mod policy;
mod relationships;
mod resolver;
mod result;
mod schema_level;


pub use classes::MAX_RENAME_DEPTH;
pub use error::*;
pub use issue::*;
pub use merger::*;
pub use options::*;
pub use result::*;

pub(crate) use issue::IssueSink;
