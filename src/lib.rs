//! # Schema Merger
//!
//! Two-way merge of typed metadata schemas.
//!
//! Given an existing (left) and an incoming (right) set of schemas, the
//! merger produces one combined set that is a superset of both. Conflicts
//! are resolved by explicit, configurable policies; anything that cannot be
//! resolved is reported as an issue and rolls back only the schema it
//! occurred in.
//!
//! ## Modules
//!
//! - [`schema`] - The schema model: schemas, items, classes, references and
//!   the graphs used to resolve them
//! - [`merge`] - Options, the merge engine and its results
//!
//! ## Example
//!
//! ```
//! use schema_merger::{merge_schemas, MergeOptions, Schema};
//!
//! let left = Schema::from_yaml("name: Demo\nalias: d\nversion: '01.00.00'\n").unwrap();
//! let right = Schema::from_yaml("name: Demo\nalias: d\nversion: '01.00.02'\n").unwrap();
//! let result = merge_schemas(&[left], &[right], MergeOptions::default());
//! assert!(result.is_success());
//! assert_eq!(result.schema("demo").unwrap().version.to_string(), "01.00.02");
//! ```

pub mod merge;
pub mod schema;

pub use merge::{
    merge_schemas, Issue, IssueListener, MergeOptions, MergeResult, MergeStatus, SchemaMerger,
    SchemaMergerBuilder,
};
pub use schema::{Schema, SchemaCache, SchemaGraph, SchemaItem, SchemaLocator, Version};
