//! Outcome of a merge call.

use super::{Issue, Issues};
use crate::schema::{fold, Schema, SchemaGraph};
use std::collections::HashSet;
use std::fmt;

/// Overall status, taken from the first unresolved error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeStatus {
    Success,
    NamedItemAlreadyExists,
    DataTypeMismatch,
    RelationshipConstraintsNotCompatible,
    Error,
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStatus::Success => "success",
            MergeStatus::NamedItemAlreadyExists => "named item already exists",
            MergeStatus::DataTypeMismatch => "data type mismatch",
            MergeStatus::RelationshipConstraintsNotCompatible => {
                "relationship constraints not compatible"
            }
            MergeStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// MergeResult owns the merged graph and everything reported about it.
#[derive(Debug, Clone)]
pub struct MergeResult {
    status: MergeStatus,
    graph: SchemaGraph,
    modified: HashSet<String>,
    issues: Issues,
}

impl MergeResult {
    pub(crate) fn new(
        status: MergeStatus,
        graph: SchemaGraph,
        modified: HashSet<String>,
        issues: Issues,
    ) -> Self {
        MergeResult {
            status,
            graph,
            modified,
            issues,
        }
    }

    pub fn status(&self) -> MergeStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == MergeStatus::Success
    }

    /// The merged graph in dependency order.
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn schemas(&self) -> &[Schema] {
        self.graph.schemas()
    }

    /// Looks a merged schema up by name, ignoring case.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.graph.get(name)
    }

    /// Left schemas whose merged content differs from the left input.
    pub fn modified_schemas(&self) -> Vec<&Schema> {
        self.graph
            .iter()
            .filter(|s| self.modified.contains(&fold(&s.name)))
            .collect()
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.modified.contains(&fold(name))
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.errors()
    }

    /// Consumes the result, handing the merged graph to the caller.
    pub fn into_graph(self) -> SchemaGraph {
        self.graph
    }
}
