//! Hard merge failures. The `Display` text of each variant is the stable
//! issue message callers match on.

use super::{Issue, IssueCode};
use crate::schema::{ConstraintEnd, GraphError, ItemKind, Strength, Version};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MergeError {
    #[error("The schema list contains the schema '{name}' more than once.")]
    DuplicateSchema { name: String },

    #[error("Schema '{name}' is part of a cycle of schema references.")]
    ReferenceCycle { name: String },

    #[error("Another item with name {schema}:{item} already exists in the merged schema {schema}.{version}. RenameSchemaItemOnConflict is set to false.")]
    NamedItemExists {
        schema: String,
        item: String,
        version: Version,
    },

    #[error("Cannot merge class {schema}:{class} because the type of class is different.")]
    ClassTypeMismatch { schema: String, class: String },

    #[error("Enumeration '{schema}:{enumeration}' has its Type changed. This is not supported.")]
    EnumerationTypeChanged { schema: String, enumeration: String },

    #[error("Enumeration '{schema}:{enumeration}' ends up having duplicate enumerator values after merge, which is not allowed. Name of new Enumerator: {enumerator}")]
    DuplicateEnumeratorValue {
        schema: String,
        enumeration: String,
        enumerator: String,
    },

    #[error("{kind} '{schema}:{item}' has its {field} changed. This is not supported.")]
    UnitDefinitionChanged {
        kind: ItemKind,
        schema: String,
        item: String,
        field: &'static str,
    },

    #[error("Property {schema}:{class}:{property} has mismatching types between both sides.")]
    PropertyKindMismatch {
        schema: String,
        class: String,
        property: String,
    },

    #[error("Property {schema}:{class}:{property} has its type changed from {from} to {to}.")]
    PropertyTypeChanged {
        schema: String,
        class: String,
        property: String,
        from: String,
        to: String,
    },

    #[error("Failed to add property {property} to class {schema}:{class} because it conflicts with another property. RenamePropertyOnConflict flag is set to false.")]
    PropertyConflict {
        schema: String,
        class: String,
        property: String,
    },

    #[error("Failed to add property {property} to class {schema}:{class} because it conflicts with property {other} on {other_class}, which is more than {max_depth} inheritance levels away.")]
    PropertyConflictTooDeep {
        schema: String,
        class: String,
        property: String,
        other: String,
        other_class: String,
        max_depth: usize,
    },

    #[error("New base class {base} is incompatible with properties on {schema}:{class} or its derived classes.")]
    NewBaseClassIncompatible {
        base: String,
        schema: String,
        class: String,
    },

    #[error("Adding base class {base} to {schema}:{class} would make the class derive from itself.")]
    BaseClassCycle {
        base: String,
        schema: String,
        class: String,
    },

    #[error("Failed to copy class {schema}:{class} into merged schema")]
    ClassCopyFailed { schema: String, class: String },

    #[error("Relationship {schema}:{class} has strength {strength} but its base relationship {base} has strength {base_strength}.")]
    StrengthMismatch {
        schema: String,
        class: String,
        strength: Strength,
        base: String,
        base_strength: Strength,
    },

    #[error("Setting AbstractConstraint on {schema}:{class} failed. Was trying to set to {constraint}.")]
    AbstractConstraintConflict {
        schema: String,
        class: String,
        constraint: String,
    },

    #[error("Abstract constraint {constraint} on the {end} of {schema}:{class} is not a base of constraint class {member}.")]
    AbstractConstraintNotBase {
        schema: String,
        class: String,
        end: ConstraintEnd,
        constraint: String,
        member: String,
    },

    #[error("The {end} constraint of {schema}:{class} has multiple classes but no abstract constraint.")]
    MissingAbstractConstraint {
        schema: String,
        class: String,
        end: ConstraintEnd,
    },

    #[error("Constraint class {member} on the {end} of {schema}:{class} does not narrow the {end} constraint of base relationship {base}.")]
    ConstraintNotNarrowed {
        schema: String,
        class: String,
        end: ConstraintEnd,
        member: String,
        base: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl MergeError {
    pub fn code(&self) -> IssueCode {
        match self {
            MergeError::DuplicateSchema { .. } => IssueCode::DuplicateSchemaName,
            MergeError::ReferenceCycle { .. } => IssueCode::SchemaReferenceCycle,
            MergeError::NamedItemExists { .. } => IssueCode::NamedItemAlreadyExists,
            MergeError::ClassTypeMismatch { .. } => IssueCode::ClassTypeMismatch,
            MergeError::EnumerationTypeChanged { .. } => IssueCode::EnumerationTypeChanged,
            MergeError::DuplicateEnumeratorValue { .. } => IssueCode::DuplicateEnumeratorValue,
            MergeError::UnitDefinitionChanged { .. } => IssueCode::UnitDefinitionChanged,
            MergeError::PropertyKindMismatch { .. } => IssueCode::PropertyKindMismatch,
            MergeError::PropertyTypeChanged { .. } => IssueCode::PropertyTypeChanged,
            MergeError::PropertyConflict { .. } | MergeError::PropertyConflictTooDeep { .. } => {
                IssueCode::PropertyNameConflict
            }
            MergeError::NewBaseClassIncompatible { .. } => IssueCode::NewBaseClassIncompatible,
            MergeError::BaseClassCycle { .. } | MergeError::Graph(_) => IssueCode::BaseClassCycle,
            MergeError::ClassCopyFailed { .. } => IssueCode::ClassCopyFailed,
            MergeError::StrengthMismatch { .. } => IssueCode::StrengthMismatch,
            MergeError::AbstractConstraintConflict { .. } => IssueCode::AbstractConstraintConflict,
            MergeError::AbstractConstraintNotBase { .. }
            | MergeError::MissingAbstractConstraint { .. }
            | MergeError::ConstraintNotNarrowed { .. } => IssueCode::InvalidConstraint,
        }
    }

    /// The error as an issue of error severity.
    pub fn to_issue(&self) -> Issue {
        Issue::error(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_item_message() {
        let err = MergeError::NamedItemExists {
            schema: "MySchema".to_string(),
            item: "MyConflict".to_string(),
            version: Version::new(1, 0, 1),
        };
        assert_eq!(
            err.to_string(),
            "Another item with name MySchema:MyConflict already exists in the merged schema MySchema.01.00.01. RenameSchemaItemOnConflict is set to false."
        );
        assert_eq!(err.code(), IssueCode::NamedItemAlreadyExists);
    }

    #[test]
    fn test_unit_message_names_kind_and_field() {
        let err = MergeError::UnitDefinitionChanged {
            kind: ItemKind::Unit,
            schema: "MySchema".to_string(),
            item: "M".to_string(),
            field: "UnitSystem",
        };
        assert_eq!(
            err.to_string(),
            "Unit 'MySchema:M' has its UnitSystem changed. This is not supported."
        );
    }

    #[test]
    fn test_graph_error_is_transparent() {
        let err: MergeError = GraphError::Cycle("S:A".to_string()).into();
        assert_eq!(err.to_issue().message, "class S:A derives from itself through its base classes");
        assert_eq!(err.code(), IssueCode::BaseClassCycle);
    }
}
