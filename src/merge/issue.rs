//! Structured issues raised while merging, and the listener seam.

use super::MergeStatus;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

/// The part of the model an issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    Schema,
    SchemaItem,
    Class,
    Property,
    Relationship,
}

/// Error taxonomy. `Notice` covers informational issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    NameConflict,
    TypeConflict,
    StructuralImmutabilityViolation,
    PropertyConflict,
    RelationshipConstraintIncompatible,
    DuplicateSchemaName,
    CopyFailure,
    Notice,
}

/// Fine-grained identity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    DuplicateSchemaName,
    SchemaReferenceCycle,
    MissingSchemaReference,
    SchemaNotDynamic,
    SchemaSkipped,
    NamedItemAlreadyExists,
    ItemRenamed,
    ClassTypeMismatch,
    EnumerationTypeChanged,
    DuplicateEnumeratorValue,
    UnitDefinitionChanged,
    PropertyKindMismatch,
    PropertyTypeChanged,
    PropertyTypeChangeIgnored,
    PropertyNameConflict,
    PropertyRenamed,
    NewBaseClassIncompatible,
    BaseClassCycle,
    ClassCopyFailed,
    StrengthMismatch,
    StrengthMismatchIgnored,
    AbstractConstraintConflict,
    InvalidConstraint,
    ConstraintValidationSkipped,
}

impl IssueCode {
    pub fn kind(self) -> IssueKind {
        match self {
            IssueCode::NamedItemAlreadyExists | IssueCode::ItemRenamed | IssueCode::ClassTypeMismatch => {
                IssueKind::NameConflict
            }
            IssueCode::PropertyKindMismatch
            | IssueCode::PropertyTypeChanged
            | IssueCode::PropertyTypeChangeIgnored => IssueKind::TypeConflict,
            IssueCode::EnumerationTypeChanged
            | IssueCode::DuplicateEnumeratorValue
            | IssueCode::UnitDefinitionChanged => IssueKind::StructuralImmutabilityViolation,
            IssueCode::PropertyNameConflict
            | IssueCode::PropertyRenamed
            | IssueCode::NewBaseClassIncompatible
            | IssueCode::BaseClassCycle => IssueKind::PropertyConflict,
            IssueCode::StrengthMismatch
            | IssueCode::StrengthMismatchIgnored
            | IssueCode::AbstractConstraintConflict
            | IssueCode::InvalidConstraint
            | IssueCode::ConstraintValidationSkipped => IssueKind::RelationshipConstraintIncompatible,
            IssueCode::DuplicateSchemaName => IssueKind::DuplicateSchemaName,
            IssueCode::ClassCopyFailed => IssueKind::CopyFailure,
            IssueCode::SchemaReferenceCycle
            | IssueCode::MissingSchemaReference
            | IssueCode::SchemaNotDynamic
            | IssueCode::SchemaSkipped => IssueKind::Notice,
        }
    }

    pub fn category(self) -> IssueCategory {
        match self {
            IssueCode::DuplicateSchemaName
            | IssueCode::SchemaReferenceCycle
            | IssueCode::MissingSchemaReference
            | IssueCode::SchemaNotDynamic
            | IssueCode::SchemaSkipped => IssueCategory::Schema,
            IssueCode::NamedItemAlreadyExists
            | IssueCode::ItemRenamed
            | IssueCode::EnumerationTypeChanged
            | IssueCode::DuplicateEnumeratorValue
            | IssueCode::UnitDefinitionChanged => IssueCategory::SchemaItem,
            IssueCode::ClassTypeMismatch
            | IssueCode::NewBaseClassIncompatible
            | IssueCode::BaseClassCycle
            | IssueCode::ClassCopyFailed => IssueCategory::Class,
            IssueCode::PropertyKindMismatch
            | IssueCode::PropertyTypeChanged
            | IssueCode::PropertyTypeChangeIgnored
            | IssueCode::PropertyNameConflict
            | IssueCode::PropertyRenamed => IssueCategory::Property,
            IssueCode::StrengthMismatch
            | IssueCode::StrengthMismatchIgnored
            | IssueCode::AbstractConstraintConflict
            | IssueCode::InvalidConstraint
            | IssueCode::ConstraintValidationSkipped => IssueCategory::Relationship,
        }
    }

    /// Status reported when this code is the first unresolved error.
    pub fn status(self) -> MergeStatus {
        match self {
            IssueCode::DuplicateSchemaName
            | IssueCode::NamedItemAlreadyExists
            | IssueCode::ClassTypeMismatch => MergeStatus::NamedItemAlreadyExists,
            IssueCode::PropertyKindMismatch | IssueCode::EnumerationTypeChanged => {
                MergeStatus::DataTypeMismatch
            }
            IssueCode::StrengthMismatch
            | IssueCode::AbstractConstraintConflict
            | IssueCode::InvalidConstraint => MergeStatus::RelationshipConstraintsNotCompatible,
            _ => MergeStatus::Error,
        }
    }
}

/// Issue is one structured finding of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub kind: IssueKind,
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    /// Creates an issue; category and kind follow from the code.
    pub fn new(severity: IssueSeverity, code: IssueCode, message: impl Into<String>) -> Self {
        Issue {
            severity,
            category: code.category(),
            kind: code.kind(),
            code,
            message: message.into(),
        }
    }

    pub fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Issue::new(IssueSeverity::Info, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Issue::new(IssueSeverity::Warning, code, message)
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Issue::new(IssueSeverity::Error, code, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// IssueListener receives issues as they are raised.
pub trait IssueListener {
    fn on_issue(&self, issue: &Issue);
}

impl<F> IssueListener for F
where
    F: Fn(&Issue),
{
    fn on_issue(&self, issue: &Issue) {
        self(issue)
    }
}

/// Issues is an ordered collection of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issues {
    issues: Vec<Issue>,
}

impl Issues {
    pub fn new() -> Self {
        Issues { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    /// Issues of error severity.
    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_error())
    }

}

impl IntoIterator for Issues {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// Collects issues for one merge call and forwards them to the listener.
pub(crate) struct IssueSink<'a> {
    listener: Option<&'a dyn IssueListener>,
    issues: Issues,
}

impl<'a> IssueSink<'a> {
    pub(crate) fn new(listener: Option<&'a dyn IssueListener>) -> Self {
        IssueSink {
            listener,
            issues: Issues::new(),
        }
    }

    pub(crate) fn report(&mut self, issue: Issue) {
        match issue.severity {
            IssueSeverity::Info => info!(code = ?issue.code, "{}", issue.message),
            IssueSeverity::Warning | IssueSeverity::Error => {
                warn!(code = ?issue.code, severity = ?issue.severity, "{}", issue.message)
            }
        }
        if let Some(listener) = self.listener {
            listener.on_issue(&issue);
        }
        self.issues.add(issue);
    }

    /// Status derived from the first error, or success.
    pub(crate) fn status(&self) -> MergeStatus {
        self.issues
            .errors()
            .next()
            .map_or(MergeStatus::Success, |issue| issue.code.status())
    }

    pub(crate) fn into_issues(self) -> Issues {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_issue_taxonomy_follows_code() {
        let issue = Issue::error(IssueCode::PropertyKindMismatch, "boom");
        assert_eq!(issue.kind, IssueKind::TypeConflict);
        assert_eq!(issue.category, IssueCategory::Property);
        assert_eq!(issue.code.status(), MergeStatus::DataTypeMismatch);
    }

    #[test]
    fn test_sink_forwards_to_closure_listener() {
        let seen = RefCell::new(Vec::new());
        let listener = |issue: &Issue| seen.borrow_mut().push(issue.message.clone());
        let mut sink = IssueSink::new(Some(&listener));

        sink.report(Issue::warning(IssueCode::MissingSchemaReference, "first"));
        assert_eq!(sink.status(), MergeStatus::Success);
        sink.report(Issue::error(IssueCode::StrengthMismatch, "second"));
        sink.report(Issue::error(IssueCode::PropertyTypeChanged, "third"));
        assert_eq!(sink.status(), MergeStatus::RelationshipConstraintsNotCompatible);

        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
        let issues = sink.into_issues();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues.errors().count(), 2);
    }
}
