//! Options controlling how conflicts between the two sides are resolved.

use crate::schema::ParseError;
use serde::{Deserialize, Serialize};

/// MergeOptions holds independent boolean switches. All are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeOptions {
    /// Keep the left version instead of the greater of both versions.
    pub keep_version: bool,
    /// Rename an incoming item whose name is taken by an item of another kind.
    pub rename_schema_item_on_conflict: bool,
    /// Rename properties involved in a cross-branch name conflict.
    pub rename_property_on_conflict: bool,
    /// Keep the left type when a property changes its declared type.
    pub ignore_incompatible_property_type_changes: bool,
    /// Accept relationships whose strength differs from their base.
    pub ignore_strength_change_problems: bool,
    /// Always take the display label of the right schema.
    pub prefer_right_side_display_label: bool,
    /// Do not pull referenced schemas that were not supplied.
    pub do_not_merge_references: bool,
    /// Keep the left schema verbatim unless one side is dynamic.
    pub merge_only_dynamic_schemas: bool,
    /// Union relationship constraints without validating them.
    pub skip_validation: bool,
}

impl MergeOptions {
    pub fn new() -> Self {
        MergeOptions::default()
    }

    /// Loads options from a YAML document. Missing keys stay off.
    pub fn from_yaml(s: &str) -> Result<Self, ParseError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads options from a JSON document. Missing keys stay off.
    pub fn from_json(s: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn with_keep_version(mut self, value: bool) -> Self {
        self.keep_version = value;
        self
    }

    pub fn with_rename_schema_item_on_conflict(mut self, value: bool) -> Self {
        self.rename_schema_item_on_conflict = value;
        self
    }

    pub fn with_rename_property_on_conflict(mut self, value: bool) -> Self {
        self.rename_property_on_conflict = value;
        self
    }

    pub fn with_ignore_incompatible_property_type_changes(mut self, value: bool) -> Self {
        self.ignore_incompatible_property_type_changes = value;
        self
    }

    pub fn with_ignore_strength_change_problems(mut self, value: bool) -> Self {
        self.ignore_strength_change_problems = value;
        self
    }

    pub fn with_prefer_right_side_display_label(mut self, value: bool) -> Self {
        self.prefer_right_side_display_label = value;
        self
    }

    pub fn with_do_not_merge_references(mut self, value: bool) -> Self {
        self.do_not_merge_references = value;
        self
    }

    pub fn with_merge_only_dynamic_schemas(mut self, value: bool) -> Self {
        self.merge_only_dynamic_schemas = value;
        self
    }

    pub fn with_skip_validation(mut self, value: bool) -> Self {
        self.skip_validation = value;
        self
    }

    /// Referenced schemas are pulled in unless `do_not_merge_references` is set.
    pub fn pulls_references(&self) -> bool {
        !self.do_not_merge_references
    }
}
