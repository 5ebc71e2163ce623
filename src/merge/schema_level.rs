//! Header-level merge of one schema pair.

use super::context::{MergeContext, Scope};
use super::policy;
use crate::schema::{SchemaRef, Version};
use tracing::debug;

impl MergeContext<'_> {
    /// Merges references, version, labels and custom attributes.
    ///
    /// References go first so that right prefixes can be translated against
    /// the merged reference list.
    pub(crate) fn merge_schema_header(&mut self, scope: Scope) {
        let right_graph = self.right;
        let right = right_graph.at(scope.right);

        let added: Vec<SchemaRef> = right
            .references
            .iter()
            .filter(|r| self.result.at(scope.result).reference(&r.name).is_none())
            .map(|r| match self.result.get(&r.name) {
                Some(target) => SchemaRef {
                    name: target.name.clone(),
                    version: target.version,
                    alias: r.alias.clone(),
                },
                None => r.clone(),
            })
            .collect();
        if !added.is_empty() {
            debug!(schema = %right.name, count = added.len(), "adding schema references");
        }
        self.result.at_mut(scope.result).references.extend(added);

        let right_attributes = self.translate_custom_attributes(scope, &right.custom_attributes);
        let mut attributes = self.result.at(scope.result).custom_attributes.clone();
        self.union_custom_attributes(scope.result, &mut attributes, &right_attributes);

        let keep_version = self.options.keep_version;
        let prefer_right_label = self.options.prefer_right_side_display_label;
        let left = self.result.at_mut(scope.result);
        left.custom_attributes = attributes;
        if !keep_version {
            left.version = Version::greatest(left.version, right.version);
        }
        if prefer_right_label {
            left.display_label = right.display_label.clone();
        } else {
            policy::preserve_left(&mut left.display_label, &right.display_label);
        }
        policy::preserve_left(&mut left.description, &right.description);
        debug!(schema = %left.name, version = %left.version, "merged schema header");
    }

    /// Seeds the result with an empty copy of a right-only schema and
    /// returns its position.
    pub(crate) fn add_schema_shell(&mut self, right: usize) -> usize {
        let source = self.right.at(right);
        let index = self.result.push(source.empty_copy());
        let scope = Scope { result: index, right };
        let attributes = self.translate_custom_attributes(scope, &source.custom_attributes);
        self.result.at_mut(index).custom_attributes = attributes;
        debug!(schema = %source.name, "copying right-only schema");
        index
    }
}
