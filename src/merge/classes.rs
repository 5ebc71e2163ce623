//! Class merge: attributes, base classes and properties.
//!
//! Property names are unique across a whole inheritance subtree. When two
//! incompatible declarations of one name meet, the declaration on the more
//! derived class yields: it is renamed `Name_N` and the mapping
//! `Name|Name_N` is recorded on its class. Renames reach at most
//! [`MAX_RENAME_DEPTH`] inheritance levels away from the class being
//! merged.

use super::context::{MergeContext, Scope};
use super::items::ItemPlan;
use super::policy::{adopt_right_option, ordered_union, preserve_left, preserve_left_option};
use super::{Issue, IssueCode, MergeError};
use crate::schema::{
    fold, same_name, ClassGraph, ClassModifier, ItemId, ItemRef, PropertyDef,
};
use std::collections::HashSet;
use tracing::debug;

/// How many inheritance levels a property rename may reach.
pub const MAX_RENAME_DEPTH: usize = 2;

impl MergeContext<'_> {
    /// Merges or copies every right class, bases before derived classes.
    pub(crate) fn merge_classes(&mut self, scope: Scope, plans: &[ItemPlan]) -> Result<(), MergeError> {
        let right_graph = self.right;
        let right_items = right_graph.at(scope.right).items();
        let right_classes = ClassGraph::build(right_graph);

        let ids: Vec<ItemId> = plans
            .iter()
            .filter(|plan| right_items[plan.right()].kind().is_class())
            .map(|plan| ItemId {
                schema: scope.right,
                item: plan.right(),
            })
            .collect();

        for id in right_classes.bases_first(&ids) {
            let Some(plan) = plans.iter().find(|plan| plan.right() == id.item) else {
                continue;
            };
            match plan {
                ItemPlan::Pair { left, .. } => {
                    let target = ItemId {
                        schema: scope.result,
                        item: *left,
                    };
                    self.merge_class(scope, id.item, target)?;
                }
                ItemPlan::Add { name, .. } => self.copy_class(scope, id.item, name)?,
            }
        }
        Ok(())
    }

    fn merge_class(&mut self, scope: Scope, right_index: usize, id: ItemId) -> Result<(), MergeError> {
        let right_graph = self.right;
        let item = self.translate_item(scope, &right_graph.at(scope.right).items()[right_index]);
        let (Some(right), Some(mut class)) = (item.as_class(), self.result.class(id).cloned()) else {
            return Ok(());
        };
        debug!(class = %self.result.qualified_name(id), "merging class");

        preserve_left(&mut class.display_label, &right.display_label);
        preserve_left(&mut class.description, &right.description);
        if class.modifier == ClassModifier::None {
            class.modifier = right.modifier;
        }
        self.union_custom_attributes(id.schema, &mut class.custom_attributes, &right.custom_attributes);
        ordered_union(&mut class.renamed_properties, &right.renamed_properties, |a, b| a == b);
        if let Some(slot) = self.result.class_mut(id) {
            *slot = class;
        }

        self.merge_base_classes(id, &right.base_classes)?;
        for property in &right.properties {
            self.merge_property(id, property)?;
        }
        Ok(())
    }

    /// Adds a class that has no left counterpart. Its properties must agree
    /// with everything it inherits in the result, and its bases must agree
    /// with each other.
    fn copy_class(&mut self, scope: Scope, right_index: usize, name: &str) -> Result<(), MergeError> {
        let right_graph = self.right;
        let mut item = self.translate_item(scope, &right_graph.at(scope.right).items()[right_index]);
        item.set_name(name);
        let graph = self.class_graph();
        let Some(class) = item.as_class_mut() else {
            return Ok(());
        };

        let inherited: Vec<(ItemId, PropertyDef)> = class
            .base_classes
            .iter()
            .filter_map(|base| self.result.resolve(scope.result, base))
            .flat_map(|base| self.visible_properties(base, &graph))
            .collect();
        let own = class.properties.iter().map(|p| (scope.result, p));
        let candidates: Vec<(usize, &PropertyDef)> = own
            .chain(inherited.iter().map(|(owner, p)| (owner.schema, p)))
            .collect();
        for (i, (schema, property)) in candidates.iter().enumerate() {
            let conflict = candidates[i + 1..].iter().any(|(other_schema, other)| {
                same_name(&other.name, &property.name)
                    && !self.compatible(*other_schema, other, *schema, property)
            });
            if conflict {
                return Err(MergeError::ClassCopyFailed {
                    schema: self.schema_name(scope),
                    class: name.to_string(),
                });
            }
        }
        class.base_classes = self.minimize_refs(scope.result, &class.base_classes, &graph);

        debug!(schema = %self.schema_name(scope), class = %name, "copying class");
        self.result.at_mut(scope.result).push_item(item);
        Ok(())
    }

    fn merge_base_classes(&mut self, id: ItemId, right_bases: &[ItemRef]) -> Result<(), MergeError> {
        for base in right_bases {
            let graph = self.class_graph();
            let current = self
                .result
                .class(id)
                .map(|c| c.base_classes.clone())
                .unwrap_or_default();

            let Some(base_id) = self.result.resolve(id.schema, base) else {
                if !current.iter().any(|c| c.same_as(base)) {
                    self.push_base(id, base);
                }
                continue;
            };
            let present = current
                .iter()
                .any(|c| self.result.resolve(id.schema, c) == Some(base_id));
            if present || graph.is_ancestor(base_id, id) {
                continue;
            }
            if base_id == id || graph.is_ancestor(id, base_id) {
                return Err(MergeError::BaseClassCycle {
                    base: self.result.qualified_name(base_id),
                    schema: self.result.at(id.schema).name.clone(),
                    class: self.item_name(id),
                });
            }

            self.check_new_base(id, base_id, &graph)?;
            debug!(class = %self.result.qualified_name(id), base = %self.result.qualified_name(base_id), "adding base class");
            self.push_base(id, base);
        }

        let graph = self.class_graph();
        let bases = self
            .result
            .class(id)
            .map(|c| c.base_classes.clone())
            .unwrap_or_default();
        let minimized = self.minimize_refs(id.schema, &bases, &graph);
        if let Some(class) = self.result.class_mut(id) {
            class.base_classes = minimized;
        }
        Ok(())
    }

    fn push_base(&mut self, id: ItemId, base: &ItemRef) {
        if let Some(class) = self.result.class_mut(id) {
            class.base_classes.push(base.clone());
        }
    }

    /// Properties arriving through a new base must agree with the class and
    /// with every class above it or beside it in the hierarchy. Descendants
    /// that disagree are renamed when allowed.
    fn check_new_base(&mut self, id: ItemId, base_id: ItemId, graph: &ClassGraph) -> Result<(), MergeError> {
        let incoming = self.visible_properties(base_id, graph);
        let incompatible = MergeError::NewBaseClassIncompatible {
            base: self.result.qualified_name(base_id),
            schema: self.result.at(id.schema).name.clone(),
            class: self.item_name(id),
        };

        let existing = std::iter::once(id).chain(
            graph
                .ancestors(id)
                .into_iter()
                .chain(graph.side_branches(id))
                .map(|(a, _)| a),
        );
        for owner in existing {
            let Some(class) = self.result.class(owner) else {
                continue;
            };
            for property in &class.properties {
                let clash = incoming.iter().any(|(source, other)| {
                    same_name(&other.name, &property.name)
                        && !self.compatible(owner.schema, property, source.schema, other)
                });
                if clash {
                    return Err(incompatible);
                }
            }
        }

        let reserved: HashSet<String> = incoming.iter().map(|(_, p)| fold(&p.name)).collect();
        for (derived, depth) in graph.descendants(id) {
            let properties = self
                .result
                .class(derived)
                .map(|c| c.properties.clone())
                .unwrap_or_default();
            for property in properties {
                let clash = incoming.iter().any(|(source, other)| {
                    same_name(&other.name, &property.name)
                        && !self.compatible(derived.schema, &property, source.schema, other)
                });
                if !clash {
                    continue;
                }
                if !self.options.rename_property_on_conflict || depth > MAX_RENAME_DEPTH {
                    return Err(incompatible);
                }
                self.rename_property(derived, &property.name, &reserved);
            }
        }
        Ok(())
    }

    fn merge_property(&mut self, id: ItemId, right: &PropertyDef) -> Result<(), MergeError> {
        let Some(class) = self.result.class(id) else {
            return Ok(());
        };
        // a mapping recorded by an earlier rename is followed when the
        // renamed property still matches the incoming declaration
        let existing = class.property(&right.name).cloned().or_else(|| {
            class
                .renamed_properties
                .iter()
                .filter(|r| same_name(&r.old_name, &right.name))
                .filter_map(|r| class.property(&r.new_name))
                .find(|p| self.compatible(id.schema, p, id.schema, right))
                .cloned()
        });

        match existing {
            Some(left) => self.merge_existing_property(id, &left, right),
            None => self.add_property(id, right.clone()),
        }
    }

    fn merge_existing_property(&mut self, id: ItemId, left: &PropertyDef, right: &PropertyDef) -> Result<(), MergeError> {
        let schema = self.result.at(id.schema).name.clone();
        let class = self.item_name(id);
        if left.kind != right.kind {
            return Err(MergeError::PropertyKindMismatch {
                schema,
                class,
                property: left.name.clone(),
            });
        }
        if !self.same_type(id.schema, &left.type_name, id.schema, &right.type_name) {
            let err = MergeError::PropertyTypeChanged {
                schema,
                class,
                property: left.name.clone(),
                from: left.type_name.to_string(),
                to: right.type_name.to_string(),
            };
            if !self.options.ignore_incompatible_property_type_changes {
                return Err(err);
            }
            self.issues.report(Issue::warning(
                IssueCode::PropertyTypeChangeIgnored,
                format!("{} The left type is kept.", err),
            ));
        }

        let mut merged = left.clone();
        preserve_left(&mut merged.display_label, &right.display_label);
        preserve_left(&mut merged.description, &right.description);
        preserve_left_option(&mut merged.min_occurs, &right.min_occurs);
        preserve_left_option(&mut merged.max_occurs, &right.max_occurs);
        preserve_left_option(&mut merged.direction, &right.direction);
        adopt_right_option(&mut merged.category, &right.category);
        adopt_right_option(&mut merged.quantity_specification, &right.quantity_specification);
        self.union_custom_attributes(id.schema, &mut merged.custom_attributes, &right.custom_attributes);

        if let Some(slot) = self
            .result
            .class_mut(id)
            .and_then(|c| c.property_mut(&left.name))
        {
            *slot = merged;
        }
        Ok(())
    }

    fn add_property(&mut self, id: ItemId, mut property: PropertyDef) -> Result<(), MergeError> {
        let graph = self.class_graph();

        // declarations a shared descendant would also inherit win like bases
        let overriding = graph.ancestors(id).into_iter().chain(graph.side_branches(id));
        for (owner, depth) in overriding {
            let Some(other) = self
                .result
                .class(owner)
                .and_then(|c| c.property(&property.name))
                .cloned()
            else {
                continue;
            };
            if self.compatible(owner.schema, &other, id.schema, &property) {
                continue;
            }
            self.ensure_renamable(id, &property.name, owner, &other.name, depth)?;
            let new_name = self.free_property_name(id, &property.name, &graph, &HashSet::new());
            self.record_property_rename(id, &property.name, &new_name);
            property.name = new_name;
            break;
        }

        for (derived, depth) in graph.descendants(id) {
            let Some(other) = self
                .result
                .class(derived)
                .and_then(|c| c.property(&property.name))
                .cloned()
            else {
                continue;
            };
            if self.compatible(derived.schema, &other, id.schema, &property) {
                continue;
            }
            self.ensure_renamable(id, &property.name, derived, &other.name, depth)?;
            let reserved = HashSet::from([fold(&property.name)]);
            self.rename_property(derived, &other.name, &reserved);
        }

        debug!(class = %self.result.qualified_name(id), property = %property.name, "adding property");
        if let Some(class) = self.result.class_mut(id) {
            class.properties.push(property);
        }
        Ok(())
    }

    fn ensure_renamable(
        &self,
        id: ItemId,
        property: &str,
        other_class: ItemId,
        other: &str,
        depth: usize,
    ) -> Result<(), MergeError> {
        if !self.options.rename_property_on_conflict {
            return Err(MergeError::PropertyConflict {
                schema: self.result.at(id.schema).name.clone(),
                class: self.item_name(id),
                property: property.to_string(),
            });
        }
        if depth > MAX_RENAME_DEPTH {
            return Err(MergeError::PropertyConflictTooDeep {
                schema: self.result.at(id.schema).name.clone(),
                class: self.item_name(id),
                property: property.to_string(),
                other: other.to_string(),
                other_class: self.result.qualified_name(other_class),
                max_depth: MAX_RENAME_DEPTH,
            });
        }
        Ok(())
    }

    fn rename_property(&mut self, class: ItemId, name: &str, reserved: &HashSet<String>) {
        let graph = self.class_graph();
        let new_name = self.free_property_name(class, name, &graph, reserved);
        let Some(property) = self
            .result
            .class_mut(class)
            .and_then(|c| c.property_mut(name))
        else {
            return;
        };
        let old_name = std::mem::replace(&mut property.name, new_name.clone());
        self.record_property_rename(class, &old_name, &new_name);
    }

    fn record_property_rename(&mut self, class: ItemId, old_name: &str, new_name: &str) {
        if let Some(c) = self.result.class_mut(class) {
            c.record_rename(old_name, new_name);
        }
        let message = format!(
            "Property {}:{} was renamed to {} because it conflicts with another property in the class hierarchy.",
            self.result.qualified_name(class),
            old_name,
            new_name
        );
        self.issues.report(Issue::warning(IssueCode::PropertyRenamed, message));
    }

    /// Smallest `base_N` not used anywhere in the hierarchy around `class`.
    fn free_property_name(
        &self,
        class: ItemId,
        base: &str,
        graph: &ClassGraph,
        reserved: &HashSet<String>,
    ) -> String {
        let family = std::iter::once(class)
            .chain(graph.ancestors(class).into_iter().map(|(a, _)| a))
            .chain(graph.descendants(class).into_iter().map(|(d, _)| d))
            .chain(graph.side_branches(class).into_iter().map(|(s, _)| s));
        let mut taken: HashSet<String> = reserved.clone();
        for member in family {
            if let Some(c) = self.result.class(member) {
                taken.extend(c.properties.iter().map(|p| fold(&p.name)));
            }
        }

        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !taken.contains(&fold(&candidate)) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Properties visible on `class`: its own, then inherited ones, nearest
    /// declaration first.
    pub(crate) fn visible_properties(&self, class: ItemId, graph: &ClassGraph) -> Vec<(ItemId, PropertyDef)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let owners = std::iter::once(class).chain(graph.ancestors(class).into_iter().map(|(a, _)| a));
        for owner in owners {
            let Some(c) = self.result.class(owner) else {
                continue;
            };
            for property in &c.properties {
                if seen.insert(fold(&property.name)) {
                    out.push((owner, property.clone()));
                }
            }
        }
        out
    }

    /// Drops list members that are transitive bases of other members, and
    /// duplicates. Unresolvable members are kept.
    pub(crate) fn minimize_refs(&self, schema: usize, refs: &[ItemRef], graph: &ClassGraph) -> Vec<ItemRef> {
        let resolved: Vec<Option<ItemId>> = refs.iter().map(|r| self.result.resolve(schema, r)).collect();
        let ids: Vec<ItemId> = resolved.iter().flatten().copied().collect();
        let keep = graph.minimize(&ids);
        let mut seen = HashSet::new();
        refs.iter()
            .zip(resolved)
            .filter(|(_, id)| match id {
                Some(id) => keep.contains(id) && seen.insert(*id),
                None => true,
            })
            .map(|(r, _)| r.clone())
            .collect()
    }
}
