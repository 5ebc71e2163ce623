//! State shared by every step of one merge call.

use super::{policy, IssueSink, MergeError, MergeOptions};
use crate::schema::{
    fold, same_name, ClassGraph, CustomAttributeInstance, ItemId, ItemKey, ItemRef, PropertyDef,
    SchemaGraph, SchemaItem, TypeName,
};
use std::collections::HashMap;

/// A right-side schema and the result schema it is merged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scope {
    pub(crate) result: usize,
    pub(crate) right: usize,
}

/// Everything that has to be rolled back when one schema fails.
pub(crate) struct Snapshot {
    result: SchemaGraph,
    item_renames: HashMap<ItemKey, String>,
}

pub(crate) struct MergeContext<'a> {
    pub(crate) options: &'a MergeOptions,
    pub(crate) right: &'a SchemaGraph,
    pub(crate) result: SchemaGraph,
    /// Right items renamed to avoid a name clash, keyed by their right-side
    /// identity.
    pub(crate) item_renames: HashMap<ItemKey, String>,
    pub(crate) issues: IssueSink<'a>,
}

impl<'a> MergeContext<'a> {
    pub(crate) fn new(
        options: &'a MergeOptions,
        right: &'a SchemaGraph,
        result: SchemaGraph,
        issues: IssueSink<'a>,
    ) -> Self {
        MergeContext {
            options,
            right,
            result,
            item_renames: HashMap::new(),
            issues,
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            result: self.result.clone(),
            item_renames: self.item_renames.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.result = snapshot.result;
        self.item_renames = snapshot.item_renames;
    }

    /// Name of the result schema in scope.
    pub(crate) fn schema_name(&self, scope: Scope) -> String {
        self.result.at(scope.result).name.clone()
    }

    /// Name of the item at `id` in the result.
    pub(crate) fn item_name(&self, id: ItemId) -> String {
        self.result
            .item(id)
            .map(|item| item.name().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn class_graph(&self) -> ClassGraph {
        ClassGraph::build(&self.result)
    }

    /// Fails if a class of the schema pair in `scope` derives from itself on
    /// either side. Cycles in other schemas belong to those schemas.
    pub(crate) fn check_class_cycles(&self, scope: Scope) -> Result<(), MergeError> {
        ClassGraph::build(self.right).check_acyclic(self.right, scope.right)?;
        self.class_graph().check_acyclic(&self.result, scope.result)?;
        Ok(())
    }

    /// Rewrites a reference written in the right schema of `scope` so that it
    /// reads correctly inside the result schema.
    ///
    /// Items renamed on the way in are followed. A prefix is kept when it
    /// still points at the same schema from the result's point of view,
    /// otherwise the target schema's name is used.
    pub(crate) fn translate_ref(&self, scope: Scope, r: &ItemRef) -> ItemRef {
        let Some(target) = self.right.resolve_prefix(scope.right, r.schema.as_deref()) else {
            return r.clone();
        };
        let target_name = &self.right.at(target).name;
        let name = self
            .item_renames
            .get(&ItemKey::new(target_name, &r.name))
            .cloned()
            .unwrap_or_else(|| r.name.clone());

        let schema = r.schema.as_ref().map(|prefix| {
            let in_result = self.result.position(target_name);
            if in_result.is_some()
                && self.result.resolve_prefix(scope.result, Some(prefix)) == in_result
            {
                prefix.clone()
            } else {
                in_result.map_or_else(|| target_name.clone(), |i| self.result.at(i).name.clone())
            }
        });
        ItemRef { schema, name }
    }

    /// Copy of a right item with every reference translated.
    pub(crate) fn translate_item(&self, scope: Scope, item: &SchemaItem) -> SchemaItem {
        let mut item = item.clone();
        item.for_each_ref_mut(&mut |r| *r = self.translate_ref(scope, r));
        item
    }

    pub(crate) fn translate_custom_attributes(
        &self,
        scope: Scope,
        attributes: &[CustomAttributeInstance],
    ) -> Vec<CustomAttributeInstance> {
        attributes
            .iter()
            .map(|ca| CustomAttributeInstance {
                class: self.translate_ref(scope, &ca.class),
                properties: ca.properties.clone(),
            })
            .collect()
    }

    /// Returns true if both references, written in result schema `schema`,
    /// point at the same item. Unresolvable references compare by text.
    pub(crate) fn same_target(&self, schema: usize, a: &ItemRef, b: &ItemRef) -> bool {
        match (self.result.resolve(schema, a), self.result.resolve(schema, b)) {
            (Some(x), Some(y)) => x == y,
            _ => a.same_as(b),
        }
    }

    /// Ordered union of custom attribute instances by attribute class; the
    /// left instance wins.
    pub(crate) fn union_custom_attributes(
        &self,
        schema: usize,
        left: &mut Vec<CustomAttributeInstance>,
        right: &[CustomAttributeInstance],
    ) {
        policy::ordered_union(left, right, |l, r| self.same_target(schema, &l.class, &r.class));
    }

    pub(crate) fn same_type(&self, a_schema: usize, a: &TypeName, b_schema: usize, b: &TypeName) -> bool {
        match (a, b) {
            (TypeName::Primitive(x), TypeName::Primitive(y)) => same_name(x, y),
            (TypeName::Item(x), TypeName::Item(y)) => {
                match (self.result.resolve(a_schema, x), self.result.resolve(b_schema, y)) {
                    (Some(i), Some(j)) => i == j,
                    _ => x.same_as(y),
                }
            }
            _ => false,
        }
    }

    /// Two declarations of a property name can coexist in one hierarchy
    /// when they agree on kind and type.
    pub(crate) fn compatible(&self, a_schema: usize, a: &PropertyDef, b_schema: usize, b: &PropertyDef) -> bool {
        a.kind == b.kind && self.same_type(a_schema, &a.type_name, b_schema, &b.type_name)
    }

    /// Aligns references in a result schema with what the result holds:
    /// item names take the casing of the item they resolve to, and schema
    /// references carry the referenced schema's merged version.
    pub(crate) fn fix_references(&mut self, index: usize) {
        let mut schema = self.result.at(index).clone();
        let result = &self.result;
        schema.for_each_ref_mut(&mut |r| {
            if let Some(item) = result.resolve(index, r).and_then(|id| result.item(id)) {
                if r.name != item.name() {
                    r.name = item.name().to_string();
                }
            }
        });
        for reference in &mut schema.references {
            if let Some(target) = result.get(&reference.name) {
                reference.name = target.name.clone();
                reference.version = target.version;
            }
        }
        *self.result.at_mut(index) = schema;
    }

    /// Folded names of every item already in the result schema in scope.
    pub(crate) fn taken_item_names(&self, scope: Scope) -> Vec<String> {
        self.result
            .at(scope.result)
            .items()
            .iter()
            .map(|item| fold(item.name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, SchemaRef, Version};

    fn graph(schemas: Vec<Schema>) -> SchemaGraph {
        SchemaGraph::from_schemas(schemas)
    }

    fn with_ref(mut schema: Schema, name: &str, alias: &str) -> Schema {
        let mut reference = SchemaRef::new(name, Version::new(1, 0, 0));
        reference.alias = alias.to_string();
        schema.references.push(reference);
        schema
    }

    #[test]
    fn test_translate_ref_follows_aliases_and_renames() {
        let options = MergeOptions::default();
        let right = graph(vec![
            Schema::new("Units", "u", Version::new(1, 0, 0)),
            with_ref(Schema::new("Main", "m", Version::new(1, 0, 0)), "Units", "u"),
        ]);
        let result = graph(vec![
            Schema::new("Units", "units", Version::new(1, 0, 0)),
            with_ref(Schema::new("Main", "m", Version::new(1, 0, 0)), "Units", "units"),
        ]);
        let mut ctx = MergeContext::new(&options, &right, result, IssueSink::new(None));
        let scope = Scope { result: 1, right: 1 };

        // right alias "u" is not known in the result, so the name is used
        let r = ctx.translate_ref(scope, &ItemRef::qualified("u", "M"));
        assert_eq!(r, ItemRef::qualified("Units", "M"));

        let r = ctx.translate_ref(scope, &ItemRef::local("Thing"));
        assert_eq!(r, ItemRef::local("Thing"));

        ctx.item_renames
            .insert(ItemKey::new("Main", "Thing"), "Thing_".to_string());
        let r = ctx.translate_ref(scope, &ItemRef::qualified("m", "thing"));
        assert_eq!(r, ItemRef::qualified("m", "Thing_"));
    }

    #[test]
    fn test_snapshot_restore() {
        let options = MergeOptions::default();
        let right = SchemaGraph::new();
        let mut ctx = MergeContext::new(&options, &right, SchemaGraph::new(), IssueSink::new(None));
        let snapshot = ctx.snapshot();
        ctx.result.push(Schema::new("A", "a", Version::new(1, 0, 0)));
        ctx.item_renames.insert(ItemKey::new("A", "X"), "X_".to_string());
        ctx.restore(snapshot);
        assert!(ctx.result.is_empty());
        assert!(ctx.item_renames.is_empty());
    }
}
