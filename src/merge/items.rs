//! Item-kind dispatch: classifies right items against the result schema
//! and merges every non-class kind with its attribute policy table.

use super::context::{MergeContext, Scope};
use super::policy::{adopt_right, adopt_right_option, immutable, ordered_union, preserve_left};
use super::{Issue, IssueCode, MergeError};
use crate::schema::{
    fold, same_name, Constant, Enumeration, Format, InvertedUnit, ItemId, ItemKey, ItemKind,
    Phenomenon, PropertyCategory, QuantitySpecification, SchemaItem, Unit, UnitSystem,
};
use std::collections::HashSet;
use tracing::debug;

/// What happens to one right item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ItemPlan {
    /// Merged into the result item at `left`.
    Pair { right: usize, left: usize },
    /// Added to the result under `name`.
    Add { right: usize, name: String },
}

impl ItemPlan {
    pub(crate) fn right(&self) -> usize {
        match self {
            ItemPlan::Pair { right, .. } | ItemPlan::Add { right, .. } => *right,
        }
    }
}

impl MergeContext<'_> {
    /// Matches every right item by name before any content is merged.
    pub(crate) fn plan_items(&mut self, scope: Scope) -> Result<Vec<ItemPlan>, MergeError> {
        let right_graph = self.right;
        let right = right_graph.at(scope.right);
        let mut taken: HashSet<String> = self.taken_item_names(scope).into_iter().collect();
        taken.extend(right.items().iter().map(|item| fold(item.name())));

        let mut plans = Vec::with_capacity(right.items().len());
        for (index, item) in right.items().iter().enumerate() {
            let result = self.result.at(scope.result);
            let Some(left) = result.item_position(item.name()) else {
                plans.push(ItemPlan::Add {
                    right: index,
                    name: item.name().to_string(),
                });
                continue;
            };

            let existing = &result.items()[left];
            if existing.kind() == item.kind() {
                plans.push(ItemPlan::Pair { right: index, left });
                continue;
            }
            if existing.kind().is_class() && item.kind().is_class() {
                return Err(MergeError::ClassTypeMismatch {
                    schema: result.name.clone(),
                    class: existing.name().to_string(),
                });
            }
            if !self.options.rename_schema_item_on_conflict {
                return Err(MergeError::NamedItemExists {
                    schema: result.name.clone(),
                    item: existing.name().to_string(),
                    version: result.version,
                });
            }

            let mut name = format!("{}_", item.name());
            while taken.contains(&fold(&name)) {
                name.push('_');
            }
            taken.insert(fold(&name));
            let message = format!(
                "{} {}:{} was renamed to {} because {} {}:{} already exists.",
                item.kind(),
                result.name,
                item.name(),
                name,
                existing.kind(),
                result.name,
                existing.name()
            );
            self.item_renames
                .insert(ItemKey::new(&right.name, item.name()), name.clone());
            self.issues.report(Issue::warning(IssueCode::ItemRenamed, message));
            plans.push(ItemPlan::Add { right: index, name });
        }
        Ok(plans)
    }

    /// Merges or adds every non-class item in right's order.
    pub(crate) fn merge_plain_items(&mut self, scope: Scope, plans: &[ItemPlan]) -> Result<(), MergeError> {
        for plan in plans {
            let right_graph = self.right;
            let source = &right_graph.at(scope.right).items()[plan.right()];
            if source.kind().is_class() {
                continue;
            }
            let mut item = self.translate_item(scope, source);
            match plan {
                ItemPlan::Add { name, .. } => {
                    item.set_name(name.as_str());
                    debug!(schema = %self.schema_name(scope), item = %name, kind = %item.kind(), "adding item");
                    self.result.at_mut(scope.result).push_item(item);
                }
                ItemPlan::Pair { left, .. } => {
                    let id = ItemId {
                        schema: scope.result,
                        item: *left,
                    };
                    self.merge_item(id, &item)?;
                }
            }
        }
        Ok(())
    }

    fn merge_item(&mut self, id: ItemId, right: &SchemaItem) -> Result<(), MergeError> {
        let Some(mut merged) = self.result.item(id).cloned() else {
            return Ok(());
        };
        let schema = self.result.at(id.schema).name.clone();
        debug!(item = %self.result.qualified_name(id), kind = %merged.kind(), "merging item");

        match (&mut merged, right) {
            (SchemaItem::Enumeration(l), SchemaItem::Enumeration(r)) => {
                merge_enumeration(&schema, l, r)?
            }
            (SchemaItem::PropertyCategory(l), SchemaItem::PropertyCategory(r)) => {
                merge_category(l, r)
            }
            (SchemaItem::Phenomenon(l), SchemaItem::Phenomenon(r)) => {
                merge_phenomenon(&schema, l, r)?
            }
            (SchemaItem::UnitSystem(l), SchemaItem::UnitSystem(r)) => merge_unit_system(l, r),
            (SchemaItem::Unit(l), SchemaItem::Unit(r)) => self.merge_unit(id, l, r)?,
            (SchemaItem::Constant(l), SchemaItem::Constant(r)) => self.merge_constant(id, l, r)?,
            (SchemaItem::InvertedUnit(l), SchemaItem::InvertedUnit(r)) => {
                self.merge_inverted_unit(id, l, r)?
            }
            (SchemaItem::Format(l), SchemaItem::Format(r)) => merge_format(l, r),
            (SchemaItem::QuantitySpecification(l), SchemaItem::QuantitySpecification(r)) => {
                self.merge_quantity_specification(id, l, r)
            }
            // kinds were matched while planning
            _ => return Ok(()),
        }

        if let Some(slot) = self.result.item_mut(id) {
            *slot = merged;
        }
        Ok(())
    }

    fn merge_unit(&self, id: ItemId, l: &mut Unit, r: &Unit) -> Result<(), MergeError> {
        let changed = |field| unit_changed(ItemKind::Unit, &self.result.at(id.schema).name, &l.name, field);
        if !self.same_target(id.schema, &l.phenomenon, &r.phenomenon) {
            return Err(changed("Phenomenon"));
        }
        if !self.same_target(id.schema, &l.unit_system, &r.unit_system) {
            return Err(changed("UnitSystem"));
        }
        immutable(&l.definition, &r.definition, || changed("Definition"))?;
        immutable(&l.numerator(), &r.numerator(), || changed("Numerator"))?;
        immutable(&l.denominator(), &r.denominator(), || changed("Denominator"))?;
        immutable(&l.offset(), &r.offset(), || changed("Offset"))?;
        preserve_left(&mut l.display_label, &r.display_label);
        preserve_left(&mut l.description, &r.description);
        Ok(())
    }

    fn merge_constant(&self, id: ItemId, l: &mut Constant, r: &Constant) -> Result<(), MergeError> {
        let changed =
            |field| unit_changed(ItemKind::Constant, &self.result.at(id.schema).name, &l.name, field);
        if !self.same_target(id.schema, &l.phenomenon, &r.phenomenon) {
            return Err(changed("Phenomenon"));
        }
        immutable(&l.definition, &r.definition, || changed("Definition"))?;
        immutable(&l.numerator(), &r.numerator(), || changed("Numerator"))?;
        immutable(&l.denominator(), &r.denominator(), || changed("Denominator"))?;
        preserve_left(&mut l.display_label, &r.display_label);
        preserve_left(&mut l.description, &r.description);
        Ok(())
    }

    fn merge_inverted_unit(&self, id: ItemId, l: &mut InvertedUnit, r: &InvertedUnit) -> Result<(), MergeError> {
        let changed = |field| {
            unit_changed(ItemKind::InvertedUnit, &self.result.at(id.schema).name, &l.name, field)
        };
        if !self.same_target(id.schema, &l.inverts_unit, &r.inverts_unit) {
            return Err(changed("InvertsUnit"));
        }
        if !self.same_target(id.schema, &l.unit_system, &r.unit_system) {
            return Err(changed("UnitSystem"));
        }
        preserve_left(&mut l.display_label, &r.display_label);
        preserve_left(&mut l.description, &r.description);
        Ok(())
    }

    fn merge_quantity_specification(&self, id: ItemId, l: &mut QuantitySpecification, r: &QuantitySpecification) {
        preserve_left(&mut l.display_label, &r.display_label);
        preserve_left(&mut l.description, &r.description);
        adopt_right(&mut l.persistence_unit, &r.persistence_unit);
        adopt_right(&mut l.relative_error, &r.relative_error);
        ordered_union(&mut l.presentation_formats, &r.presentation_formats, |a, b| {
            self.same_target(id.schema, &a.format, &b.format)
        });
    }
}

fn unit_changed(kind: ItemKind, schema: &str, item: &str, field: &'static str) -> MergeError {
    MergeError::UnitDefinitionChanged {
        kind,
        schema: schema.to_string(),
        item: item.to_string(),
        field,
    }
}

fn merge_enumeration(schema: &str, l: &mut Enumeration, r: &Enumeration) -> Result<(), MergeError> {
    immutable(&l.backing_type, &r.backing_type, || MergeError::EnumerationTypeChanged {
        schema: schema.to_string(),
        enumeration: l.name.clone(),
    })?;
    preserve_left(&mut l.display_label, &r.display_label);
    preserve_left(&mut l.description, &r.description);

    for enumerator in &r.enumerators {
        match l.enumerators.iter_mut().find(|e| same_name(&e.name, &enumerator.name)) {
            Some(existing) => {
                adopt_right(&mut existing.value, &enumerator.value);
                preserve_left(&mut existing.display_label, &enumerator.display_label);
                preserve_left(&mut existing.description, &enumerator.description);
            }
            None => l.enumerators.push(enumerator.clone()),
        }
    }

    for (i, enumerator) in l.enumerators.iter().enumerate() {
        if l.enumerators[..i].iter().any(|e| e.value == enumerator.value) {
            return Err(MergeError::DuplicateEnumeratorValue {
                schema: schema.to_string(),
                enumeration: l.name.clone(),
                enumerator: enumerator.name.clone(),
            });
        }
    }
    Ok(())
}

fn merge_category(l: &mut PropertyCategory, r: &PropertyCategory) {
    preserve_left(&mut l.display_label, &r.display_label);
    preserve_left(&mut l.description, &r.description);
    adopt_right(&mut l.priority, &r.priority);
}

fn merge_phenomenon(schema: &str, l: &mut Phenomenon, r: &Phenomenon) -> Result<(), MergeError> {
    immutable(&l.definition, &r.definition, || {
        unit_changed(ItemKind::Phenomenon, schema, &l.name, "Definition")
    })?;
    preserve_left(&mut l.display_label, &r.display_label);
    preserve_left(&mut l.description, &r.description);
    Ok(())
}

fn merge_unit_system(l: &mut UnitSystem, r: &UnitSystem) {
    preserve_left(&mut l.display_label, &r.display_label);
    preserve_left(&mut l.description, &r.description);
}

fn merge_format(l: &mut Format, r: &Format) {
    preserve_left(&mut l.display_label, &r.display_label);
    preserve_left(&mut l.description, &r.description);
    adopt_right(&mut l.numeric, &r.numeric);
    adopt_right_option(&mut l.composite, &r.composite);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumerationType, Enumerator, EnumeratorValue};

    fn enumeration(backing_type: EnumerationType, enumerators: &[(&str, i64, &str)]) -> Enumeration {
        Enumeration {
            name: "Colors".to_string(),
            display_label: String::new(),
            description: String::new(),
            backing_type,
            strict: true,
            enumerators: enumerators
                .iter()
                .map(|(name, value, label)| Enumerator {
                    name: name.to_string(),
                    value: EnumeratorValue::Integer(*value),
                    display_label: label.to_string(),
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_enumerator_value_adopts_right_and_label_preserves_left() {
        let mut left = enumeration(EnumerationType::Int, &[("Red", 1, "Left red")]);
        let right = enumeration(EnumerationType::Int, &[("Red", 10, "Right red"), ("Blue", 2, "")]);
        merge_enumeration("S", &mut left, &right).unwrap();

        assert_eq!(left.enumerators.len(), 2);
        assert_eq!(left.enumerators[0].value, EnumeratorValue::Integer(10));
        assert_eq!(left.enumerators[0].display_label, "Left red");
        assert_eq!(left.enumerators[1].name, "Blue");
    }

    #[test]
    fn test_enumeration_type_change_is_rejected() {
        let mut left = enumeration(EnumerationType::Int, &[]);
        let right = enumeration(EnumerationType::String, &[]);
        let err = merge_enumeration("S", &mut left, &right).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Enumeration 'S:Colors' has its Type changed. This is not supported."
        );
    }

    #[test]
    fn test_duplicate_enumerator_value_names_the_later_enumerator() {
        let mut left = enumeration(EnumerationType::Int, &[("Red", 1, ""), ("Blue", 2, "")]);
        let right = enumeration(EnumerationType::Int, &[("Green", 2, "")]);
        let err = merge_enumeration("S", &mut left, &right).unwrap_err();
        assert!(matches!(
            err,
            MergeError::DuplicateEnumeratorValue { ref enumerator, .. } if enumerator == "Green"
        ));
    }

    #[test]
    fn test_category_priority_adopts_right() {
        let mut left = PropertyCategory {
            name: "Cat".to_string(),
            display_label: "Left".to_string(),
            description: String::new(),
            priority: 1,
        };
        let right = PropertyCategory {
            name: "Cat".to_string(),
            display_label: "Right".to_string(),
            description: "from right".to_string(),
            priority: 5,
        };
        merge_category(&mut left, &right);
        assert_eq!(left.priority, 5);
        assert_eq!(left.display_label, "Left");
        assert_eq!(left.description, "from right");
    }
}
