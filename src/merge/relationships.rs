//! Relationship strength and constraint merge, plus the constraint checks
//! applied to every relationship the merge touched.

use super::context::{MergeContext, Scope};
use super::items::ItemPlan;
use super::policy::{ordered_union, preserve_left};
use super::{Issue, IssueCode, MergeError};
use crate::schema::{
    ClassGraph, Constraint, ConstraintEnd, ItemId, ItemRef, RelationshipClass, SchemaItem,
};
use tracing::debug;

const ENDS: [ConstraintEnd; 2] = [ConstraintEnd::Source, ConstraintEnd::Target];

impl MergeContext<'_> {
    /// Merges paired relationships and validates every relationship that
    /// came from the right side.
    pub(crate) fn merge_relationships(&mut self, scope: Scope, plans: &[ItemPlan]) -> Result<(), MergeError> {
        let right_graph = self.right;
        for plan in plans {
            let source = &right_graph.at(scope.right).items()[plan.right()];
            if source.as_relationship().is_none() {
                continue;
            }
            let position = match plan {
                ItemPlan::Pair { left, .. } => Some(*left),
                ItemPlan::Add { name, .. } => self.result.at(scope.result).item_position(name),
            };
            let Some(item) = position else {
                continue;
            };
            let id = ItemId {
                schema: scope.result,
                item,
            };

            if let ItemPlan::Pair { .. } = plan {
                if let SchemaItem::Relationship(right) = self.translate_item(scope, source) {
                    self.merge_relationship(id, &right)?;
                }
            }
            self.check_relationship(id)?;
        }
        Ok(())
    }

    fn merge_relationship(&mut self, id: ItemId, right: &RelationshipClass) -> Result<(), MergeError> {
        let Some(mut merged) = self.result.item(id).and_then(SchemaItem::as_relationship).cloned() else {
            return Ok(());
        };
        debug!(relationship = %self.result.qualified_name(id), "merging relationship constraints");
        let graph = self.class_graph();

        // strength, multiplicity and polymorphism stay as on the left
        for end in ENDS {
            let mut constraint = merged.constraint(end).clone();
            self.merge_constraint(id, &mut constraint, right.constraint(end), &graph)?;
            *merged.constraint_mut(end) = constraint;
        }

        if let Some(SchemaItem::Relationship(slot)) = self.result.item_mut(id) {
            *slot = merged;
        }
        Ok(())
    }

    fn merge_constraint(
        &self,
        id: ItemId,
        left: &mut Constraint,
        right: &Constraint,
        graph: &ClassGraph,
    ) -> Result<(), MergeError> {
        preserve_left(&mut left.role_label, &right.role_label);

        let mut classes = left.classes.clone();
        ordered_union(&mut classes, &right.classes, |a, b| self.same_target(id.schema, a, b));
        left.classes = self.minimize_refs(id.schema, &classes, graph);

        left.abstract_constraint = self.merge_abstract_constraint(
            id,
            left.abstract_constraint.take(),
            right.abstract_constraint.clone(),
            &left.classes,
            graph,
        )?;
        Ok(())
    }

    /// Picks the abstract constraint of a merged end.
    ///
    /// A missing side takes the other one. When both are set, the more
    /// general class wins if one derives from the other; unrelated classes
    /// are only accepted when one of them still covers every concrete
    /// class.
    fn merge_abstract_constraint(
        &self,
        id: ItemId,
        left: Option<ItemRef>,
        right: Option<ItemRef>,
        classes: &[ItemRef],
        graph: &ClassGraph,
    ) -> Result<Option<ItemRef>, MergeError> {
        let (left, right) = match (left, right) {
            (None, right) => return Ok(right),
            (left, None) => return Ok(left),
            (Some(l), Some(r)) => (l, r),
        };

        let conflict = |constraint: String| MergeError::AbstractConstraintConflict {
            schema: self.result.at(id.schema).name.clone(),
            class: self.item_name(id),
            constraint,
        };
        let (Some(l), Some(r)) = (
            self.result.resolve(id.schema, &left),
            self.result.resolve(id.schema, &right),
        ) else {
            return if left.same_as(&right) {
                Ok(Some(left))
            } else {
                Err(conflict(right.to_string()))
            };
        };

        if l == r || graph.is_ancestor(l, r) {
            return Ok(Some(left));
        }
        if graph.is_ancestor(r, l) {
            return Ok(Some(right));
        }
        let covers = |candidate: ItemId| {
            classes.iter().all(|c| match self.result.resolve(id.schema, c) {
                Some(c) => graph.is_ancestor_or_self(candidate, c),
                None => false,
            })
        };
        if covers(r) {
            Ok(Some(right))
        } else if covers(l) {
            Ok(Some(left))
        } else {
            Err(conflict(self.result.qualified_name(r)))
        }
    }

    fn check_relationship(&mut self, id: ItemId) -> Result<(), MergeError> {
        let Some(relationship) = self.result.item(id).and_then(SchemaItem::as_relationship).cloned() else {
            return Ok(());
        };
        let graph = self.class_graph();
        let base = self.base_relationship(id, &graph);

        if let Some((base_id, base)) = &base {
            if base.strength != relationship.strength {
                let err = MergeError::StrengthMismatch {
                    schema: self.result.at(id.schema).name.clone(),
                    class: self.item_name(id),
                    strength: relationship.strength,
                    base: self.result.qualified_name(*base_id),
                    base_strength: base.strength,
                };
                if !self.options.ignore_strength_change_problems {
                    return Err(err);
                }
                self.issues
                    .report(Issue::warning(IssueCode::StrengthMismatchIgnored, err.to_string()));
            }
        }

        for end in ENDS {
            let problems = self.constraint_problems(id, &relationship, end, base.as_ref(), &graph);
            for problem in problems {
                if !self.options.skip_validation {
                    return Err(problem);
                }
                self.issues.report(Issue::warning(
                    IssueCode::ConstraintValidationSkipped,
                    problem.to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Nearest ancestor that is itself a relationship.
    fn base_relationship(&self, id: ItemId, graph: &ClassGraph) -> Option<(ItemId, RelationshipClass)> {
        graph.ancestors(id).into_iter().find_map(|(ancestor, _)| {
            self.result
                .item(ancestor)
                .and_then(SchemaItem::as_relationship)
                .map(|r| (ancestor, r.clone()))
        })
    }

    fn constraint_problems(
        &self,
        id: ItemId,
        relationship: &RelationshipClass,
        end: ConstraintEnd,
        base: Option<&(ItemId, RelationshipClass)>,
        graph: &ClassGraph,
    ) -> Vec<MergeError> {
        let schema = self.result.at(id.schema).name.clone();
        let class = self.item_name(id);
        let constraint = relationship.constraint(end);
        let members: Vec<(&ItemRef, Option<ItemId>)> = constraint
            .classes
            .iter()
            .map(|c| (c, self.result.resolve(id.schema, c)))
            .collect();
        let mut problems = Vec::new();

        match &constraint.abstract_constraint {
            Some(abstract_ref) => {
                if let Some(abstract_id) = self.result.resolve(id.schema, abstract_ref) {
                    for (member, member_id) in &members {
                        let Some(member_id) = member_id else {
                            continue;
                        };
                        if !graph.is_ancestor_or_self(abstract_id, *member_id) {
                            problems.push(MergeError::AbstractConstraintNotBase {
                                schema: schema.clone(),
                                class: class.clone(),
                                end,
                                constraint: abstract_ref.to_string(),
                                member: member.to_string(),
                            });
                        }
                    }
                }
            }
            None if constraint.classes.len() > 1 => {
                problems.push(MergeError::MissingAbstractConstraint {
                    schema: schema.clone(),
                    class: class.clone(),
                    end,
                });
            }
            None => {}
        }

        if let Some((base_id, base)) = base {
            let base_constraint = base.constraint(end);
            let root = match (&base_constraint.abstract_constraint, base_constraint.classes.as_slice()) {
                (Some(r), _) => Some(r),
                (None, [single]) => Some(single),
                _ => None,
            };
            if let Some(root_id) = root.and_then(|r| self.result.resolve(base_id.schema, r)) {
                for (member, member_id) in &members {
                    let Some(member_id) = member_id else {
                        continue;
                    };
                    if !graph.is_ancestor_or_self(root_id, *member_id) {
                        problems.push(MergeError::ConstraintNotNarrowed {
                            schema: schema.clone(),
                            class: class.clone(),
                            end,
                            member: member.to_string(),
                            base: self.result.qualified_name(*base_id),
                        });
                    }
                }
            }
        }
        problems
    }
}
