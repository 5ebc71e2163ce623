//! SchemaMerger is the merge orchestrator.

use super::context::{MergeContext, Scope};
use super::items::ItemPlan;
use super::resolver::{self, Pairing, WorkItem};
use super::{Issue, IssueCode, IssueListener, IssueSink, MergeError, MergeOptions, MergeResult};
use crate::schema::{fold, Schema, SchemaGraph, SchemaLocator};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// SchemaMergerBuilder is a builder for creating a SchemaMerger.
#[derive(Default)]
pub struct SchemaMergerBuilder {
    options: MergeOptions,
    listener: Option<Box<dyn IssueListener>>,
    left_locator: Option<Box<dyn SchemaLocator>>,
    right_locator: Option<Box<dyn SchemaLocator>>,
}

impl SchemaMergerBuilder {
    /// Creates a new SchemaMergerBuilder.
    pub fn new() -> Self {
        SchemaMergerBuilder::default()
    }

    /// Sets the merge options.
    pub fn options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the listener that receives every issue as it is raised.
    pub fn listener(mut self, listener: Box<dyn IssueListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets where missing references of left schemas are looked up.
    pub fn left_locator(mut self, locator: Box<dyn SchemaLocator>) -> Self {
        self.left_locator = Some(locator);
        self
    }

    /// Sets where missing references of right schemas are looked up.
    pub fn right_locator(mut self, locator: Box<dyn SchemaLocator>) -> Self {
        self.right_locator = Some(locator);
        self
    }

    /// Builds the SchemaMerger.
    pub fn build(self) -> SchemaMerger {
        SchemaMerger {
            options: self.options,
            listener: self.listener,
            left_locator: self.left_locator,
            right_locator: self.right_locator,
        }
    }
}

/// SchemaMerger merges a right (incoming) set of schemas into a left
/// (existing) one.
///
/// Inputs are never modified. Each call works on its own copy, so one
/// merger can be reused for any number of merges.
pub struct SchemaMerger {
    options: MergeOptions,
    listener: Option<Box<dyn IssueListener>>,
    left_locator: Option<Box<dyn SchemaLocator>>,
    right_locator: Option<Box<dyn SchemaLocator>>,
}

impl SchemaMerger {
    /// Creates a new SchemaMergerBuilder.
    pub fn builder() -> SchemaMergerBuilder {
        SchemaMergerBuilder::new()
    }

    /// Creates a merger with the given options and no listener or locators.
    pub fn new(options: MergeOptions) -> Self {
        SchemaMerger::builder().options(options).build()
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merges `right` into `left`.
    ///
    /// Duplicate schema names and reference cycles abort the whole call
    /// with an empty result graph. Any other hard error only drops the
    /// schema it occurred in, and the schemas referencing it.
    pub fn merge(&self, left: &[Schema], right: &[Schema]) -> MergeResult {
        let mut issues = IssueSink::new(self.listener.as_deref());
        debug!(left = left.len(), right = right.len(), options = ?self.options, "starting schema merge");

        let resolution = match resolver::resolve(
            left,
            right,
            &self.options,
            self.left_locator.as_deref(),
            self.right_locator.as_deref(),
            &mut issues,
        ) {
            Ok(resolution) => resolution,
            Err(errors) => {
                for err in &errors {
                    issues.report(err.to_issue());
                }
                return MergeResult::new(issues.status(), SchemaGraph::new(), HashSet::new(), issues.into_issues());
            }
        };

        let mut ctx = MergeContext::new(
            &self.options,
            &resolution.right,
            resolution.left.clone(),
            issues,
        );
        let mut failed: HashSet<String> = HashSet::new();

        for work in &resolution.worklist {
            if let Some(dependency) = failed_dependency(work, &resolution.left, &resolution.right, &failed) {
                ctx.issues.report(Issue::warning(
                    IssueCode::SchemaSkipped,
                    format!(
                        "Schema '{}' was dropped because the schema '{}' it references failed to merge.",
                        work.name, dependency
                    ),
                ));
                ctx.result.remove(&work.name);
                failed.insert(fold(&work.name));
                continue;
            }

            let outcome = match work.pairing {
                Pairing::LeftOnly => {
                    debug!(schema = %work.name, "keeping left-only schema");
                    continue;
                }
                Pairing::Both | Pairing::RightOnly => {
                    let snapshot = ctx.snapshot();
                    let outcome = if work.pairing == Pairing::Both {
                        ctx.merge_pair(&work.name)
                    } else {
                        ctx.copy_right_only(&work.name)
                    };
                    if outcome.is_err() {
                        ctx.restore(snapshot);
                    }
                    outcome
                }
            };

            match outcome {
                Ok(()) => info!(schema = %work.name, pairing = ?work.pairing, "merged schema"),
                Err(err) => {
                    debug!(schema = %work.name, "rolled back failed schema");
                    ctx.issues.report(err.to_issue());
                    ctx.result.remove(&work.name);
                    failed.insert(fold(&work.name));
                }
            }
        }

        let order: Vec<String> = resolution.worklist.iter().map(|w| w.name.clone()).collect();
        ctx.result.reorder(&order);

        let modified: HashSet<String> = resolution
            .left
            .iter()
            .filter(|original| {
                ctx.result
                    .get(&original.name)
                    .is_some_and(|merged| merged != *original)
            })
            .map(|original| fold(&original.name))
            .collect();

        let MergeContext { result, issues, .. } = ctx;
        let status = issues.status();
        info!(%status, schemas = result.len(), modified = modified.len(), "schema merge finished");
        MergeResult::new(status, result, modified, issues.into_issues())
    }
}

/// Merges `right` into `left` with the given options.
pub fn merge_schemas(left: &[Schema], right: &[Schema], options: MergeOptions) -> MergeResult {
    SchemaMerger::new(options).merge(left, right)
}

/// First reference of `work`, on either side, that failed to merge.
fn failed_dependency(
    work: &WorkItem,
    left: &SchemaGraph,
    right: &SchemaGraph,
    failed: &HashSet<String>,
) -> Option<String> {
    left.get(&work.name)
        .into_iter()
        .chain(right.get(&work.name))
        .flat_map(|s| s.references.iter())
        .find(|r| failed.contains(&fold(&r.name)))
        .map(|r| r.name.clone())
}

impl MergeContext<'_> {
    fn merge_pair(&mut self, name: &str) -> Result<(), MergeError> {
        let (Some(result), Some(right)) = (self.result.position(name), self.right.position(name)) else {
            return Ok(());
        };
        let scope = Scope { result, right };

        if self.options.merge_only_dynamic_schemas
            && !self.result.at(result).is_dynamic()
            && !self.right.at(right).is_dynamic()
        {
            self.issues.report(Issue::info(
                IssueCode::SchemaNotDynamic,
                format!(
                    "Schema '{}' is not dynamic on either side and was kept as it is on the left.",
                    name
                ),
            ));
            return Ok(());
        }

        debug!(schema = %name, "merging schema pair");
        self.merge_schema_header(scope);
        self.merge_schema_items(scope)
    }

    fn copy_right_only(&mut self, name: &str) -> Result<(), MergeError> {
        let Some(right) = self.right.position(name) else {
            return Ok(());
        };
        let result = self.add_schema_shell(right);
        self.merge_schema_items(Scope { result, right })
    }

    fn merge_schema_items(&mut self, scope: Scope) -> Result<(), MergeError> {
        self.check_class_cycles(scope)?;
        let plans = self.plan_items(scope)?;
        self.merge_plain_items(scope, &plans)?;
        self.merge_classes(scope, &plans)?;
        self.merge_relationships(scope, &plans)?;
        self.order_new_items(scope, &plans);
        self.fix_references(scope.result);
        Ok(())
    }

    /// New items end up after the left items, in right's order.
    fn order_new_items(&mut self, scope: Scope, plans: &[ItemPlan]) {
        let ranks: HashMap<String, usize> = plans
            .iter()
            .filter_map(|plan| match plan {
                ItemPlan::Add { right, name } => Some((fold(name), *right)),
                ItemPlan::Pair { .. } => None,
            })
            .collect();
        let items = self.result.at_mut(scope.result).items_mut();
        let first_new = items.len().saturating_sub(ranks.len());
        items[first_new..].sort_by_key(|item| ranks.get(&fold(item.name())).copied().unwrap_or(usize::MAX));
    }
}
