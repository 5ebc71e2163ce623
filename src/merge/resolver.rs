//! Pairs schemas across the two sides and orders the work so that every
//! schema is handled after the schemas it references.

use super::{Issue, IssueCode, IssueSink, MergeError, MergeOptions};
use crate::schema::{fold, same_name, Schema, SchemaGraph, SchemaLocator};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Which side(s) supply a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pairing {
    LeftOnly,
    RightOnly,
    Both,
}

/// One schema identity to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkItem {
    /// Left spelling when the left side has the schema, else right's.
    pub name: String,
    pub pairing: Pairing,
}

/// Both sides in dependency order plus the combined worklist.
#[derive(Debug, Clone)]
pub(crate) struct Resolution {
    pub left: SchemaGraph,
    pub right: SchemaGraph,
    pub worklist: Vec<WorkItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Validates, completes and orders both inputs.
///
/// Duplicate names and reference cycles are fatal; they come back as
/// errors for the caller to report. Unlocatable references only warn.
pub(crate) fn resolve(
    left: &[Schema],
    right: &[Schema],
    options: &MergeOptions,
    left_locator: Option<&dyn SchemaLocator>,
    right_locator: Option<&dyn SchemaLocator>,
    issues: &mut IssueSink<'_>,
) -> Result<Resolution, Vec<MergeError>> {
    let left = collect_side(left, Side::Left, options, left_locator, issues);
    let right = collect_side(right, Side::Right, options, right_locator, issues);
    let (left, right) = match (left, right) {
        (Ok(l), Ok(r)) => (l, r),
        (l, r) => {
            let mut errors = l.err().unwrap_or_default();
            errors.extend(r.err().unwrap_or_default());
            return Err(errors);
        }
    };

    let left = SchemaGraph::from_schemas(sort_side(left).map_err(|e| vec![e])?);
    let right = SchemaGraph::from_schemas(sort_side(right).map_err(|e| vec![e])?);
    let worklist = pair(&left, &right).map_err(|e| vec![e])?;

    Ok(Resolution {
        left,
        right,
        worklist,
    })
}

/// Drops tolerated duplicates, rejects the rest, and pulls in referenced
/// schemas that were not supplied.
fn collect_side(
    schemas: &[Schema],
    side: Side,
    options: &MergeOptions,
    locator: Option<&dyn SchemaLocator>,
    issues: &mut IssueSink<'_>,
) -> Result<Vec<Schema>, Vec<MergeError>> {
    let mut out: Vec<Schema> = Vec::with_capacity(schemas.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut reported: HashSet<String> = HashSet::new();
    let mut errors = Vec::new();

    for schema in schemas {
        let key = fold(&schema.name);
        match positions.get(&key) {
            Some(&i) => {
                if options.pulls_references() && out[i] == *schema {
                    debug!(%side, schema = %schema.name, "dropping identical duplicate schema");
                    continue;
                }
                if reported.insert(key) {
                    errors.push(MergeError::DuplicateSchema {
                        name: schema.name.clone(),
                    });
                }
            }
            None => {
                positions.insert(key, out.len());
                out.push(schema.clone());
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    if options.pulls_references() {
        let mut missing: HashSet<String> = HashSet::new();
        let mut next = 0;
        while next < out.len() {
            let from = out[next].name.clone();
            let references = out[next].references.clone();
            next += 1;

            for reference in references {
                let key = fold(&reference.name);
                if positions.contains_key(&key) || missing.contains(&key) {
                    continue;
                }
                let located = locator
                    .and_then(|l| l.locate(&reference.name, reference.version))
                    .filter(|s| same_name(&s.name, &reference.name));
                match located {
                    Some(schema) => {
                        debug!(%side, schema = %schema.full_name(), referenced_by = %from, "pulled in referenced schema");
                        positions.insert(key, out.len());
                        out.push(schema);
                    }
                    None => {
                        missing.insert(key);
                        issues.report(Issue::warning(
                            IssueCode::MissingSchemaReference,
                            format!(
                                "Schema '{}' referenced by '{}' on the {} side was not supplied and could not be located.",
                                reference.name, from, side
                            ),
                        ));
                    }
                }
            }
        }
    }

    Ok(out)
}

fn sort_side(schemas: Vec<Schema>) -> Result<Vec<Schema>, MergeError> {
    let positions: HashMap<String, usize> = schemas
        .iter()
        .enumerate()
        .map(|(i, s)| (fold(&s.name), i))
        .collect();
    let deps: Vec<Vec<usize>> = schemas
        .iter()
        .map(|s| dependencies(&positions, s.references.iter().map(|r| r.name.as_str())))
        .collect();

    let order = topological_order(&deps).map_err(|i| MergeError::ReferenceCycle {
        name: schemas[i].name.clone(),
    })?;

    let mut slots: Vec<Option<Schema>> = schemas.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Classifies every schema identity and orders the union of both sides.
fn pair(left: &SchemaGraph, right: &SchemaGraph) -> Result<Vec<WorkItem>, MergeError> {
    let mut names: Vec<String> = left.iter().map(|s| s.name.clone()).collect();
    names.extend(
        right
            .iter()
            .filter(|s| !left.contains(&s.name))
            .map(|s| s.name.clone()),
    );
    let positions: HashMap<String, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (fold(n), i))
        .collect();

    let deps: Vec<Vec<usize>> = names
        .iter()
        .map(|name| {
            let refs = left
                .get(name)
                .into_iter()
                .chain(right.get(name))
                .flat_map(|s| s.references.iter().map(|r| r.name.as_str()));
            dependencies(&positions, refs)
        })
        .collect();

    let order = topological_order(&deps).map_err(|i| MergeError::ReferenceCycle {
        name: names[i].clone(),
    })?;

    Ok(order
        .into_iter()
        .map(|i| {
            let name = names[i].clone();
            let pairing = match (left.contains(&name), right.contains(&name)) {
                (true, true) => Pairing::Both,
                (true, false) => Pairing::LeftOnly,
                _ => Pairing::RightOnly,
            };
            WorkItem { name, pairing }
        })
        .collect())
}

fn dependencies<'a>(
    positions: &HashMap<String, usize>,
    references: impl Iterator<Item = &'a str>,
) -> Vec<usize> {
    let mut deps: Vec<usize> = references
        .filter_map(|name| positions.get(&fold(name)).copied())
        .collect();
    deps.sort_unstable();
    deps.dedup();
    deps
}

/// Kahn's algorithm over `deps[node] = nodes it depends on`.
///
/// Among ready nodes the lowest index goes first, so independent nodes keep
/// their input order. On a cycle, returns one node that is part of it or
/// blocked by it.
fn topological_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, usize> {
    let count = deps.len();
    let mut pending: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (node, ds) in deps.iter().enumerate() {
        for &d in ds {
            dependents[d].push(node);
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&n| pending[n] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &m in &dependents[node] {
            pending[m] -= 1;
            if pending[m] == 0 {
                ready.insert(m);
            }
        }
    }

    if order.len() < count {
        let placed: HashSet<usize> = order.iter().copied().collect();
        return Err((0..count).find(|n| !placed.contains(n)).unwrap_or(0));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaCache, SchemaRef, Version};

    fn schema(name: &str, refs: &[&str]) -> Schema {
        let mut s = Schema::new(name, name.to_lowercase(), Version::new(1, 0, 0));
        s.references = refs
            .iter()
            .map(|r| SchemaRef::new(*r, Version::new(1, 0, 0)))
            .collect();
        s
    }

    fn names(graph: &SchemaGraph) -> Vec<&str> {
        graph.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_topological_order_keeps_input_order_for_independent_nodes() {
        assert_eq!(topological_order(&[vec![], vec![], vec![]]), Ok(vec![0, 1, 2]));
        assert_eq!(topological_order(&[vec![2], vec![], vec![1]]), Ok(vec![1, 2, 0]));
        assert!(topological_order(&[vec![1], vec![0]]).is_err());
    }

    #[test]
    fn test_sides_are_sorted_by_reference() {
        let options = MergeOptions::default();
        let mut sink = IssueSink::new(None);
        let left = vec![schema("Top", &["Mid"]), schema("Mid", &["Base"]), schema("Base", &[])];
        let right = vec![schema("Base", &[]), schema("Extra", &["Top"])];

        let resolution = resolve(&left, &right, &options, None, None, &mut sink).unwrap();
        assert_eq!(names(&resolution.left), vec!["Base", "Mid", "Top"]);

        let work: Vec<(&str, Pairing)> = resolution
            .worklist
            .iter()
            .map(|w| (w.name.as_str(), w.pairing))
            .collect();
        assert_eq!(
            work,
            vec![
                ("Base", Pairing::Both),
                ("Mid", Pairing::LeftOnly),
                ("Top", Pairing::LeftOnly),
                ("Extra", Pairing::RightOnly),
            ]
        );
    }

    #[test]
    fn test_duplicates_are_reported_once_per_name() {
        let options = MergeOptions::default().with_do_not_merge_references(true);
        let mut sink = IssueSink::new(None);
        let left = vec![schema("A", &[]), schema("a", &[]), schema("A", &[])];
        let errors = resolve(&left, &[], &options, None, None, &mut sink).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "The schema list contains the schema 'a' more than once."
        );
    }

    #[test]
    fn test_identical_duplicates_tolerated_when_pulling_references() {
        let options = MergeOptions::default();
        let mut sink = IssueSink::new(None);
        let left = vec![schema("A", &[]), schema("A", &[])];
        let resolution = resolve(&left, &[], &options, None, None, &mut sink).unwrap();
        assert_eq!(resolution.left.len(), 1);

        let mut different = schema("A", &[]);
        different.description = "changed".to_string();
        let left = vec![schema("A", &[]), different];
        assert!(resolve(&left, &[], &options, None, None, &mut sink).is_err());
    }

    #[test]
    fn test_missing_references_are_pulled_or_warned() {
        let options = MergeOptions::default();
        let mut sink = IssueSink::new(None);
        let cache: SchemaCache = vec![schema("Base", &[])].into_iter().collect();
        let left = vec![schema("Top", &["Base", "Gone"])];

        let resolution = resolve(&left, &[], &options, Some(&cache), None, &mut sink).unwrap();
        assert_eq!(names(&resolution.left), vec!["Base", "Top"]);

        let issues = sink.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.iter().next().unwrap().code, IssueCode::MissingSchemaReference);
    }

    #[test]
    fn test_no_pulling_when_references_are_not_merged() {
        let options = MergeOptions::default().with_do_not_merge_references(true);
        let mut sink = IssueSink::new(None);
        let cache: SchemaCache = vec![schema("Base", &[])].into_iter().collect();
        let left = vec![schema("Top", &["Base"])];
        let resolution = resolve(&left, &[], &options, Some(&cache), None, &mut sink).unwrap();
        assert_eq!(names(&resolution.left), vec!["Top"]);
        assert!(sink.into_issues().is_empty());
    }

    #[test]
    fn test_cross_side_reference_cycle_is_an_error() {
        let options = MergeOptions::default();
        let mut sink = IssueSink::new(None);
        let left = vec![schema("A", &["B"]), schema("B", &[])];
        let right = vec![schema("A", &[]), schema("B", &["A"])];
        let errors = resolve(&left, &right, &options, None, None, &mut sink).unwrap_err();
        assert!(matches!(errors[0], MergeError::ReferenceCycle { .. }));
    }
}
