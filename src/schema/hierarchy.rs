//! Class inheritance as an arena of nodes with index-keyed base edges.
//!
//! A [`ClassGraph`] is a snapshot of every class in a [`SchemaGraph`]. Base
//! references that do not resolve are left out. Cycles are kept in the
//! graph; walks track visited nodes so every query below terminates, and
//! [`ClassGraph::check_acyclic`] rejects cycles one schema at a time.

use super::*;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
struct ClassNode {
    id: ItemId,
    bases: Vec<usize>,
    derived: Vec<usize>,
}

/// ClassGraph answers ancestor and descendant questions over all classes.
#[derive(Debug, Clone, Default)]
pub struct ClassGraph {
    nodes: Vec<ClassNode>,
    index: HashMap<ItemId, usize>,
}

impl ClassGraph {
    /// Snapshots the class hierarchy of `graph`.
    pub fn build(graph: &SchemaGraph) -> Self {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        for (s, schema) in graph.iter().enumerate() {
            for (i, item) in schema.items().iter().enumerate() {
                if item.as_class().is_some() {
                    let id = ItemId { schema: s, item: i };
                    index.insert(id, nodes.len());
                    nodes.push(ClassNode {
                        id,
                        bases: Vec::new(),
                        derived: Vec::new(),
                    });
                }
            }
        }

        for n in 0..nodes.len() {
            let id = nodes[n].id;
            let Some(class) = graph.class(id) else {
                continue;
            };
            for base in &class.base_classes {
                if let Some(&b) = graph.resolve(id.schema, base).and_then(|bid| index.get(&bid)) {
                    if !nodes[n].bases.contains(&b) {
                        nodes[n].bases.push(b);
                        nodes[b].derived.push(n);
                    }
                }
            }
        }

        ClassGraph { nodes, index }
    }

    /// Fails if a class of the schema at `schema` derives from itself.
    ///
    /// Cycles that stay within other schemas are not reported.
    pub fn check_acyclic(&self, graph: &SchemaGraph, schema: usize) -> Result<(), GraphError> {
        for (start, node) in self.nodes.iter().enumerate() {
            if node.id.schema == schema && self.on_cycle(start) {
                return Err(GraphError::Cycle(graph.qualified_name(node.id)));
            }
        }
        Ok(())
    }

    fn on_cycle(&self, start: usize) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &base in &self.nodes[node].bases {
                if base == start {
                    return true;
                }
                if seen.insert(base) {
                    stack.push(base);
                }
            }
        }
        false
    }

    /// Every transitive base of `id` with its distance, nearest first.
    pub fn ancestors(&self, id: ItemId) -> Vec<(ItemId, usize)> {
        self.breadth_first(id, |n| &n.bases)
    }

    /// Every transitive derived class of `id` with its distance, nearest first.
    pub fn descendants(&self, id: ItemId) -> Vec<(ItemId, usize)> {
        self.breadth_first(id, |n| &n.derived)
    }

    /// Classes that share a descendant with `id` without being related to
    /// it by inheritance, with the shortest distance through such a
    /// descendant.
    ///
    /// In a diamond `D: [B, C]`, `C` is a side branch of `B` at distance 2.
    pub fn side_branches(&self, id: ItemId) -> Vec<(ItemId, usize)> {
        let descendants = self.descendants(id);
        let mut related: HashSet<ItemId> = self
            .ancestors(id)
            .into_iter()
            .chain(descendants.iter().copied())
            .map(|(c, _)| c)
            .collect();
        related.insert(id);

        let mut out: Vec<(ItemId, usize)> = Vec::new();
        for &(derived, down) in &descendants {
            for (other, up) in self.ancestors(derived) {
                if related.contains(&other) {
                    continue;
                }
                match out.iter_mut().find(|(o, _)| *o == other) {
                    Some(entry) => entry.1 = entry.1.min(down + up),
                    None => out.push((other, down + up)),
                }
            }
        }
        out
    }

    fn breadth_first(
        &self,
        id: ItemId,
        edges: impl Fn(&ClassNode) -> &Vec<usize>,
    ) -> Vec<(ItemId, usize)> {
        let Some(&start) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut out = Vec::new();
        while let Some((node, depth)) = queue.pop_front() {
            for &next in edges(&self.nodes[node]) {
                if seen.insert(next) {
                    out.push((self.nodes[next].id, depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }
        out
    }

    /// Returns true if `ancestor` is a transitive base of `id`.
    pub fn is_ancestor(&self, ancestor: ItemId, id: ItemId) -> bool {
        self.ancestors(id).iter().any(|(a, _)| *a == ancestor)
    }

    /// Returns true if `ancestor` is `id` or one of its transitive bases.
    pub fn is_ancestor_or_self(&self, ancestor: ItemId, id: ItemId) -> bool {
        ancestor == id || self.is_ancestor(ancestor, id)
    }

    /// Drops every member that is a transitive base of another member.
    ///
    /// Order of the survivors is preserved. Duplicates keep their first
    /// occurrence.
    pub fn minimize(&self, members: &[ItemId]) -> Vec<ItemId> {
        let mut out: Vec<ItemId> = Vec::with_capacity(members.len());
        for (i, m) in members.iter().enumerate() {
            if out.contains(m) {
                continue;
            }
            let redundant = members
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other != m && self.is_ancestor(*m, *other));
            if !redundant {
                out.push(*m);
            }
        }
        out
    }

    /// Sorts `ids` so that every class follows the classes it derives from.
    ///
    /// Only edges between members of `ids` are considered; ties keep the
    /// input order.
    pub fn bases_first(&self, ids: &[ItemId]) -> Vec<ItemId> {
        let members: HashSet<ItemId> = ids.iter().copied().collect();
        let mut placed: HashSet<ItemId> = HashSet::new();
        let mut out = Vec::with_capacity(ids.len());
        while out.len() < ids.len() {
            let before = out.len();
            for id in ids {
                if placed.contains(id) {
                    continue;
                }
                let ready = self
                    .ancestors(*id)
                    .iter()
                    .all(|(a, _)| !members.contains(a) || placed.contains(a));
                if ready {
                    placed.insert(*id);
                    out.push(*id);
                }
            }
            if out.len() == before {
                // Unreachable for an acyclic graph; keep whatever is left in input order.
                out.extend(ids.iter().filter(|id| !placed.contains(id)));
                break;
            }
        }
        out
    }
}
