//! Ordered collections of schemas and cross-schema reference resolution.

use super::*;
use once_cell::sync::OnceCell;
use std::collections::HashMap;

/// Position of an item inside a [`SchemaGraph`].
///
/// Ids stay valid while items are only appended; reordering or removing
/// schemas or items invalidates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    pub schema: usize,
    pub item: usize,
}

/// SchemaGraph is an ordered set of schemas with unique case-insensitive
/// names.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    schemas: Vec<Schema>,
    index: OnceCell<HashMap<String, usize>>,
}

impl Clone for SchemaGraph {
    fn clone(&self) -> Self {
        SchemaGraph {
            schemas: self.schemas.clone(),
            index: OnceCell::new(),
        }
    }
}

impl PartialEq for SchemaGraph {
    fn eq(&self, other: &Self) -> bool {
        self.schemas == other.schemas
    }
}

impl SchemaGraph {
    pub fn new() -> Self {
        SchemaGraph::default()
    }

    /// Builds a graph from schemas. Later duplicates of a name are ignored
    /// by lookups.
    pub fn from_schemas(schemas: Vec<Schema>) -> Self {
        SchemaGraph {
            schemas,
            index: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter()
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn into_schemas(self) -> Vec<Schema> {
        self.schemas
    }

    /// Position of the schema called `name`, ignoring case.
    pub fn position(&self, name: &str) -> Option<usize> {
        let index = self.index.get_or_init(|| {
            let mut index = HashMap::with_capacity(self.schemas.len());
            for (i, schema) in self.schemas.iter().enumerate() {
                index.entry(fold(&schema.name)).or_insert(i);
            }
            index
        });
        index.get(&fold(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.position(name).map(|i| &self.schemas[i])
    }

    pub fn at(&self, index: usize) -> &Schema {
        &self.schemas[index]
    }

    pub fn at_mut(&mut self, index: usize) -> &mut Schema {
        &mut self.schemas[index]
    }

    /// Appends a schema and returns its position.
    pub fn push(&mut self, schema: Schema) -> usize {
        self.index.take();
        self.schemas.push(schema);
        self.schemas.len() - 1
    }

    /// Removes the schema called `name`.
    pub fn remove(&mut self, name: &str) -> Option<Schema> {
        let i = self.position(name)?;
        self.index.take();
        Some(self.schemas.remove(i))
    }

    /// Reorders the schemas so that the names in `order` come first, in
    /// that order. Schemas not named keep their relative order at the end.
    pub fn reorder(&mut self, order: &[String]) {
        let mut slots: Vec<Option<Schema>> = self.schemas.drain(..).map(Some).collect();
        let positions: HashMap<String, usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (fold(&s.name), i)))
            .collect();

        let mut ordered = Vec::with_capacity(slots.len());
        for name in order {
            if let Some(schema) = positions.get(&fold(name)).and_then(|&i| slots[i].take()) {
                ordered.push(schema);
            }
        }
        ordered.extend(slots.into_iter().flatten());

        self.schemas = ordered;
        self.index.take();
    }

    /// Resolves a schema prefix as written inside the schema at `from`.
    ///
    /// `None` means `from` itself. Otherwise the prefix may be the name or
    /// alias of `from`, the name or alias of one of its references, or the
    /// name of any schema in the graph.
    pub fn resolve_prefix(&self, from: usize, prefix: Option<&str>) -> Option<usize> {
        let source = self.schemas.get(from)?;
        let prefix = match prefix {
            None => return Some(from),
            Some(p) if source.answers_to(p) => return Some(from),
            Some(p) => p,
        };

        for reference in &source.references {
            if same_name(&reference.name, prefix)
                || (!reference.alias.is_empty() && same_name(&reference.alias, prefix))
            {
                return self.position(&reference.name);
            }
        }
        for reference in &source.references {
            if let Some(i) = self.position(&reference.name) {
                if self.schemas[i].answers_to(prefix) {
                    return Some(i);
                }
            }
        }
        self.position(prefix)
    }

    /// Resolves an item reference written inside the schema at `from`.
    pub fn resolve(&self, from: usize, r: &ItemRef) -> Option<ItemId> {
        let schema = self.resolve_prefix(from, r.schema.as_deref())?;
        let item = self.schemas[schema].item_position(&r.name)?;
        Some(ItemId { schema, item })
    }

    pub fn item(&self, id: ItemId) -> Option<&SchemaItem> {
        self.schemas.get(id.schema)?.items().get(id.item)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut SchemaItem> {
        self.schemas.get_mut(id.schema)?.items_mut().get_mut(id.item)
    }

    pub fn class(&self, id: ItemId) -> Option<&ClassDef> {
        self.item(id).and_then(SchemaItem::as_class)
    }

    pub fn class_mut(&mut self, id: ItemId) -> Option<&mut ClassDef> {
        self.item_mut(id).and_then(SchemaItem::as_class_mut)
    }

    /// `Schema:Item` with the names as they are spelled in the graph.
    pub fn qualified_name(&self, id: ItemId) -> String {
        match (self.schemas.get(id.schema), self.item(id)) {
            (Some(schema), Some(item)) => format!("{}:{}", schema.name, item.name()),
            _ => String::from("<unknown>"),
        }
    }
}

impl<'a> IntoIterator for &'a SchemaGraph {
    type Item = &'a Schema;
    type IntoIter = std::slice::Iter<'a, Schema>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.iter()
    }
}

/// SchemaLocator finds schemas that are referenced but were not supplied.
pub trait SchemaLocator {
    /// Returns the schema called `name`, preferring one that satisfies
    /// `version`.
    fn locate(&self, name: &str, version: Version) -> Option<Schema>;
}

/// SchemaCache is an in-memory [`SchemaLocator`].
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    schemas: HashMap<String, Vec<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        SchemaCache::default()
    }

    /// Adds a schema to the cache.
    pub fn add(&mut self, schema: Schema) {
        self.schemas.entry(fold(&schema.name)).or_default().push(schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<Schema> for SchemaCache {
    fn from_iter<I: IntoIterator<Item = Schema>>(iter: I) -> Self {
        let mut cache = SchemaCache::new();
        for schema in iter {
            cache.add(schema);
        }
        cache
    }
}

impl SchemaLocator for SchemaCache {
    fn locate(&self, name: &str, version: Version) -> Option<Schema> {
        let candidates = self.schemas.get(&fold(name))?;
        // Same read version and at least the requested write/minor, else the newest.
        candidates
            .iter()
            .filter(|s| s.version.major == version.major && s.version >= version)
            .min_by_key(|s| s.version)
            .or_else(|| candidates.iter().max_by_key(|s| s.version))
            .cloned()
    }
}
