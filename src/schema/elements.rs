//! Core schema elements: schemas, their items, and custom-attribute instances.

use super::*;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Schema is a named, versioned collection of schema items.
///
/// Items are indexed by folded name on first lookup, so mutation goes
/// through [`Schema::items_mut`], which drops the index.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_attributes: Vec<CustomAttributeInstance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<SchemaItem>,

    #[serde(skip)]
    item_index: OnceCell<HashMap<String, usize>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema {
            name: self.name.clone(),
            alias: self.alias.clone(),
            version: self.version,
            display_label: self.display_label.clone(),
            description: self.description.clone(),
            references: self.references.clone(),
            custom_attributes: self.custom_attributes.clone(),
            items: self.items.clone(),
            item_index: OnceCell::new(),
        }
    }
}

/// A reference from one schema to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRef {
    pub name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
}

impl SchemaRef {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        SchemaRef {
            name: name.into(),
            version,
            alias: String::new(),
        }
    }
}

/// An applied custom attribute: the attribute class plus its property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttributeInstance {
    pub class: ItemRef,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl CustomAttributeInstance {
    pub fn new(class: ItemRef) -> Self {
        CustomAttributeInstance {
            class,
            properties: BTreeMap::new(),
        }
    }
}

/// Class name of the custom attribute that marks a schema as dynamic.
pub const DYNAMIC_SCHEMA_ATTRIBUTE: &str = "DynamicSchema";

impl Schema {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>, alias: impl Into<String>, version: Version) -> Self {
        Schema {
            name: name.into(),
            alias: alias.into(),
            version,
            ..Default::default()
        }
    }

    /// Creates a schema with the same header as `self` and no items.
    pub fn empty_copy(&self) -> Self {
        Schema {
            name: self.name.clone(),
            alias: self.alias.clone(),
            version: self.version,
            display_label: self.display_label.clone(),
            description: self.description.clone(),
            references: self.references.clone(),
            custom_attributes: self.custom_attributes.clone(),
            ..Default::default()
        }
    }

    /// Replaces the items of the schema.
    pub fn with_items(mut self, items: Vec<SchemaItem>) -> Self {
        self.items = items;
        self.item_index = OnceCell::new();
        self
    }

    /// Parses a schema from a YAML document.
    pub fn from_yaml(s: &str) -> Result<Self, ParseError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Parses a schema from a JSON document.
    pub fn from_json(s: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Renders the schema as YAML.
    pub fn to_yaml(&self) -> Result<String, ParseError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Returns `Name.RR.WW.mm`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.name, self.version)
    }

    pub fn items(&self) -> &[SchemaItem] {
        &self.items
    }

    /// Mutable access to the items. Drops the name index.
    pub fn items_mut(&mut self) -> &mut Vec<SchemaItem> {
        self.item_index.take();
        &mut self.items
    }

    /// Appends an item and returns its position.
    pub fn push_item(&mut self, item: SchemaItem) -> usize {
        self.items_mut().push(item);
        self.items.len() - 1
    }

    /// Position of the item called `name`, ignoring case.
    pub fn item_position(&self, name: &str) -> Option<usize> {
        let index = self.item_index.get_or_init(|| {
            let mut index = HashMap::with_capacity(self.items.len());
            for (i, item) in self.items.iter().enumerate() {
                index.entry(fold(item.name())).or_insert(i);
            }
            index
        });
        index.get(&fold(name)).copied()
    }

    /// Finds an item by name, ignoring case.
    pub fn find_item(&self, name: &str) -> Option<&SchemaItem> {
        self.item_position(name).map(|i| &self.items[i])
    }

    /// Finds a class of any variant by name, ignoring case.
    pub fn find_class(&self, name: &str) -> Option<&ClassDef> {
        self.find_item(name).and_then(SchemaItem::as_class)
    }

    /// Returns true if `prefix` is this schema's name or alias.
    pub fn answers_to(&self, prefix: &str) -> bool {
        same_name(&self.name, prefix) || (!self.alias.is_empty() && same_name(&self.alias, prefix))
    }

    /// Finds the reference to the schema called `name`.
    pub fn reference(&self, name: &str) -> Option<&SchemaRef> {
        self.references.iter().find(|r| same_name(&r.name, name))
    }

    /// Returns true if a custom attribute of the given class name is applied.
    pub fn has_custom_attribute(&self, class_name: &str) -> bool {
        self.custom_attributes
            .iter()
            .any(|ca| same_name(&ca.class.name, class_name))
    }

    /// Dynamic schemas carry the `DynamicSchema` custom attribute.
    pub fn is_dynamic(&self) -> bool {
        self.has_custom_attribute(DYNAMIC_SCHEMA_ATTRIBUTE)
    }

    /// Visits every item reference held by the schema and its items.
    pub fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&mut ItemRef)) {
        for ca in &mut self.custom_attributes {
            f(&mut ca.class);
        }
        for item in self.items_mut() {
            item.for_each_ref_mut(f);
        }
    }
}

/// Closed set of schema item kinds, used for dispatch and in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Enumeration,
    PropertyCategory,
    Phenomenon,
    UnitSystem,
    Unit,
    Constant,
    InvertedUnit,
    Format,
    QuantitySpecification,
    EntityClass,
    StructClass,
    CustomAttributeClass,
    RelationshipClass,
}

impl ItemKind {
    /// Returns true for the four class variants.
    pub fn is_class(self) -> bool {
        matches!(
            self,
            ItemKind::EntityClass
                | ItemKind::StructClass
                | ItemKind::CustomAttributeClass
                | ItemKind::RelationshipClass
        )
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Enumeration => "Enumeration",
            ItemKind::PropertyCategory => "PropertyCategory",
            ItemKind::Phenomenon => "Phenomenon",
            ItemKind::UnitSystem => "UnitSystem",
            ItemKind::Unit => "Unit",
            ItemKind::Constant => "Constant",
            ItemKind::InvertedUnit => "InvertedUnit",
            ItemKind::Format => "Format",
            ItemKind::QuantitySpecification => "QuantitySpecification",
            ItemKind::EntityClass => "EntityClass",
            ItemKind::StructClass => "StructClass",
            ItemKind::CustomAttributeClass => "CustomAttributeClass",
            ItemKind::RelationshipClass => "RelationshipClass",
        };
        f.write_str(name)
    }
}

/// SchemaItem is any top-level named definition inside a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaItem {
    Enumeration(Enumeration),
    PropertyCategory(PropertyCategory),
    Phenomenon(Phenomenon),
    UnitSystem(UnitSystem),
    Unit(Unit),
    Constant(Constant),
    InvertedUnit(InvertedUnit),
    Format(Format),
    QuantitySpecification(QuantitySpecification),
    Entity(ClassDef),
    Struct(ClassDef),
    CustomAttribute(ClassDef),
    Relationship(RelationshipClass),
}

impl SchemaItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            SchemaItem::Enumeration(_) => ItemKind::Enumeration,
            SchemaItem::PropertyCategory(_) => ItemKind::PropertyCategory,
            SchemaItem::Phenomenon(_) => ItemKind::Phenomenon,
            SchemaItem::UnitSystem(_) => ItemKind::UnitSystem,
            SchemaItem::Unit(_) => ItemKind::Unit,
            SchemaItem::Constant(_) => ItemKind::Constant,
            SchemaItem::InvertedUnit(_) => ItemKind::InvertedUnit,
            SchemaItem::Format(_) => ItemKind::Format,
            SchemaItem::QuantitySpecification(_) => ItemKind::QuantitySpecification,
            SchemaItem::Entity(_) => ItemKind::EntityClass,
            SchemaItem::Struct(_) => ItemKind::StructClass,
            SchemaItem::CustomAttribute(_) => ItemKind::CustomAttributeClass,
            SchemaItem::Relationship(_) => ItemKind::RelationshipClass,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaItem::Enumeration(e) => &e.name,
            SchemaItem::PropertyCategory(c) => &c.name,
            SchemaItem::Phenomenon(p) => &p.name,
            SchemaItem::UnitSystem(s) => &s.name,
            SchemaItem::Unit(u) => &u.name,
            SchemaItem::Constant(c) => &c.name,
            SchemaItem::InvertedUnit(u) => &u.name,
            SchemaItem::Format(f) => &f.name,
            SchemaItem::QuantitySpecification(q) => &q.name,
            SchemaItem::Entity(c) | SchemaItem::Struct(c) | SchemaItem::CustomAttribute(c) => &c.name,
            SchemaItem::Relationship(r) => &r.class.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            SchemaItem::Enumeration(e) => e.name = name,
            SchemaItem::PropertyCategory(c) => c.name = name,
            SchemaItem::Phenomenon(p) => p.name = name,
            SchemaItem::UnitSystem(s) => s.name = name,
            SchemaItem::Unit(u) => u.name = name,
            SchemaItem::Constant(c) => c.name = name,
            SchemaItem::InvertedUnit(u) => u.name = name,
            SchemaItem::Format(f) => f.name = name,
            SchemaItem::QuantitySpecification(q) => q.name = name,
            SchemaItem::Entity(c) | SchemaItem::Struct(c) | SchemaItem::CustomAttribute(c) => c.name = name,
            SchemaItem::Relationship(r) => r.class.name = name,
        }
    }

    /// Class view of the item, for all four class variants.
    pub fn as_class(&self) -> Option<&ClassDef> {
        match self {
            SchemaItem::Entity(c) | SchemaItem::Struct(c) | SchemaItem::CustomAttribute(c) => Some(c),
            SchemaItem::Relationship(r) => Some(&r.class),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassDef> {
        match self {
            SchemaItem::Entity(c) | SchemaItem::Struct(c) | SchemaItem::CustomAttribute(c) => Some(c),
            SchemaItem::Relationship(r) => Some(&mut r.class),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&RelationshipClass> {
        match self {
            SchemaItem::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_relationship_mut(&mut self) -> Option<&mut RelationshipClass> {
        match self {
            SchemaItem::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Visits every item reference the item holds.
    pub fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&mut ItemRef)) {
        match self {
            SchemaItem::Enumeration(_)
            | SchemaItem::PropertyCategory(_)
            | SchemaItem::Phenomenon(_)
            | SchemaItem::UnitSystem(_) => {}
            SchemaItem::Unit(u) => {
                f(&mut u.phenomenon);
                f(&mut u.unit_system);
            }
            SchemaItem::Constant(c) => f(&mut c.phenomenon),
            SchemaItem::InvertedUnit(u) => {
                f(&mut u.inverts_unit);
                f(&mut u.unit_system);
            }
            SchemaItem::Format(format) => {
                if let Some(composite) = &mut format.composite {
                    for unit in &mut composite.units {
                        f(&mut unit.unit);
                    }
                }
            }
            SchemaItem::QuantitySpecification(q) => {
                f(&mut q.persistence_unit);
                for pf in &mut q.presentation_formats {
                    f(&mut pf.format);
                    for unit in &mut pf.units {
                        f(&mut unit.unit);
                    }
                }
            }
            SchemaItem::Entity(c) | SchemaItem::Struct(c) | SchemaItem::CustomAttribute(c) => {
                class_refs_mut(c, f)
            }
            SchemaItem::Relationship(r) => {
                class_refs_mut(&mut r.class, f);
                for constraint in [&mut r.source, &mut r.target] {
                    if let Some(abs) = &mut constraint.abstract_constraint {
                        f(abs);
                    }
                    for class in &mut constraint.classes {
                        f(class);
                    }
                }
            }
        }
    }
}

fn class_refs_mut(class: &mut ClassDef, f: &mut dyn FnMut(&mut ItemRef)) {
    for base in &mut class.base_classes {
        f(base);
    }
    for ca in &mut class.custom_attributes {
        f(&mut ca.class);
    }
    for property in &mut class.properties {
        if let TypeName::Item(r) = &mut property.type_name {
            f(r);
        }
        if let Some(category) = &mut property.category {
            f(category);
        }
        if let Some(koq) = &mut property.quantity_specification {
            f(koq);
        }
        for ca in &mut property.custom_attributes {
            f(&mut ca.class);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_YAML: &str = r#"
name: MySchema
alias: mys
version: "01.00.00"
references:
  - name: Units
    version: "01.00.07"
    alias: u
items:
  - kind: enumeration
    name: Color
    backingType: int
    enumerators:
      - { name: Red, value: 1 }
  - kind: entity
    name: Widget
    baseClasses: [Base]
    properties:
      - { name: Paint, type: Color }
      - { name: Length, type: double, quantitySpecification: "u:LENGTH" }
  - kind: entity
    name: Base
  - kind: relationship
    name: WidgetOwnsWidget
    strength: embedding
    source: { multiplicity: "(0..1)", classes: [Widget] }
    target: { multiplicity: "(0..*)", classes: [Widget] }
"#;

    #[test]
    fn test_parse_schema_yaml() {
        let schema = Schema::from_yaml(SCHEMA_YAML).unwrap();
        assert_eq!(schema.name, "MySchema");
        assert_eq!(schema.version, Version::new(1, 0, 0));
        assert_eq!(schema.items().len(), 4);
        assert_eq!(schema.find_item("color").unwrap().kind(), ItemKind::Enumeration);

        let widget = schema.find_class("WIDGET").unwrap();
        assert_eq!(widget.base_classes, vec![ItemRef::local("Base")]);
        assert_eq!(
            widget.property("paint").unwrap().type_name.item(),
            Some(&ItemRef::local("Color"))
        );

        let rel = schema.find_item("WidgetOwnsWidget").unwrap();
        assert_eq!(rel.kind(), ItemKind::RelationshipClass);
        assert!(rel.as_class().is_some());
    }

    #[test]
    fn test_index_is_dropped_on_mutation() {
        let mut schema = Schema::from_yaml(SCHEMA_YAML).unwrap();
        assert!(schema.find_item("Gadget").is_none());
        schema.push_item(SchemaItem::Entity(ClassDef::new("Gadget")));
        assert!(schema.find_item("gadget").is_some());

        schema.items_mut()[0].set_name("Colour");
        assert!(schema.find_item("Color").is_none());
        assert!(schema.find_item("Colour").is_some());
    }

    #[test]
    fn test_answers_to_name_and_alias() {
        let schema = Schema::new("MySchema", "mys", Version::new(1, 0, 0));
        assert!(schema.answers_to("MYS"));
        assert!(schema.answers_to("myschema"));
        assert!(!schema.answers_to("other"));
    }

    #[test]
    fn test_for_each_ref_visits_class_references() {
        let mut schema = Schema::from_yaml(SCHEMA_YAML).unwrap();
        let mut seen = Vec::new();
        schema.for_each_ref_mut(&mut |r| seen.push(r.to_string()));
        assert!(seen.contains(&"Base".to_string()));
        assert!(seen.contains(&"Color".to_string()));
        assert!(seen.contains(&"u:LENGTH".to_string()));
        assert_eq!(seen.iter().filter(|s| *s == "Widget").count(), 2);
    }

    #[test]
    fn test_dynamic_schema_marker() {
        let mut schema = Schema::new("Dyn", "d", Version::new(1, 0, 0));
        assert!(!schema.is_dynamic());
        schema
            .custom_attributes
            .push(CustomAttributeInstance::new(ItemRef::qualified("CoreCustomAttributes", "DynamicSchema")));
        assert!(schema.is_dynamic());
    }
}
