//! Class definitions, their properties, and relationship constraints.

use super::{fold, same_name, CustomAttributeInstance, ItemRef, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primitive type names understood without a schema lookup.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "binary",
    "boolean",
    "bool",
    "dateTime",
    "double",
    "int",
    "long",
    "point2d",
    "point3d",
    "string",
    "Bentley.Geometry.Common.IGeometry",
];

/// Returns true if `name` is a built-in primitive type.
pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.iter().any(|p| same_name(p, name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassModifier {
    None,
    Abstract,
    Sealed,
}

impl Default for ClassModifier {
    fn default() -> Self {
        ClassModifier::None
    }
}

/// A structured type: the shared shape of entity, struct, custom-attribute
/// and relationship classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub modifier: ClassModifier,
    /// Uses edges to base classes, never containment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_classes: Vec<ItemRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_attributes: Vec<CustomAttributeInstance>,
    /// Migration mapping for properties renamed to resolve a name conflict.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub renamed_properties: Vec<PropertyRename>,
}

impl ClassDef {
    /// Creates an empty class.
    pub fn new(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Looks up a locally declared property by name, ignoring case.
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| same_name(&p.name, name))
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut PropertyDef> {
        self.properties.iter_mut().find(|p| same_name(&p.name, name))
    }

    /// Records that `old_name` was renamed to `new_name` on this class.
    pub fn record_rename(&mut self, old_name: &str, new_name: &str) {
        let exists = self
            .renamed_properties
            .iter()
            .any(|r| same_name(&r.old_name, old_name) && same_name(&r.new_name, new_name));
        if !exists {
            self.renamed_properties.push(PropertyRename {
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
            });
        }
    }
}

/// Old name to new name for one renamed property, written `Old|New`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyRename {
    pub old_name: String,
    pub new_name: String,
}

impl fmt::Display for PropertyRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.old_name, self.new_name)
    }
}

impl TryFrom<String> for PropertyRename {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once('|') {
            Some((old, new)) if !old.is_empty() && !new.is_empty() => Ok(PropertyRename {
                old_name: old.to_string(),
                new_name: new.to_string(),
            }),
            _ => Err(ParseError::Document(format!(
                "invalid property mapping '{}', expected Old|New",
                value
            ))),
        }
    }
}

impl From<PropertyRename> for String {
    fn from(r: PropertyRename) -> Self {
        r.to_string()
    }
}

/// Shape of a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    Primitive,
    PrimitiveArray,
    Struct,
    StructArray,
    Navigation,
}

impl Default for PropertyKind {
    fn default() -> Self {
        PropertyKind::Primitive
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Primitive => "primitive",
            PropertyKind::PrimitiveArray => "primitive array",
            PropertyKind::Struct => "struct",
            PropertyKind::StructArray => "struct array",
            PropertyKind::Navigation => "navigation",
        };
        f.write_str(name)
    }
}

/// Declared type of a property: a primitive, or a reference to an
/// enumeration, struct or relationship class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeName {
    Primitive(String),
    Item(ItemRef),
}

impl TypeName {
    pub fn primitive(name: impl Into<String>) -> Self {
        TypeName::Primitive(name.into())
    }

    /// Referenced item, if the type is not a primitive.
    pub fn item(&self) -> Option<&ItemRef> {
        match self {
            TypeName::Primitive(_) => None,
            TypeName::Item(r) => Some(r),
        }
    }
}

impl Default for TypeName {
    fn default() -> Self {
        TypeName::Primitive("string".to_string())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Primitive(name) => f.write_str(name),
            TypeName::Item(r) => write!(f, "{}", r),
        }
    }
}

impl FromStr for TypeName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if is_primitive_type(s) {
            Ok(TypeName::Primitive(s.to_string()))
        } else {
            Ok(TypeName::Item(s.parse()?))
        }
    }
}

impl TryFrom<String> for TypeName {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeName> for String {
    fn from(t: TypeName) -> Self {
        t.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
    Forward,
    Backward,
}

/// A named, typed member of a class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    pub name: String,
    #[serde(default)]
    pub kind: PropertyKind,
    #[serde(default, rename = "type")]
    pub type_name: TypeName,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_occurs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<NavigationDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ItemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_specification: Option<ItemRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_attributes: Vec<CustomAttributeInstance>,
}

impl PropertyDef {
    /// Creates a primitive property.
    pub fn primitive(name: impl Into<String>, type_name: &str) -> Self {
        PropertyDef {
            name: name.into(),
            kind: PropertyKind::Primitive,
            type_name: TypeName::primitive(type_name),
            ..Default::default()
        }
    }

    /// Folded name used as the property's identity within a hierarchy.
    pub fn key(&self) -> String {
        fold(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Referencing,
    Holding,
    Embedding,
}

impl Default for Strength {
    fn default() -> Self {
        Strength::Referencing
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strength::Referencing => "referencing",
            Strength::Holding => "holding",
            Strength::Embedding => "embedding",
        };
        f.write_str(name)
    }
}

/// Cardinality range of a constraint, written `(lower..upper)` with `*`
/// for an unbounded upper limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Multiplicity {
    pub lower: u32,
    pub upper: Option<u32>,
}

impl Default for Multiplicity {
    fn default() -> Self {
        Multiplicity {
            lower: 0,
            upper: Some(1),
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "({}..{})", self.lower, upper),
            None => write!(f, "({}..*)", self.lower),
        }
    }
}

impl FromStr for Multiplicity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMultiplicity(s.to_string());
        let body = s
            .trim()
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let (lower, upper) = body.split_once("..").ok_or_else(invalid)?;
        let lower = lower.trim().parse().map_err(|_| invalid())?;
        let upper = match upper.trim() {
            "*" | "N" | "n" => None,
            u => Some(u.parse().map_err(|_| invalid())?),
        };
        Ok(Multiplicity { lower, upper })
    }
}

impl TryFrom<String> for Multiplicity {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Multiplicity> for String {
    fn from(m: Multiplicity) -> Self {
        m.to_string()
    }
}

/// Source or target side of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Constraint {
    pub multiplicity: Multiplicity,
    pub polymorphic: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_constraint: Option<ItemRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ItemRef>,
}

impl Default for Constraint {
    fn default() -> Self {
        Constraint {
            multiplicity: Multiplicity::default(),
            polymorphic: true,
            role_label: String::new(),
            abstract_constraint: None,
            classes: Vec::new(),
        }
    }
}

/// Names the two ends of a relationship in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintEnd {
    Source,
    Target,
}

impl fmt::Display for ConstraintEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintEnd::Source => f.write_str("Source"),
            ConstraintEnd::Target => f.write_str("Target"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipClass {
    #[serde(flatten)]
    pub class: ClassDef,
    #[serde(default)]
    pub strength: Strength,
    #[serde(default)]
    pub source: Constraint,
    #[serde(default)]
    pub target: Constraint,
}

impl RelationshipClass {
    pub fn constraint(&self, end: ConstraintEnd) -> &Constraint {
        match end {
            ConstraintEnd::Source => &self.source,
            ConstraintEnd::Target => &self.target,
        }
    }

    pub fn constraint_mut(&mut self, end: ConstraintEnd) -> &mut Constraint {
        match end {
            ConstraintEnd::Source => &mut self.source,
            ConstraintEnd::Target => &mut self.target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_parse() {
        assert!(matches!("string".parse::<TypeName>().unwrap(), TypeName::Primitive(_)));
        assert!(matches!(
            "Bentley.Geometry.Common.IGeometry".parse::<TypeName>().unwrap(),
            TypeName::Primitive(_)
        ));
        let t: TypeName = "mys:Color".parse().unwrap();
        assert_eq!(t.item(), Some(&ItemRef::qualified("mys", "Color")));
    }

    #[test]
    fn test_multiplicity_round_trip() {
        let m: Multiplicity = "(0..*)".parse().unwrap();
        assert_eq!(m, Multiplicity { lower: 0, upper: None });
        assert_eq!(m.to_string(), "(0..*)");
        let one: Multiplicity = "(1..1)".parse().unwrap();
        assert_eq!(one.upper, Some(1));
        assert!("0..1".parse::<Multiplicity>().is_err());
    }

    #[test]
    fn test_property_rename_serde() {
        let r: PropertyRename = serde_json::from_str("\"A|A_1\"").unwrap();
        assert_eq!(r.old_name, "A");
        assert_eq!(r.new_name, "A_1");
        assert!(serde_json::from_str::<PropertyRename>("\"A\"").is_err());
    }

    #[test]
    fn test_record_rename_is_idempotent() {
        let mut class = ClassDef::new("MyConflict");
        class.record_rename("A", "A_1");
        class.record_rename("a", "a_1");
        assert_eq!(class.renamed_properties.len(), 1);
    }

    #[test]
    fn test_relationship_flattens_class() {
        let rel: RelationshipClass = serde_yaml::from_str(
            r#"
name: Owns
strength: embedding
source:
  multiplicity: "(0..1)"
  classes: [Owner]
target:
  multiplicity: "(0..*)"
  classes: [Part]
"#,
        )
        .unwrap();
        assert_eq!(rel.class.name, "Owns");
        assert_eq!(rel.strength, Strength::Embedding);
        assert_eq!(rel.target.multiplicity.upper, None);
        assert!(rel.source.polymorphic);
    }
}
