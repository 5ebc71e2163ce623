//! Names and references between schema items.
//!
//! Every identifier in a schema graph compares case-insensitively. An
//! [`ItemRef`] is how one item points at another: either a bare `Name`
//! (same schema) or `Prefix:Name`, where the prefix is the name or alias of
//! the schema that owns the target.

use super::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Folds an identifier for case-insensitive comparison and lookup.
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Compares two identifiers case-insensitively.
pub fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || fold(a) == fold(b)
}

/// ItemRef points at a schema item, optionally qualified by schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemRef {
    /// Schema name or alias. `None` means the schema containing the reference.
    pub schema: Option<String>,
    pub name: String,
}

impl ItemRef {
    /// Creates an unqualified reference.
    pub fn local(name: impl Into<String>) -> Self {
        ItemRef {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a reference qualified by schema name or alias.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        ItemRef {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Returns true if both references are spelled the same ignoring case.
    pub fn same_as(&self, other: &ItemRef) -> bool {
        let schemas_match = match (&self.schema, &other.schema) {
            (Some(a), Some(b)) => same_name(a, b),
            (None, None) => true,
            _ => false,
        };
        schemas_match && same_name(&self.name, &other.name)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}:{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for ItemRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (schema, name) = match s.split_once(':') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, s),
        };
        if name.is_empty() || name.contains(':') || schema.map_or(false, str::is_empty) {
            return Err(ParseError::InvalidItemRef(s.to_string()));
        }
        Ok(ItemRef {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for ItemRef {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemRef> for String {
    fn from(r: ItemRef) -> Self {
        r.to_string()
    }
}

/// ItemKey identifies an item across a whole schema graph.
///
/// Both parts are folded, so two keys are equal exactly when they name the
/// same item under case-insensitive comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    schema: String,
    name: String,
}

impl ItemKey {
    /// Creates a key for the item `name` owned by the schema named `schema`.
    pub fn new(schema: &str, name: &str) -> Self {
        ItemKey {
            schema: fold(schema),
            name: fold(name),
        }
    }

    /// Folded schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Folded item name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_ref() {
        let local: ItemRef = "MyClass".parse().unwrap();
        assert_eq!(local, ItemRef::local("MyClass"));

        let qualified: ItemRef = "bis:Element".parse().unwrap();
        assert_eq!(qualified, ItemRef::qualified("bis", "Element"));
        assert_eq!(qualified.to_string(), "bis:Element");

        assert!("".parse::<ItemRef>().is_err());
        assert!(":Element".parse::<ItemRef>().is_err());
        assert!("a:b:c".parse::<ItemRef>().is_err());
    }

    #[test]
    fn test_same_as_ignores_case() {
        let a = ItemRef::qualified("BIS", "element");
        let b = ItemRef::qualified("bis", "Element");
        assert!(a.same_as(&b));
        assert!(!a.same_as(&ItemRef::local("Element")));
    }

    #[test]
    fn test_item_key_folds() {
        assert_eq!(ItemKey::new("MySchema", "MyEnum"), ItemKey::new("myschema", "MYENUM"));
        assert_ne!(ItemKey::new("MySchema", "MyEnum"), ItemKey::new("Other", "MyEnum"));
    }
}
