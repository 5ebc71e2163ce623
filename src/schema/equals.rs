//! Equality comparisons for schema types that cannot derive them.

use super::elements::*;
use super::*;

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if self.items().len() != other.items().len() {
            return false;
        }
        self.name == other.name
            && self.alias == other.alias
            && self.version == other.version
            && self.display_label == other.display_label
            && self.description == other.description
            && self.references == other.references
            && self.custom_attributes == other.custom_attributes
            && self
                .items()
                .iter()
                .zip(other.items().iter())
                .all(|(a, b)| a == b)
    }
}

impl PartialEq for TypeName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeName::Primitive(a), TypeName::Primitive(b)) => same_name(a, b),
            (TypeName::Item(a), TypeName::Item(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl Eq for TypeName {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_equality_ignores_index_state() {
        let a = Schema::new("S", "s", Version::new(1, 0, 0))
            .with_items(vec![SchemaItem::Entity(ClassDef::new("A"))]);
        let b = a.clone();
        // Populate the index on one side only.
        assert!(a.find_item("A").is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_schema_equality_sees_item_changes() {
        let a = Schema::new("S", "s", Version::new(1, 0, 0))
            .with_items(vec![SchemaItem::Entity(ClassDef::new("A"))]);
        let mut b = a.clone();
        b.items_mut()[0].as_class_mut().unwrap().display_label = "Changed".to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_name_equality_ignores_case() {
        assert_eq!(TypeName::primitive("String"), TypeName::primitive("string"));
        assert_eq!(
            TypeName::Item(ItemRef::local("Enum1")),
            TypeName::Item(ItemRef::local("enum1"))
        );
        assert_ne!(TypeName::primitive("int"), TypeName::Item(ItemRef::local("int")));
    }
}
