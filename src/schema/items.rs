//! Non-class schema items: enumerations, categories, the unit family,
//! formats and quantity specifications.

use super::{ItemRef, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backing primitive type of an enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumerationType {
    Int,
    String,
}

impl Default for EnumerationType {
    fn default() -> Self {
        EnumerationType::Int
    }
}

impl fmt::Display for EnumerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumerationType::Int => write!(f, "int"),
            EnumerationType::String => write!(f, "string"),
        }
    }
}

/// Value carried by an enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumeratorValue {
    Integer(i64),
    String(String),
}

impl fmt::Display for EnumeratorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumeratorValue::Integer(v) => write!(f, "{}", v),
            EnumeratorValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// A single named value of an enumeration. Identity is the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enumerator {
    pub name: String,
    pub value: EnumeratorValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enumeration {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Write-once: a merge that changes it fails.
    #[serde(default)]
    pub backing_type: EnumerationType,
    #[serde(default = "default_true")]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enumerators: Vec<Enumerator>,
}

impl Enumeration {
    /// Looks an enumerator up by name, ignoring case.
    pub fn enumerator(&self, name: &str) -> Option<&Enumerator> {
        self.enumerators
            .iter()
            .find(|e| super::same_name(&e.name, name))
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCategory {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phenomenon {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSystem {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A unit of measure. Everything but the label and description is
/// write-once across merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub phenomenon: ItemRef,
    pub unit_system: ItemRef,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
}

impl Unit {
    pub fn numerator(&self) -> f64 {
        self.numerator.unwrap_or(1.0)
    }

    pub fn denominator(&self) -> f64 {
        self.denominator.unwrap_or(1.0)
    }

    pub fn offset(&self) -> f64 {
        self.offset.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub phenomenon: ItemRef,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<f64>,
}

impl Constant {
    pub fn numerator(&self) -> f64 {
        self.numerator.unwrap_or(1.0)
    }

    pub fn denominator(&self) -> f64 {
        self.denominator.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvertedUnit {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub inverts_unit: ItemRef,
    pub unit_system: ItemRef,
}

/// Numeric formatting rules of a [`Format`]. Merged as a single value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSpec {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_sign_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_traits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thousand_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_offset_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_separator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeUnit {
    pub unit: ItemRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_zero: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<CompositeUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub numeric: NumericSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeSpec>,
}

/// One presentation format of a quantity specification, written
/// `Format(precision)[Unit|label][Unit]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PresentationFormat {
    pub format: ItemRef,
    pub precision: Option<u32>,
    pub units: Vec<CompositeUnit>,
}

impl fmt::Display for PresentationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format)?;
        if let Some(precision) = self.precision {
            write!(f, "({})", precision)?;
        }
        for unit in &self.units {
            match &unit.label {
                Some(label) => write!(f, "[{}|{}]", unit.unit, label)?,
                None => write!(f, "[{}]", unit.unit)?,
            }
        }
        Ok(())
    }
}

impl FromStr for PresentationFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseError::InvalidPresentationFormat(s.to_string());

        let head_end = s.find(|c| c == '(' || c == '[').unwrap_or(s.len());
        let format: ItemRef = s[..head_end].parse().map_err(|_| invalid())?;
        let mut rest = &s[head_end..];

        let mut precision = None;
        if let Some(after) = rest.strip_prefix('(') {
            let close = after.find(')').ok_or_else(invalid)?;
            precision = Some(after[..close].trim().parse().map_err(|_| invalid())?);
            rest = &after[close + 1..];
        }

        let mut units = Vec::new();
        while let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(invalid)?;
            let body = &after[..close];
            let (unit, label) = match body.split_once('|') {
                Some((unit, label)) => (unit, Some(label.to_string())),
                None => (body, None),
            };
            units.push(CompositeUnit {
                unit: unit.parse().map_err(|_| invalid())?,
                label,
            });
            rest = &after[close + 1..];
        }

        if !rest.trim().is_empty() {
            return Err(invalid());
        }

        Ok(PresentationFormat {
            format,
            precision,
            units,
        })
    }
}

impl TryFrom<String> for PresentationFormat {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PresentationFormat> for String {
    fn from(p: PresentationFormat) -> Self {
        p.to_string()
    }
}

/// Binds a persistence unit to the formats it is presented with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantitySpecification {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub persistence_unit: ItemRef,
    #[serde(default)]
    pub relative_error: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presentation_formats: Vec<PresentationFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_format_parse() {
        let p: PresentationFormat = "f:DefaultRealU(4)[u:M|meters][u:MM]".parse().unwrap();
        assert_eq!(p.format, ItemRef::qualified("f", "DefaultRealU"));
        assert_eq!(p.precision, Some(4));
        assert_eq!(p.units.len(), 2);
        assert_eq!(p.units[0].label.as_deref(), Some("meters"));
        assert_eq!(p.to_string(), "f:DefaultRealU(4)[u:M|meters][u:MM]");

        let bare: PresentationFormat = "Format1".parse().unwrap();
        assert!(bare.precision.is_none());
        assert!(bare.units.is_empty());
    }

    #[test]
    fn test_presentation_format_rejects_garbage() {
        assert!("Format1(x)[M]".parse::<PresentationFormat>().is_err());
        assert!("Format1[M".parse::<PresentationFormat>().is_err());
        assert!("Format1[M] trailing".parse::<PresentationFormat>().is_err());
    }

    #[test]
    fn test_enumerator_values_deserialize_untagged() {
        let e: Enumeration = serde_yaml::from_str(
            r#"
name: Color
backingType: string
enumerators:
  - name: Red
    value: r
"#,
        )
        .unwrap();
        assert_eq!(e.backing_type, EnumerationType::String);
        assert!(e.strict);
        assert_eq!(
            e.enumerator("red").unwrap().value,
            EnumeratorValue::String("r".to_string())
        );
    }

    #[test]
    fn test_unit_defaults() {
        let u: Unit = serde_yaml::from_str(
            r#"
name: M
phenomenon: LENGTH
unitSystem: SI
definition: M
"#,
        )
        .unwrap();
        assert_eq!(u.numerator(), 1.0);
        assert_eq!(u.denominator(), 1.0);
        assert_eq!(u.offset(), 0.0);
    }
}
