//! Typed attributes used to match consumers with producer variants.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The runtime type tag of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    Boolean,
    Integer,
    String,
    /// A named, enum-like value. Serialized as its name.
    Named,
    /// Any value the metadata format cannot represent.
    Opaque,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::String => "string",
            ValueType::Named => "named",
            ValueType::Opaque => "opaque",
        };
        f.write_str(s)
    }
}

/// An attribute key: a name plus the type of values it carries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute {
    pub name: String,
    pub value_type: ValueType,
}

impl Attribute {
    pub fn of(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.value_type)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Named(String),
    /// A value handed over by a producer whose type has no metadata
    /// representation. It matches only an identical value and cannot be
    /// written to a module document.
    Opaque { type_name: String, repr: String },
}

impl AttributeValue {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Boolean(_) => ValueType::Boolean,
            AttributeValue::Integer(_) => ValueType::Integer,
            AttributeValue::String(_) => ValueType::String,
            AttributeValue::Named(_) => ValueType::Named,
            AttributeValue::Opaque { .. } => ValueType::Opaque,
        }
    }

    /// Integer view of the value. Strings holding a number qualify, since a
    /// value read back from a document loses the distinction.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::String(s) | AttributeValue::Named(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Text view of string and named values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::Named(s) => Some(s),
            _ => None,
        }
    }

    /// Value equality across representations: a named value equals the
    /// string holding its name, an integer equals its decimal string.
    pub fn same_value(&self, other: &AttributeValue) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (AttributeValue::Opaque { .. }, _) | (_, AttributeValue::Opaque { .. }) => false,
            (AttributeValue::Boolean(_), _) | (_, AttributeValue::Boolean(_)) => {
                self.to_string() == other.to_string()
            }
            _ => match (self.as_integer(), other.as_integer()) {
                (Some(a), Some(b)) => a == b,
                _ => self.as_text().is_some() && self.as_text() == other.as_text(),
            },
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Boolean(b) => write!(f, "{b}"),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::String(s) | AttributeValue::Named(s) => f.write_str(s),
            AttributeValue::Opaque { repr, .. } => f.write_str(repr),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Boolean(b) => AttributeValue::Boolean(b),
            RawValue::Integer(i) => AttributeValue::Integer(i),
            RawValue::String(s) => AttributeValue::String(s),
        })
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Boolean(b) => serializer.serialize_bool(*b),
            AttributeValue::Integer(i) => serializer.serialize_i64(*i),
            AttributeValue::String(s) | AttributeValue::Named(s) => serializer.serialize_str(s),
            AttributeValue::Opaque { type_name, .. } => Err(serde::ser::Error::custom(format!(
                "unsupported attribute value of type {type_name}"
            ))),
        }
    }
}

/// A set of attribute values keyed by attribute name.
///
/// Names are unique; iteration is always in name order, which is also the
/// order attributes are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeContainer {
    values: BTreeMap<String, AttributeValue>,
}

impl AttributeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace the value for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The typed keys present in this container.
    pub fn keys(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.values
            .iter()
            .map(|(name, value)| Attribute::of(name.clone(), value.value_type()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A copy of `self` with every value of `overrides` applied on top.
    pub fn merged(&self, overrides: &AttributeContainer) -> AttributeContainer {
        let mut values = self.values.clone();
        for (k, v) in &overrides.values {
            values.insert(k.clone(), v.clone());
        }
        AttributeContainer { values }
    }
}

impl fmt::Display for AttributeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for AttributeContainer {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut container = AttributeContainer::new();
        for (k, v) in iter {
            container.insert(k, v);
        }
        container
    }
}
