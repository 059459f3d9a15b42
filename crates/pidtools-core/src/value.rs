//! # Metadata Value Model
//!
//! A tagged union over the three shapes DOI metadata takes: scalars, ordered
//! lists and string-keyed maps. Both the record returned by the registration
//! service and the locally assembled candidate are expressed as
//! [`Attributes`], so comparison never has to guess at types.
//!
//! Serialization goes through `serde_json::Value`, which keeps the wire form
//! identical to plain JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Top-level metadata mapping, keyed by DataCite attribute name.
pub type Attributes = BTreeMap<String, MetadataValue>;

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Scalar {
    /// Type-coercing equality.
    ///
    /// The registration service serializes some numeric fields (notably
    /// `publicationYear`) as strings while the candidate computes native
    /// numbers, so a number and a numeric string of the same value are equal.
    /// Values of the same kind compare by value. Every other pairing is
    /// unequal.
    pub fn loosely_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => numbers_eq(a, b),
            (Scalar::Number(n), Scalar::Text(t)) | (Scalar::Text(t), Scalar::Number(n)) => {
                numeric_text_eq(n, t)
            }
            _ => false,
        }
    }
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn numeric_text_eq(n: &Number, text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    if let (Some(x), Ok(y)) = (n.as_i64(), text.parse::<i64>()) {
        return x == y;
    }
    match (n.as_f64(), text.parse::<f64>()) {
        (Some(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// A metadata value: scalar, ordered list, or string-keyed map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum MetadataValue {
    Scalar(Scalar),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Shorthand for a text scalar.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(value.into()))
    }

    /// Shorthand for the null scalar.
    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Whether this value is a list or a map.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Element count of a list or map; `None` for scalars.
    pub fn structured_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::List(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
        }
    }

    /// Borrow the text of a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries of a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Borrow the items of a list.
    pub fn as_list(&self) -> Option<&[MetadataValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON object into [`Attributes`]; any other JSON value
    /// yields an empty mapping.
    pub fn attributes_from_json(value: Value) -> Attributes {
        match MetadataValue::from(value) {
            MetadataValue::Map(entries) => entries,
            _ => Attributes::new(),
        }
    }

    /// Convert [`Attributes`] back into a JSON object.
    pub fn attributes_to_json(attributes: &Attributes) -> Value {
        Value::Object(
            attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    }
}

impl From<Value> for MetadataValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::Text(s)),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<MetadataValue> for Value {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Scalar(Scalar::Null) => Value::Null,
            MetadataValue::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            MetadataValue::Scalar(Scalar::Number(n)) => Value::Number(n),
            MetadataValue::Scalar(Scalar::Text(s)) => Value::String(s),
            MetadataValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            MetadataValue::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: Value) -> Scalar {
        match v {
            Value::Number(n) => Scalar::Number(n),
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn numeric_text_equals_number() {
        let text = Scalar::Text("2024".into());
        assert!(text.loosely_eq(&num(json!(2024))));
        assert!(num(json!(2024)).loosely_eq(&text));
        assert!(!Scalar::Text("2025".into()).loosely_eq(&num(json!(2024))));
    }

    #[test]
    fn float_and_integer_compare_by_value() {
        assert!(num(json!(1)).loosely_eq(&num(json!(1.0))));
        assert!(Scalar::Text("1.5".into()).loosely_eq(&num(json!(1.5))));
    }

    #[test]
    fn texts_compare_exactly() {
        assert!(Scalar::Text("en".into()).loosely_eq(&Scalar::Text("en".into())));
        assert!(!Scalar::Text("en".into()).loosely_eq(&Scalar::Text("EN".into())));
        assert!(!Scalar::Text("".into()).loosely_eq(&num(json!(0))));
    }

    #[test]
    fn mixed_kinds_are_unequal() {
        assert!(!Scalar::Null.loosely_eq(&Scalar::Text(String::new())));
        assert!(!Scalar::Bool(true).loosely_eq(&num(json!(1))));
        assert!(Scalar::Null.loosely_eq(&Scalar::Null));
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let original = json!({
            "titles": [{"title": "Report 2024", "lang": "en"}],
            "publicationYear": 2024,
            "version": null,
            "isActive": true
        });
        let value = MetadataValue::from(original.clone());
        assert_eq!(Value::from(value.clone()), original);

        let serialized = serde_json::to_value(&value).unwrap();
        assert_eq!(serialized, original);
        let back: MetadataValue = serde_json::from_value(serialized).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn attributes_from_non_object_is_empty() {
        assert!(MetadataValue::attributes_from_json(json!([1, 2])).is_empty());
        let attrs = MetadataValue::attributes_from_json(json!({"language": "en"}));
        assert_eq!(attrs["language"].as_str(), Some("en"));
        assert_eq!(
            MetadataValue::attributes_to_json(&attrs),
            json!({"language": "en"})
        );
    }

    #[test]
    fn structured_len_reports_counts() {
        assert_eq!(MetadataValue::from(json!([1, 2, 3])).structured_len(), Some(3));
        assert_eq!(MetadataValue::from(json!({"a": 1})).structured_len(), Some(1));
        assert_eq!(MetadataValue::text("x").structured_len(), None);
    }
}
