#![forbid(unsafe_code)]

//! Dynamic values stored in observed objects.
//!
//! A [`Value`] is either a primitive (null, bool, number, string), an array,
//! or an [`ObservedObject`]. There is no "plain" object variant: converting a
//! `serde_json::Value` into a `Value` runs the recursive observer, so every
//! object reachable from a `Value` already has intercepted properties.
//!
//! Arrays are leaves for tracking purposes. Their elements are observed (an
//! object inside an array is an `ObservedObject`), but indexing into an array
//! is an untracked read and array elements cannot be written through a path.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Number;

use crate::observer::{ObservedObject, observe_json};

/// A value held by an observed property.
///
/// Cloning is cheap for objects (the handle is shared, identity is kept) and
/// deep for arrays and strings.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(ObservedObject),
}

impl Value {
    /// Short kind name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// True for values a path segment can be applied to.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObservedObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Plain JSON snapshot of this value.
    ///
    /// Object properties are read without registering subscriptions, so a
    /// snapshot taken inside a tracked evaluation does not subscribe to the
    /// whole subtree.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Object(obj) => obj.snapshot(),
        }
    }
}

/// Structural equality over the snapshot form. Two distinct objects with the
/// same contents compare equal; use [`ObservedObject::ptr_eq`] for identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            _ => false,
        }
    }
}

/// View text of a value: strings are shown bare, everything else as compact
/// JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Array(_) | Self::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        observe_json(value)
    }
}

impl From<ObservedObject> for Value {
    fn from(obj: ObservedObject) -> Self {
        Self::Object(obj)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// Non-finite floats have no JSON representation and become `Null`.
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_become_observed() {
        let value = Value::from(json!({"a": {"b": 1}, "list": [{"c": true}]}));
        let root = value.as_object().expect("object");
        let a = root.get("a").expect("a");
        assert!(a.as_object().is_some());

        let Some(Value::Array(items)) = root.get("list") else {
            panic!("expected array");
        };
        assert!(items[0].as_object().is_some());
    }

    #[test]
    fn display_shows_strings_bare() {
        assert_eq!(Value::from("Ann").to_string(), "Ann");
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(json!({"x": [1, 2]})).to_string(), r#"{"x":[1,2]}"#);
    }

    #[test]
    fn snapshot_round_trips_shape() {
        let source = json!({"user": {"name": "Ann", "tags": ["a", "b"]}, "n": 1.5});
        assert_eq!(Value::from(source.clone()).to_json(), source);
    }

    #[test]
    fn serialize_uses_snapshot_form() {
        let value = Value::from(json!({"k": "v"}));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"k":"v"}"#);
    }

    #[test]
    fn non_finite_float_is_null() {
        assert!(Value::from(f64::NAN).is_null());
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
    }

    #[test]
    fn equality_is_structural_for_objects() {
        let a = Value::from(json!({"x": 1}));
        let b = Value::from(json!({"x": 1}));
        let c = Value::from(json!({"x": 2}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(Value::from(1), Value::from("1"));
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(vec![1, 2]).kind(), "array");
        assert!(Value::from(vec![1]).is_composite());
        assert!(!Value::from(true).is_composite());
    }
}
