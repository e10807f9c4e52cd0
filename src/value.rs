//! In-memory representation of parsed JSON values.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key/value storage for object values. Key order carries no meaning.
pub type Map = BTreeMap<String, Value>;

/// A JSON value.
///
/// Every node exclusively owns its children. Shape accessors (`as_str`,
/// `as_f64`, `get`, `at`, ...) fail with [`Error::TypeMismatch`] when the
/// value has a different shape; nothing is coerced.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

/// The shape tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Create an empty array value.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Create an empty object value.
    pub fn object() -> Self {
        Value::Object(Map::new())
    }

    /// The shape tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get the value as a string slice.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(Error::type_mismatch(ValueKind::String, other.kind())),
        }
    }

    /// Get the value as a double-precision number.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(Error::type_mismatch(ValueKind::Number, other.kind())),
        }
    }

    /// Get the value as a boolean.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::type_mismatch(ValueKind::Boolean, other.kind())),
        }
    }

    /// Borrow the elements of an array value.
    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(Error::type_mismatch(ValueKind::Array, other.kind())),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(Error::type_mismatch(ValueKind::Array, other.kind())),
        }
    }

    /// Borrow the entries of an object value.
    pub fn as_object(&self) -> Result<&Map> {
        match self {
            Value::Object(map) => Ok(map),
            other => Err(Error::type_mismatch(ValueKind::Object, other.kind())),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut Map> {
        match self {
            Value::Object(map) => Ok(map),
            other => Err(Error::type_mismatch(ValueKind::Object, other.kind())),
        }
    }

    /// Look up a key in an object value.
    ///
    /// # Returns
    ///
    /// The element, [`Error::TypeMismatch`] if this is not an object, or
    /// [`Error::FieldNotFound`] if the key is absent.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rsal::Value;
    ///
    /// let value: Value = r#"{"status": 404}"#.parse()?;
    /// assert_eq!(value.get("status")?.as_f64()?, 404.0);
    /// assert!(value.get("missing").is_err());
    /// # Ok::<(), rsal::Error>(())
    /// ```
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.as_object()?
            .get(key)
            .ok_or_else(|| Error::field_not_found(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut Value> {
        self.as_object_mut()?
            .get_mut(key)
            .ok_or_else(|| Error::field_not_found(key))
    }

    /// Look up an element of an array value by position.
    pub fn at(&self, index: usize) -> Result<&Value> {
        let items = self.as_array()?;
        items
            .get(index)
            .ok_or_else(|| Error::index_out_of_bounds(index, items.len()))
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut Value> {
        let items = self.as_array_mut()?;
        let len = items.len();
        items
            .get_mut(index)
            .ok_or_else(|| Error::index_out_of_bounds(index, len))
    }

    /// Insert a key into an object value, returning the previous value for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        Ok(self.as_object_mut()?.insert(key.into(), value.into()))
    }

    /// Append an element to an array value.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        self.as_array_mut()?.push(value.into());
        Ok(())
    }

    /// Number of elements of an array or object.
    ///
    /// Scalars have no size and report a type mismatch.
    pub fn len(&self) -> Result<usize> {
        match self {
            Value::Array(items) => Ok(items.len()),
            Value::Object(map) => Ok(map.len()),
            other => Err(Error::type_mismatch(ValueKind::Array, other.kind())),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl fmt::Display for Value {
    /// Compact JSON text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::writer::to_string(self, false))
    }
}

impl FromStr for Value {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::parse(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from("John Doe"));
        map.insert("age".to_string(), Value::from(30));
        map.insert("tags".to_string(), Value::from(vec![Value::from("admin")]));
        Value::Object(map)
    }

    #[test]
    fn test_kind_and_predicates() {
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert!(Value::from(true).is_bool());
        assert!(Value::from(1.5).is_number());
        assert!(Value::from("x").is_string());
        assert!(Value::array().is_array());
        assert!(Value::object().is_object());
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_accessors_reject_wrong_shape() {
        let value = Value::from("text");
        assert_eq!(value.as_str().unwrap(), "text");

        let err = value.as_f64().unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: ValueKind::Number,
                found: ValueKind::String
            }
        ));
        assert!(value.as_bool().is_err());
        assert!(value.get("key").is_err());
        assert!(value.at(0).is_err());
    }

    #[test]
    fn test_object_access() {
        let mut value = sample();
        assert_eq!(value.get("name").unwrap().as_str().unwrap(), "John Doe");
        assert_eq!(value.get("age").unwrap().as_f64().unwrap(), 30.0);
        assert!(matches!(
            value.get("missing").unwrap_err(),
            Error::FieldNotFound { .. }
        ));

        *value.get_mut("age").unwrap() = Value::from(31);
        assert_eq!(value.get("age").unwrap().as_f64().unwrap(), 31.0);

        let previous = value.insert("age", 32).unwrap();
        assert_eq!(previous, Some(Value::from(31)));
        assert_eq!(value.len().unwrap(), 3);
    }

    #[test]
    fn test_array_access() {
        let mut value = Value::array();
        value.push(1).unwrap();
        value.push("two").unwrap();
        assert_eq!(value.len().unwrap(), 2);
        assert_eq!(value.at(0).unwrap().as_f64().unwrap(), 1.0);

        let err = value.at(5).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 5, len: 2 }));

        *value.at_mut(1).unwrap() = Value::Null;
        assert!(value.at(1).unwrap().is_null());
    }

    #[test]
    fn test_len_of_scalars_is_a_type_mismatch() {
        assert!(matches!(
            Value::from("text").len(),
            Err(Error::TypeMismatch {
                expected: ValueKind::Array,
                found: ValueKind::String
            })
        ));
        assert!(Value::Null.is_empty().is_err());
        assert!(Value::array().is_empty().unwrap());
        assert!(Value::object().is_empty().unwrap());
    }
}
