use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::{FieldType, FormSchema};

/// Current values keyed by field `name`.
///
/// The host owns and mutates the snapshot; the engine only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueSnapshot(Map<String, Value>);

impl ValueSnapshot {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Non-object JSON yields an empty snapshot.
    pub fn from_value(value: &Value) -> Self {
        Self(value.as_object().cloned().unwrap_or_default())
    }

    /// Seeds every field that declares a `defaultValue`.
    pub fn from_defaults(schema: &FormSchema) -> Self {
        let mut map = Map::new();
        for field in &schema.fields {
            if let Some(default) = &field.default_value {
                map.insert(field.name.clone(), default.clone());
            }
        }
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Copy of the snapshot with the given names dropped.
    pub(crate) fn without<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = self.0.clone();
        for name in names {
            map.remove(name);
        }
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueSnapshot {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

/// Whether a value should fail a `required` rule.
pub fn is_empty_value(value: Option<&Value>, kind: FieldType) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Bool(flag)) => kind.false_is_empty() && !flag,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Strict equality against a stored value; a missing value never matches.
pub fn strict_equals(stored: Option<&Value>, expected: &Value) -> bool {
    match stored {
        None => false,
        Some(stored) => values_equal(stored, expected),
    }
}

/// JSON equality that ignores integer/float representation.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Numeric reading of a value; numeric strings are accepted.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(num) => num.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|num| num.is_finite()),
        _ => None,
    }
}

pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
