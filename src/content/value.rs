//! Property values - the tagged values stored in an entity's property bag

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A validated property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    StringArray(Vec<String>),
    Object(IndexMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Convert into a JSON value for records
    pub fn to_json(&self) -> JsonValue {
        match self {
            PropertyValue::String(s) => JsonValue::String(s.clone()),
            PropertyValue::Number(n) => number_to_json(*n),
            PropertyValue::Bool(b) => JsonValue::Bool(*b),
            PropertyValue::StringArray(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
            PropertyValue::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// The scalar values this property contributes to the index.
    /// Arrays contribute one value per element, objects contribute nothing.
    pub fn index_values(&self) -> Vec<ScalarValue> {
        match self {
            PropertyValue::String(s) => vec![ScalarValue::String(s.clone())],
            PropertyValue::Number(n) => vec![ScalarValue::Number(*n)],
            PropertyValue::Bool(b) => vec![ScalarValue::Bool(*b)],
            PropertyValue::StringArray(items) => {
                items.iter().cloned().map(ScalarValue::String).collect()
            }
            PropertyValue::Object(_) => Vec::new(),
        }
    }

    /// Sort key, only defined for scalars
    pub fn as_scalar(&self) -> Option<ScalarValue> {
        match self {
            PropertyValue::String(s) => Some(ScalarValue::String(s.clone())),
            PropertyValue::Number(n) => Some(ScalarValue::Number(*n)),
            PropertyValue::Bool(b) => Some(ScalarValue::Bool(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A single comparable value: a scalar property or one array element.
///
/// Used as index key, filter operand, sort key and count bucket. Ordering is
/// total: booleans before numbers before strings, numbers by `total_cmp`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl ScalarValue {
    fn rank(&self) -> u8 {
        match self {
            ScalarValue::Bool(_) => 0,
            ScalarValue::Number(_) => 1,
            ScalarValue::String(_) => 2,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ScalarValue::Bool(b) => JsonValue::Bool(*b),
            ScalarValue::Number(n) => number_to_json(*n),
            ScalarValue::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl Ord for ScalarValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a.cmp(b),
            (ScalarValue::Number(a), ScalarValue::Number(b)) => {
                normalize_zero(*a).total_cmp(&normalize_zero(*b))
            }
            (ScalarValue::String(a), ScalarValue::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            ScalarValue::Bool(b) => b.hash(state),
            ScalarValue::Number(n) => normalize_zero(*n).to_bits().hash(state),
            ScalarValue::String(s) => s.hash(state),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Number(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

fn normalize_zero(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

/// Integral numbers are emitted without a fractional part
fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}
