//! Query requests, filters and result shapes

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::content::ScalarValue;
use crate::error::QueryError;

/// Conjunction of conditions selecting entities of one type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFilter {
    /// Match a single slug (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Restrict to a section and its descendants, e.g. `guides/start`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl EntityFilter {
    pub fn by_slug(slug: &str) -> Self {
        Self {
            slug: Some(slug.to_string()),
            ..Self::default()
        }
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn in_section(mut self, section: &str) -> Self {
        self.section = Some(section.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.slug.is_none() && self.section.is_none() && self.conditions.is_empty()
    }
}

/// How a condition compares a property with its operand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Scalar equality; on array properties, membership of the operand
    #[default]
    Equals,
    /// Array property contains the operand
    Contains,
    /// Property value (or any array element) is one of the operands
    In,
}

/// Operand of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    One(ScalarValue),
    Many(Vec<ScalarValue>),
}

/// A single property condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub property: String,
    #[serde(default)]
    pub operator: Operator,
    pub value: ConditionValue,
}

impl Condition {
    pub fn equals(property: &str, value: impl Into<ScalarValue>) -> Self {
        Self {
            property: property.to_string(),
            operator: Operator::Equals,
            value: ConditionValue::One(value.into()),
        }
    }

    pub fn contains(property: &str, value: impl Into<ScalarValue>) -> Self {
        Self {
            property: property.to_string(),
            operator: Operator::Contains,
            value: ConditionValue::One(value.into()),
        }
    }

    pub fn one_of(property: &str, values: Vec<ScalarValue>) -> Self {
        Self {
            property: property.to_string(),
            operator: Operator::In,
            value: ConditionValue::Many(values),
        }
    }

    /// Operands as a slice, checking arity against the operator
    pub(crate) fn operands(&self) -> Result<Vec<&ScalarValue>, QueryError> {
        match (&self.operator, &self.value) {
            (Operator::In, ConditionValue::Many(values)) => Ok(values.iter().collect()),
            (_, ConditionValue::One(value)) => Ok(vec![value]),
            (operator, ConditionValue::Many(_)) => Err(QueryError::InvalidFilter(format!(
                "operator {:?} on {} takes a single value",
                operator, self.property
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort by a named property; ties are broken by entity id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn asc(property: &str) -> Self {
        Self {
            property: property.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(property: &str) -> Self {
        Self {
            property: property.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub filter: EntityFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntitiesRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub filter: EntityFilter,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub page_token: Option<String>,
    /// Include rendered bodies in listing records
    #[serde(default)]
    pub include_content: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountPropertyValuesRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    pub property: String,
    #[serde(default)]
    pub filter: EntityFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSectionsRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub root_path: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Size of the whole filtered result set
    pub total: usize,
}

/// Number of entities holding one property value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountPropertyRow {
    pub value: ScalarValue,
    pub count: usize,
}

/// Resumable position in a sorted result set: the last item handed out
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageCursor {
    pub id: String,
    pub key: Option<ScalarValue>,
}

/// Wire form of a cursor. Numbers travel as their IEEE-754 bits so the
/// resumed key compares equal to the one stored in the index.
#[derive(Serialize, Deserialize)]
struct CursorToken {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<CursorKey>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
enum CursorKey {
    Bool(bool),
    Number(u64),
    String(String),
}

impl From<&ScalarValue> for CursorKey {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Bool(b) => CursorKey::Bool(*b),
            ScalarValue::Number(n) => CursorKey::Number(n.to_bits()),
            ScalarValue::String(s) => CursorKey::String(s.clone()),
        }
    }
}

impl From<CursorKey> for ScalarValue {
    fn from(key: CursorKey) -> Self {
        match key {
            CursorKey::Bool(b) => ScalarValue::Bool(b),
            CursorKey::Number(bits) => ScalarValue::Number(f64::from_bits(bits)),
            CursorKey::String(s) => ScalarValue::String(s),
        }
    }
}

impl PageCursor {
    pub fn encode(&self) -> String {
        let token = CursorToken {
            id: self.id.clone(),
            key: self.key.as_ref().map(CursorKey::from),
        };
        // Serializing plain strings and integers cannot fail
        let json = serde_json::to_vec(&token).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, QueryError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| QueryError::InvalidPageToken)?;
        let token: CursorToken =
            serde_json::from_slice(&bytes).map_err(|_| QueryError::InvalidPageToken)?;
        Ok(PageCursor {
            id: token.id,
            key: token.key.map(ScalarValue::from),
        })
    }
}
