//! Content type schemas - the declared shape of each class of content

mod presets;
mod registry;

pub use presets::{article, default_types, documentation, project};
pub use registry::{ContentTypeRegistry, SchemaResolver};

use serde::{Deserialize, Serialize};

/// Front-matter keys handled by the engine itself rather than by schemas
pub const RESERVED_KEYS: &[&str] = &["type", "createdAt", "updatedAt"];

/// Keys the engine writes into every entity record
pub const RECORD_KEYS: &[&str] = &["id", "type", "path", "url", "content"];

/// Semantic kind of a property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Number,
    Bool,
    StringArray,
    Object {
        #[serde(default)]
        properties: Vec<PropertyDefinition>,
    },
}

impl PropertyKind {
    /// Human readable name used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            PropertyKind::String => "a string",
            PropertyKind::Number => "a number",
            PropertyKind::Bool => "a boolean",
            PropertyKind::StringArray => "a list of strings",
            PropertyKind::Object { .. } => "an object",
        }
    }

    /// Scalar and array properties are indexed and filterable; objects are not
    pub fn is_indexable(&self) -> bool {
        !matches!(self, PropertyKind::Object { .. })
    }
}

/// A single declared property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: PropertyKind,
    #[serde(default)]
    pub required: bool,
}

impl PropertyDefinition {
    pub fn required(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// The declared shape of one content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeSchema {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl ContentTypeSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: Vec::new(),
        }
    }

    /// Append a property definition
    pub fn property(mut self, definition: PropertyDefinition) -> Self {
        self.properties.push(definition);
        self
    }

    /// Look up a property definition by name
    pub fn get(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Title property is used as the default label of internal links
    pub fn has_title(&self) -> bool {
        matches!(
            self.get("title").map(|p| &p.kind),
            Some(PropertyKind::String)
        )
    }
}
