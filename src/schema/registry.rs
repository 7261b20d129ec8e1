//! Registry of content type schemas

use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

use super::{ContentTypeSchema, PropertyDefinition, PropertyKind, RECORD_KEYS, RESERVED_KEYS};
use crate::error::SchemaError;

/// Anything that can hand out a schema by type name
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, type_name: &str) -> Result<Arc<ContentTypeSchema>, SchemaError>;
}

/// Append-only set of schemas, populated before the first build
///
/// Once handed to a backend the registry sits behind an `Arc` and is never
/// mutated again.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeRegistry {
    schemas: IndexMap<String, Arc<ContentTypeSchema>>,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema
    pub fn register(&mut self, schema: ContentTypeSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(SchemaError::DuplicateType(schema.name));
        }
        validate_properties(&schema.name, &schema.properties, true)?;

        tracing::debug!(
            "Registered content type {} ({} properties)",
            schema.name,
            schema.properties.len()
        );
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Registered schemas in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ContentTypeSchema>> {
        self.schemas.values()
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaResolver for ContentTypeRegistry {
    fn resolve(&self, type_name: &str) -> Result<Arc<ContentTypeSchema>, SchemaError> {
        self.schemas
            .get(type_name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))
    }
}

fn validate_properties(
    type_name: &str,
    properties: &[PropertyDefinition],
    top_level: bool,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for property in properties {
        if top_level
            && (RESERVED_KEYS.contains(&property.name.as_str())
                || RECORD_KEYS.contains(&property.name.as_str()))
        {
            return Err(SchemaError::ReservedProperty {
                content_type: type_name.to_string(),
                property: property.name.clone(),
            });
        }
        if !seen.insert(property.name.as_str()) {
            return Err(SchemaError::DuplicateProperty {
                content_type: type_name.to_string(),
                property: property.name.clone(),
            });
        }
        if let PropertyKind::Object { properties } = &property.kind {
            validate_properties(type_name, properties, false)?;
        }
    }
    Ok(())
}
