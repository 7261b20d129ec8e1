//! Parsed content entities

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use super::value::{PropertyValue, ScalarValue};
use crate::helpers::{date_xml, entity_url};

/// Loosely typed key/value record handed to serializers
pub type Record = serde_json::Map<String, JsonValue>;

/// One parsed content item, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Lowercased file stem, unique within the content type
    pub slug: String,
    pub content_type: String,
    /// Validated properties in schema declaration order
    pub properties: IndexMap<String, PropertyValue>,
    /// Rendered body with internal links rewritten
    pub content: String,
    /// Folder segments between the content folder root and the file
    pub section: Vec<String>,
    pub source: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Modification time of the source file
    pub modified: Option<DateTime<Utc>>,
}

impl Entity {
    /// Stable identifier, unique within the content type
    pub fn id(&self) -> &str {
        &self.slug
    }

    /// Canonical site-relative URL
    pub fn url(&self) -> String {
        entity_url(&self.content_type, &self.slug)
    }

    pub fn section_path(&self) -> String {
        self.section.join("/")
    }

    pub fn title(&self) -> Option<&str> {
        self.properties.get("title").and_then(PropertyValue::as_str)
    }

    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }

    /// Last modification: `updatedAt`, then `createdAt`, then file mtime
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at).or(self.modified)
    }

    /// Value used when sorting by `property`; system fields are sortable too
    pub fn sort_key(&self, property: &str) -> Option<ScalarValue> {
        match property {
            "id" => Some(ScalarValue::String(self.slug.clone())),
            "path" => Some(ScalarValue::String(self.section_path())),
            "createdAt" => self.created_at.map(|d| ScalarValue::String(date_xml(&d))),
            "updatedAt" => self.updated_at.map(|d| ScalarValue::String(date_xml(&d))),
            _ => self.properties.get(property).and_then(PropertyValue::as_scalar),
        }
    }

    /// Build the serializable record for this entity
    pub fn to_record(&self, include_content: bool) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), JsonValue::String(self.slug.clone()));
        record.insert("type".into(), JsonValue::String(self.content_type.clone()));
        record.insert("path".into(), JsonValue::String(self.section_path()));
        record.insert("url".into(), JsonValue::String(self.url()));
        for (name, value) in &self.properties {
            record.insert(name.clone(), value.to_json());
        }
        if let Some(created_at) = &self.created_at {
            record.insert("createdAt".into(), JsonValue::String(date_xml(created_at)));
        }
        if let Some(updated_at) = &self.updated_at {
            record.insert("updatedAt".into(), JsonValue::String(date_xml(updated_at)));
        }
        if include_content {
            record.insert("content".into(), JsonValue::String(self.content.clone()));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::parse_date_string;

    fn entity() -> Entity {
        let mut properties = IndexMap::new();
        properties.insert("title".to_string(), PropertyValue::String("Hello".into()));
        properties.insert(
            "tags".to_string(),
            PropertyValue::StringArray(vec!["x".into(), "y".into()]),
        );
        Entity {
            slug: "hello".into(),
            content_type: "blog".into(),
            properties,
            content: "<p>Hi</p>".into(),
            section: vec!["guides".into(), "start".into()],
            source: PathBuf::from("guides/start/hello.md"),
            created_at: parse_date_string("2024-01-01"),
            updated_at: None,
            modified: parse_date_string("2024-03-01"),
        }
    }

    #[test]
    fn test_record_shape() {
        let record = entity().to_record(true);
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["id", "type", "path", "url", "title", "tags", "createdAt", "content"]
        );
        assert_eq!(record["path"], "guides/start");
        assert_eq!(record["url"], "/blog/hello");
        assert_eq!(record["tags"], serde_json::json!(["x", "y"]));
    }

    #[test]
    fn test_record_without_content() {
        assert!(!entity().to_record(false).contains_key("content"));
    }

    #[test]
    fn test_last_modified_fallback() {
        let mut entity = entity();
        assert_eq!(entity.last_modified(), entity.created_at);
        entity.created_at = None;
        assert_eq!(entity.last_modified(), entity.modified);
    }
}
