//! Markdown entity parser
//!
//! Parsing is split in two steps so a build can learn every slug before any
//! body is rendered: [`MarkdownParser::read`] validates the header, and
//! [`MarkdownParser::finish`] renders the body and rewrites internal links.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_yaml::Value as YamlValue;
use std::path::PathBuf;
use std::sync::Arc;

use super::frontmatter::{yaml_kind, FrontMatter};
use super::links::{InnerLinkRewriter, LinkRewriter, LinkTarget, LinkTargets};
use super::loader::SourceDocument;
use super::markdown::{MarkdownRenderer, Renderer};
use super::value::PropertyValue;
use super::Entity;
use crate::error::ParseError;
use crate::schema::{PropertyDefinition, PropertyKind, SchemaResolver};

/// A document whose header has been validated but whose body is not rendered yet
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDraft {
    pub slug: String,
    pub content_type: String,
    pub properties: IndexMap<String, PropertyValue>,
    pub body: String,
    pub section: Vec<String>,
    pub source: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl EntityDraft {
    pub fn link_target(&self) -> LinkTarget {
        LinkTarget {
            content_type: self.content_type.clone(),
            slug: self.slug.clone(),
            title: self
                .properties
                .get("title")
                .and_then(PropertyValue::as_str)
                .map(str::to_string),
        }
    }
}

/// A finished entity plus the references that could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntity {
    pub entity: Entity,
    pub unresolved: Vec<String>,
}

/// Turns source documents into entities
#[derive(Clone)]
pub struct MarkdownParser {
    renderer: Arc<dyn Renderer>,
    rewriter: Arc<dyn LinkRewriter>,
}

impl MarkdownParser {
    pub fn new(renderer: Arc<dyn Renderer>, rewriter: Arc<dyn LinkRewriter>) -> Self {
        Self { renderer, rewriter }
    }

    pub fn renderer(&self) -> Arc<dyn Renderer> {
        self.renderer.clone()
    }

    pub fn rewriter(&self) -> Arc<dyn LinkRewriter> {
        self.rewriter.clone()
    }

    /// Split and validate the header, derive slug and section
    pub fn read(
        &self,
        document: &SourceDocument,
        default_type: Option<&str>,
        schemas: &dyn SchemaResolver,
    ) -> Result<EntityDraft, ParseError> {
        let (fm, body) = FrontMatter::parse(&document.text)?;

        let content_type = fm
            .content_type
            .as_deref()
            .or(default_type)
            .ok_or_else(|| ParseError::MissingProperty {
                content_type: "(none)".to_string(),
                property: "type".to_string(),
            })?;
        let schema = schemas.resolve(content_type)?;

        let properties = validate_properties(&schema.name, "", &schema.properties, fm.fields)?;

        let slug = document
            .relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ParseError::MalformedDocument("file has no name".to_string()))?;

        let section = document
            .relative_path
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(EntityDraft {
            slug,
            content_type: schema.name.clone(),
            properties,
            body: body.to_string(),
            section,
            source: document.path.clone(),
            created_at: fm.created_at,
            updated_at: fm.updated_at,
            modified: document.modified,
        })
    }

    /// Render the body and rewrite its internal links
    pub fn finish(
        &self,
        draft: EntityDraft,
        targets: &LinkTargets,
    ) -> Result<ParsedEntity, ParseError> {
        let html = self
            .renderer
            .render(&draft.body)
            .map_err(|e| ParseError::Render(e.to_string()))?;
        let rewritten = self.rewriter.rewrite(&html, &draft.content_type, targets);

        let entity = Entity {
            slug: draft.slug,
            content_type: draft.content_type,
            properties: draft.properties,
            content: rewritten.html,
            section: draft.section,
            source: draft.source,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
            modified: draft.modified,
        };

        Ok(ParsedEntity {
            entity,
            unresolved: rewritten.unresolved,
        })
    }

    /// Parse one document in a single step
    pub fn parse(
        &self,
        document: &SourceDocument,
        default_type: Option<&str>,
        schemas: &dyn SchemaResolver,
        targets: &LinkTargets,
    ) -> Result<ParsedEntity, ParseError> {
        let draft = self.read(document, default_type, schemas)?;
        self.finish(draft, targets)
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(
            Arc::new(MarkdownRenderer::new()),
            Arc::new(InnerLinkRewriter::new()),
        )
    }
}

impl std::fmt::Debug for MarkdownParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownParser").finish_non_exhaustive()
    }
}

/// Validate header fields against property definitions.
/// The result follows declaration order.
fn validate_properties(
    content_type: &str,
    prefix: &str,
    definitions: &[PropertyDefinition],
    mut fields: IndexMap<String, YamlValue>,
) -> Result<IndexMap<String, PropertyValue>, ParseError> {
    if let Some(unknown) = fields
        .keys()
        .find(|key| !definitions.iter().any(|d| &d.name == *key))
    {
        return Err(ParseError::UnknownProperty {
            content_type: content_type.to_string(),
            property: format!("{}{}", prefix, unknown),
        });
    }

    let mut properties = IndexMap::new();
    for definition in definitions {
        let name = format!("{}{}", prefix, definition.name);
        let value = match fields.shift_remove(&definition.name) {
            Some(value) if !value.is_null() => value,
            _ if definition.required => {
                return Err(ParseError::MissingProperty {
                    content_type: content_type.to_string(),
                    property: name,
                })
            }
            _ => continue,
        };

        let converted = convert_value(content_type, &name, &definition.kind, value)?;
        properties.insert(definition.name.clone(), converted);
    }

    Ok(properties)
}

fn convert_value(
    content_type: &str,
    name: &str,
    kind: &PropertyKind,
    value: YamlValue,
) -> Result<PropertyValue, ParseError> {
    let mismatch = |found: &str| ParseError::PropertyType {
        property: name.to_string(),
        expected: kind.describe().to_string(),
        found: found.to_string(),
    };

    match (kind, value) {
        (PropertyKind::String, YamlValue::String(s)) => Ok(PropertyValue::String(s)),
        (PropertyKind::Number, YamlValue::Number(n)) => n
            .as_f64()
            .filter(|n| n.is_finite())
            .map(PropertyValue::Number)
            .ok_or_else(|| mismatch("a non-finite number")),
        (PropertyKind::Bool, YamlValue::Bool(b)) => Ok(PropertyValue::Bool(b)),
        (PropertyKind::StringArray, YamlValue::Sequence(items)) => items
            .into_iter()
            .map(|item| match item {
                YamlValue::String(s) => Ok(s),
                other => Err(mismatch(&format!("a list containing {}", yaml_kind(&other)))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::StringArray),
        (PropertyKind::Object { properties }, YamlValue::Mapping(mapping)) => {
            let mut fields = IndexMap::new();
            for (key, value) in mapping {
                match key {
                    YamlValue::String(key) => {
                        fields.insert(key, value);
                    }
                    other => {
                        return Err(mismatch(&format!(
                            "a mapping with {} key",
                            yaml_kind(&other)
                        )))
                    }
                }
            }
            let prefix = format!("{}.", name);
            validate_properties(content_type, &prefix, properties, fields)
                .map(PropertyValue::Object)
        }
        (_, other) => Err(mismatch(yaml_kind(&other))),
    }
}
