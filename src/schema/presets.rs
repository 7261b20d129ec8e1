//! Built-in document types used by the docs and blog hosts

use super::{ContentTypeSchema, PropertyDefinition, PropertyKind};

/// Blog/docs article
pub fn article() -> ContentTypeSchema {
    ContentTypeSchema::new("article")
        .property(PropertyDefinition::required("title", PropertyKind::String))
        .property(PropertyDefinition::required(
            "description",
            PropertyKind::String,
        ))
        .property(PropertyDefinition::required(
            "projects",
            PropertyKind::StringArray,
        ))
}

/// Project showcase entry
pub fn project() -> ContentTypeSchema {
    ContentTypeSchema::new("project")
        .property(PropertyDefinition::required("title", PropertyKind::String))
        .property(PropertyDefinition::required(
            "description",
            PropertyKind::String,
        ))
        .property(PropertyDefinition::required(
            "tags",
            PropertyKind::StringArray,
        ))
        .property(PropertyDefinition::optional(
            "githubLink",
            PropertyKind::String,
        ))
        .property(PropertyDefinition::optional(
            "documentationLink",
            PropertyKind::String,
        ))
        .property(PropertyDefinition::optional(
            "applicationLink",
            PropertyKind::String,
        ))
        .property(PropertyDefinition::optional(
            "projectType",
            PropertyKind::String,
        ))
}

/// Documentation page: only a title is needed, everything else is the body
pub fn documentation() -> ContentTypeSchema {
    ContentTypeSchema::new("documentation")
        .property(PropertyDefinition::required("title", PropertyKind::String))
        .property(PropertyDefinition::optional(
            "description",
            PropertyKind::String,
        ))
}

/// Types registered when the configuration declares none
pub fn default_types() -> Vec<ContentTypeSchema> {
    vec![project(), article(), documentation()]
}
