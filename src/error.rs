//! Error types for the content engine
//!
//! Build-time errors (`ConfigurationError`, [`SchemaError`], [`ParseError`]) abort
//! the boot sequence. [`QueryError`] is recoverable and returned per call.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, CmsError>;

/// Top-level error for building and querying the store
#[derive(Debug, Error)]
pub enum CmsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl CmsError {
    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        CmsError::Parse {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CmsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while registering or resolving content types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Content type already registered: {0}")]
    DuplicateType(String),

    #[error("Unknown content type: {0}")]
    UnknownType(String),

    #[error("Content type {content_type} declares property {property} more than once")]
    DuplicateProperty {
        content_type: String,
        property: String,
    },

    #[error("Content type {content_type} declares reserved property {property}")]
    ReservedProperty {
        content_type: String,
        property: String,
    },
}

/// Errors raised while turning a source document into an entity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Property {property} is not declared by content type {content_type}")]
    UnknownProperty {
        content_type: String,
        property: String,
    },

    #[error("Required property {property} is missing for content type {content_type}")]
    MissingProperty {
        content_type: String,
        property: String,
    },

    #[error("Property {property} expects {expected}, found {found}")]
    PropertyType {
        property: String,
        expected: String,
        found: String,
    },

    #[error("Duplicate {content_type} entity {slug} (already defined in {first:?})")]
    DuplicateEntity {
        content_type: String,
        slug: String,
        first: PathBuf,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to render markdown: {0}")]
    Render(String),
}

/// Recoverable errors returned by query operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous result: {count} {content_type} entities match")]
    AmbiguousResult { content_type: String, count: usize },

    #[error("Unknown content type: {0}")]
    UnknownType(String),

    #[error("Property {property} is not declared by content type {content_type}")]
    UnknownProperty {
        content_type: String,
        property: String,
    },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid page token")]
    InvalidPageToken,
}
