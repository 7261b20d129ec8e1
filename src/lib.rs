//! cms-backend: a schema-driven, file-sourced content store
//!
//! Markdown documents with a YAML front-matter header are validated against
//! registered content type schemas, rendered to HTML with internal links
//! rewritten, and indexed into an immutable snapshot that answers lookup,
//! listing, counting and section queries. A small HTTP façade and a sitemap
//! generator sit on top.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod helpers;
pub mod schema;
pub mod server;
pub mod sitemap;
pub mod store;

pub use error::{CmsError, ParseError, QueryError, Result, SchemaError};
pub use store::{CmsBackend, CmsBackendBuilder};

use std::path::{Path, PathBuf};

use content::ContentFolder;

/// The application: configuration plus the directory it was loaded from
#[derive(Debug, Clone)]
pub struct Cms {
    /// Backend configuration
    pub config: config::CmsConfig,
    /// Directory relative paths in the configuration are resolved against
    pub base_dir: PathBuf,
    /// Configuration file, watched for changes in serve mode
    pub config_path: PathBuf,
}

impl Cms {
    /// Load `config_path` if it exists, otherwise use the default configuration
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();
        let base_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let config = if config_path.exists() {
            config::CmsConfig::load(&config_path)?
        } else {
            tracing::warn!(
                "No configuration found at {:?}, using defaults",
                config_path
            );
            config::CmsConfig::default()
        };

        Ok(Self {
            config,
            base_dir,
            config_path,
        })
    }

    /// Content folders with resolved paths
    pub fn folders(&self) -> Vec<ContentFolder> {
        self.config.resolve_folders(&self.base_dir)
    }

    /// Register the configured types and folders and run the initial build
    pub fn backend(&self) -> Result<CmsBackend> {
        let mut builder = CmsBackend::builder().with_pagination(self.config.pagination);

        if self.config.content_types.is_empty() {
            builder = builder.with_default_types()?;
        } else {
            for schema in &self.config.content_types {
                builder = builder.add_content_type(schema.clone())?;
            }
        }

        for folder in self.folders() {
            builder = builder.add_content_folder(folder);
        }

        builder.build()
    }
}
