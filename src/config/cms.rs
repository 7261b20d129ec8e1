//! Backend configuration (cms.yml)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::ContentFolder;
use crate::error::{CmsError, Result};
use crate::schema::ContentTypeSchema;

/// Main backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Directory the folder paths are relative to
    pub content_dir: String,
    pub folders: Vec<ContentFolder>,
    /// Declared content types; the built-in types are used when empty
    pub content_types: Vec<ContentTypeSchema>,
    pub site: SiteConfig,
    pub cors: CorsConfig,
    pub pagination: PaginationConfig,
    pub server: ServerConfig,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            folders: vec![ContentFolder::new("blog", "blog").with_default_type("article")],
            content_types: Vec::new(),
            site: SiteConfig::default(),
            cors: CorsConfig::default(),
            pagination: PaginationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl CmsConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CmsError::io(path, e))?;
        let config: CmsConfig = serde_yaml::from_str(&content)
            .map_err(|e| CmsError::Configuration(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject configurations the backend cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.folders.is_empty() {
            return Err(CmsError::Configuration(
                "at least one content folder is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for folder in &self.folders {
            if folder.name.trim().is_empty() {
                return Err(CmsError::Configuration(
                    "content folder name must not be empty".to_string(),
                ));
            }
            if !names.insert(folder.name.as_str()) {
                return Err(CmsError::Configuration(format!(
                    "duplicate content folder: {}",
                    folder.name
                )));
            }
        }

        self.pagination.validate()
    }

    /// Folders with paths resolved against `base_dir` and `content_dir`
    pub fn resolve_folders<P: AsRef<Path>>(&self, base_dir: P) -> Vec<ContentFolder> {
        let root: PathBuf = base_dir.as_ref().join(&self.content_dir);
        self.folders
            .iter()
            .map(|folder| ContentFolder {
                path: root.join(&folder.path),
                ..folder.clone()
            })
            .collect()
    }
}

/// Public site settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute base URL used in the sitemap, e.g. `https://example.com`
    pub sitemap_base_address: String,
}

/// CORS allow-list for the HTTP façade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub hosts: Vec<String>,
}

/// Listing page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(CmsError::Configuration(
                "page sizes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective page size for a request; absent or zero means the default
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        let size = match requested {
            Some(size) if size > 0 => size,
            _ => self.default_page_size,
        };
        size.min(self.max_page_size).max(1)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 4000,
        }
    }
}
