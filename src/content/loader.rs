//! Content loader - reads source documents from content folders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CmsError, Result};

/// A named root scanned for markdown sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFolder {
    pub name: String,
    pub path: PathBuf,
    /// Type used for documents whose front-matter has no `type` key
    #[serde(default)]
    pub default_type: Option<String>,
}

impl ContentFolder {
    pub fn new<P: AsRef<Path>>(name: &str, path: P) -> Self {
        Self {
            name: name.to_string(),
            path: path.as_ref().to_path_buf(),
            default_type: None,
        }
    }

    pub fn with_default_type(mut self, content_type: &str) -> Self {
        self.default_type = Some(content_type.to_string());
        self
    }
}

/// Raw source of one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Full path on disk
    pub path: PathBuf,
    /// Path relative to the content folder root
    pub relative_path: PathBuf,
    pub text: String,
    pub modified: Option<DateTime<Utc>>,
}

impl SourceDocument {
    /// In-memory document, mostly useful for tests and embedding
    pub fn new<P: AsRef<Path>>(relative_path: P, text: &str) -> Self {
        Self {
            path: relative_path.as_ref().to_path_buf(),
            relative_path: relative_path.as_ref().to_path_buf(),
            text: text.to_string(),
            modified: None,
        }
    }
}

/// Read every markdown file below a content folder, in file-name order
pub fn load_folder(folder: &ContentFolder) -> Result<Vec<SourceDocument>> {
    if !folder.path.is_dir() {
        return Err(CmsError::Configuration(format!(
            "content folder {} does not exist: {:?}",
            folder.name, folder.path
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(&folder.path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&folder.path).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            CmsError::io(path, source)
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || !is_markdown_file(path) {
            continue;
        }

        documents.push(load_document(&folder.path, path)?);
    }

    tracing::debug!(
        "Loaded {} documents from folder {} ({:?})",
        documents.len(),
        folder.name,
        folder.path
    );

    Ok(documents)
}

/// Load a single document from a file
fn load_document(root: &Path, path: &Path) -> Result<SourceDocument> {
    let text = fs::read_to_string(path).map_err(|e| CmsError::io(path, e))?;

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

    Ok(SourceDocument {
        path: path.to_path_buf(),
        relative_path,
        text,
        modified,
    })
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
