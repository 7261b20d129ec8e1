//! Content store: builds immutable snapshots and answers queries against them

mod index;
mod query;
mod sections;
mod snapshot;

pub use query::{
    Condition, ConditionValue, CountPropertyRow, CountPropertyValuesRequest, EntityFilter,
    GetEntitiesRequest, GetEntityRequest, GetSectionsRequest, Operator, PaginatedResult,
    SortDirection, SortOrder,
};
pub use sections::SectionItem;
pub use snapshot::{BrokenLink, Snapshot, TypeCollection};

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::PaginationConfig;
use crate::content::{ContentFolder, LinkRewriter, MarkdownParser, Record, Renderer};
use crate::error::{CmsError, QueryError, Result, SchemaError};
use crate::schema::{default_types, ContentTypeRegistry, ContentTypeSchema};

/// The content backend, shared by `Arc` between request handlers
///
/// Queries read the currently published [`Snapshot`]; [`CmsBackend::reload`]
/// builds a new one off to the side and swaps it in.
pub struct CmsBackend {
    registry: Arc<ContentTypeRegistry>,
    folders: Vec<ContentFolder>,
    parser: MarkdownParser,
    pagination: PaginationConfig,
    current: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
    generation: AtomicU64,
}

impl CmsBackend {
    pub fn builder() -> CmsBackendBuilder {
        CmsBackendBuilder::new()
    }

    /// The currently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn registry(&self) -> &ContentTypeRegistry {
        &self.registry
    }

    pub fn folders(&self) -> &[ContentFolder] {
        &self.folders
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Rebuild from the content folders and publish the result.
    ///
    /// On failure the previously published snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.reload_lock.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot = match Snapshot::build(&self.registry, &self.folders, &self.parser, generation)
        {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                tracing::error!("Rebuild {} failed, keeping current snapshot: {}", generation, e);
                return Err(e);
            }
        };

        *self.current.write() = snapshot.clone();
        tracing::info!("Published snapshot {}", generation);
        Ok(snapshot)
    }

    pub fn get_entity(&self, request: &GetEntityRequest) -> std::result::Result<Record, QueryError> {
        self.snapshot().get_entity(request)
    }

    pub fn get_entities(
        &self,
        request: &GetEntitiesRequest,
    ) -> std::result::Result<PaginatedResult<Record>, QueryError> {
        self.snapshot().get_entities(request, &self.pagination)
    }

    pub fn count_property_values(
        &self,
        request: &CountPropertyValuesRequest,
    ) -> std::result::Result<Vec<CountPropertyRow>, QueryError> {
        self.snapshot().count_property_values(request)
    }

    pub fn get_sections(
        &self,
        request: &GetSectionsRequest,
    ) -> std::result::Result<Vec<SectionItem>, QueryError> {
        self.snapshot().get_sections(request)
    }
}

impl std::fmt::Debug for CmsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsBackend")
            .field("types", &self.registry.type_names())
            .field("folders", &self.folders)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Collects schemas, folders and capabilities, then performs the first build
#[derive(Debug, Default)]
pub struct CmsBackendBuilder {
    registry: ContentTypeRegistry,
    folders: Vec<ContentFolder>,
    parser: MarkdownParser,
    pagination: PaginationConfig,
}

impl CmsBackendBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_content_type(
        mut self,
        schema: ContentTypeSchema,
    ) -> std::result::Result<Self, SchemaError> {
        self.registry.register(schema)?;
        Ok(self)
    }

    /// Register the built-in `project` and `article` types
    pub fn with_default_types(mut self) -> std::result::Result<Self, SchemaError> {
        for schema in default_types() {
            self.registry.register(schema)?;
        }
        Ok(self)
    }

    pub fn add_content_folder(mut self, folder: ContentFolder) -> Self {
        self.folders.push(folder);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.parser = MarkdownParser::new(renderer, self.parser.rewriter());
        self
    }

    pub fn with_link_rewriter(mut self, rewriter: Arc<dyn LinkRewriter>) -> Self {
        self.parser = MarkdownParser::new(self.parser.renderer(), rewriter);
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Freeze the registry and run the initial build
    pub fn build(self) -> Result<CmsBackend> {
        if self.registry.is_empty() {
            return Err(CmsError::Configuration(
                "no content types registered".to_string(),
            ));
        }
        self.pagination.validate()?;

        let mut names = HashSet::new();
        for folder in &self.folders {
            if !names.insert(folder.name.as_str()) {
                return Err(CmsError::Configuration(format!(
                    "duplicate content folder: {}",
                    folder.name
                )));
            }
            if let Some(default_type) = &folder.default_type {
                if !self.registry.type_names().contains(&default_type.as_str()) {
                    return Err(CmsError::Configuration(format!(
                        "folder {} uses unregistered default type {}",
                        folder.name, default_type
                    )));
                }
            }
        }

        let registry = Arc::new(self.registry);
        let snapshot = Snapshot::build(&registry, &self.folders, &self.parser, 1)?;

        Ok(CmsBackend {
            registry,
            folders: self.folders,
            parser: self.parser,
            pagination: self.pagination,
            current: RwLock::new(Arc::new(snapshot)),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
        })
    }
}
