//! Immutable snapshot of the content set: entities, indexes and sections

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::index::TypeIndex;
use super::query::{
    CountPropertyRow, CountPropertyValuesRequest, EntityFilter, GetEntitiesRequest,
    GetEntityRequest, GetSectionsRequest, Operator, PageCursor, PaginatedResult, SortDirection,
};
use super::sections::{split_section_path, SectionItem, SectionTree};
use crate::config::PaginationConfig;
use crate::content::loader::load_folder;
use crate::content::{
    ContentFolder, Entity, EntityDraft, LinkTargets, MarkdownParser, Record, ScalarValue,
    SourceDocument,
};
use crate::error::{CmsError, ParseError, QueryError, Result};
use crate::schema::{ContentTypeRegistry, ContentTypeSchema, PropertyKind};

/// An internal reference that did not resolve during the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub content_type: String,
    pub slug: String,
    pub target: String,
}

/// Entities of one content type with their index and section tree
#[derive(Debug, Clone)]
pub struct TypeCollection {
    schema: Arc<ContentTypeSchema>,
    entities: Vec<Arc<Entity>>,
    by_slug: HashMap<String, usize>,
    index: TypeIndex,
    sections: SectionTree,
}

impl TypeCollection {
    fn new(schema: Arc<ContentTypeSchema>, entities: Vec<Arc<Entity>>) -> Self {
        let by_slug = entities
            .iter()
            .enumerate()
            .map(|(position, entity)| (entity.slug.clone(), position))
            .collect();
        let index = TypeIndex::build(&schema, &entities);
        let sections = SectionTree::build(entities.iter().map(Arc::as_ref));

        Self {
            schema,
            entities,
            by_slug,
            index,
            sections,
        }
    }

    pub fn schema(&self) -> &ContentTypeSchema {
        &self.schema
    }

    /// Entities in file order
    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Positions of the entities matching `filter`, in file order
    fn select(&self, filter: &EntityFilter) -> std::result::Result<Vec<usize>, QueryError> {
        let mut selected: Option<BTreeSet<usize>> = None;

        if let Some(slug) = &filter.slug {
            selected = Some(
                self.by_slug
                    .get(&slug.to_lowercase())
                    .copied()
                    .into_iter()
                    .collect(),
            );
        }

        for condition in &filter.conditions {
            let kind = self.indexable_kind(&condition.property)?;
            if condition.operator == Operator::Contains && *kind != PropertyKind::StringArray {
                return Err(QueryError::InvalidFilter(format!(
                    "contains requires a list property, {} is {}",
                    condition.property,
                    kind.describe()
                )));
            }

            let matched: BTreeSet<usize> = condition
                .operands()?
                .into_iter()
                .flat_map(|value| self.index.lookup(&condition.property, value))
                .copied()
                .collect();

            selected = Some(match selected {
                Some(current) => current.intersection(&matched).copied().collect(),
                None => matched,
            });
        }

        let mut positions: Vec<usize> = match selected {
            Some(set) => set.into_iter().collect(),
            None => (0..self.entities.len()).collect(),
        };

        if let Some(section) = &filter.section {
            let prefix = split_section_path(section);
            positions.retain(|&p| {
                let entity_section = &self.entities[p].section;
                entity_section.len() >= prefix.len()
                    && entity_section.iter().zip(&prefix).all(|(a, b)| a == b)
            });
        }

        Ok(positions)
    }

    /// Kind of a declared, filterable property
    fn indexable_kind(&self, property: &str) -> std::result::Result<&PropertyKind, QueryError> {
        let definition = self
            .schema
            .get(property)
            .ok_or_else(|| QueryError::UnknownProperty {
                content_type: self.schema.name.clone(),
                property: property.to_string(),
            })?;
        if !definition.kind.is_indexable() {
            return Err(QueryError::InvalidFilter(format!(
                "{} is {} and cannot be filtered or counted",
                property,
                definition.kind.describe()
            )));
        }
        Ok(&definition.kind)
    }

    /// Check that `property` can be used as a sort key
    fn check_sortable(&self, property: &str) -> std::result::Result<(), QueryError> {
        if matches!(property, "id" | "path" | "createdAt" | "updatedAt") {
            return Ok(());
        }
        match self.schema.get(property).map(|d| &d.kind) {
            None => Err(QueryError::UnknownProperty {
                content_type: self.schema.name.clone(),
                property: property.to_string(),
            }),
            Some(PropertyKind::String | PropertyKind::Number | PropertyKind::Bool) => Ok(()),
            Some(kind) => Err(QueryError::InvalidFilter(format!(
                "cannot sort by {}, it is {}",
                property,
                kind.describe()
            ))),
        }
    }
}

/// Compare two `(sort key, id)` entries; absent keys go last in both directions
fn compare_entries(
    a: (&Option<ScalarValue>, &str),
    b: (&Option<ScalarValue>, &str),
    direction: SortDirection,
) -> Ordering {
    let by_key = match (a.0, b.0) {
        (Some(x), Some(y)) => match direction {
            SortDirection::Asc => x.cmp(y),
            SortDirection::Desc => y.cmp(x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_key.then_with(|| a.1.cmp(b.1))
}

/// Complete, immutable result of one build pass
#[derive(Debug, Clone)]
pub struct Snapshot {
    types: IndexMap<String, TypeCollection>,
    broken_links: Vec<BrokenLink>,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    /// Scan every folder and build a snapshot; any failure aborts the build
    pub fn build(
        registry: &ContentTypeRegistry,
        folders: &[ContentFolder],
        parser: &MarkdownParser,
        generation: u64,
    ) -> Result<Self> {
        let mut documents = Vec::new();
        for folder in folders {
            let loaded = load_folder(folder)?;
            tracing::info!("Found {} documents in folder {}", loaded.len(), folder.name);
            documents.extend(
                loaded
                    .into_iter()
                    .map(|document| (document, folder.default_type.clone())),
            );
        }
        Self::from_documents(registry, documents, parser, generation)
    }

    /// Build a snapshot from already loaded documents
    pub fn from_documents(
        registry: &ContentTypeRegistry,
        documents: Vec<(SourceDocument, Option<String>)>,
        parser: &MarkdownParser,
        generation: u64,
    ) -> Result<Self> {
        let start = Instant::now();

        // Headers first, so every slug is known before links are rewritten
        let drafts = documents
            .par_iter()
            .map(|(document, default_type)| {
                parser
                    .read(document, default_type.as_deref(), registry)
                    .map_err(|e| CmsError::parse(&document.path, e))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<EntityDraft>>>()?;

        let mut seen: HashMap<(&str, &str), &PathBuf> = HashMap::new();
        let mut targets = LinkTargets::new();
        for draft in &drafts {
            let key = (draft.content_type.as_str(), draft.slug.as_str());
            if let Some(first) = seen.insert(key, &draft.source) {
                return Err(CmsError::parse(
                    &draft.source,
                    ParseError::DuplicateEntity {
                        content_type: draft.content_type.clone(),
                        slug: draft.slug.clone(),
                        first: first.clone(),
                    },
                ));
            }
            targets.insert(draft.link_target());
        }
        drop(seen);

        let parsed = drafts
            .into_par_iter()
            .map(|draft| {
                let source = draft.source.clone();
                parser
                    .finish(draft, &targets)
                    .map_err(|e| CmsError::parse(source, e))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let mut broken_links = Vec::new();
        let mut by_type: HashMap<String, Vec<Arc<Entity>>> = HashMap::new();
        for item in parsed {
            for target in item.unresolved {
                tracing::warn!(
                    "Unresolved link [[{}]] in {} {} ({:?})",
                    target,
                    item.entity.content_type,
                    item.entity.slug,
                    item.entity.source
                );
                broken_links.push(BrokenLink {
                    content_type: item.entity.content_type.clone(),
                    slug: item.entity.slug.clone(),
                    target,
                });
            }
            by_type
                .entry(item.entity.content_type.clone())
                .or_default()
                .push(Arc::new(item.entity));
        }

        let types: IndexMap<String, TypeCollection> = registry
            .iter()
            .map(|schema| {
                let entities = by_type.remove(&schema.name).unwrap_or_default();
                (
                    schema.name.clone(),
                    TypeCollection::new(schema.clone(), entities),
                )
            })
            .collect();

        let snapshot = Self {
            types,
            broken_links,
            generation,
            built_at: Utc::now(),
        };

        tracing::info!(
            "Built snapshot {}: {} entities across {} types in {:.2}s ({} broken links)",
            generation,
            snapshot.entity_count(),
            snapshot.types.len(),
            start.elapsed().as_secs_f64(),
            snapshot.broken_links.len()
        );

        Ok(snapshot)
    }

    /// Snapshot with every registered type and no entities
    pub fn empty(registry: &ContentTypeRegistry) -> Self {
        Self {
            types: registry
                .iter()
                .map(|schema| {
                    (
                        schema.name.clone(),
                        TypeCollection::new(schema.clone(), Vec::new()),
                    )
                })
                .collect(),
            broken_links: Vec::new(),
            generation: 0,
            built_at: Utc::now(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn broken_links(&self) -> &[BrokenLink] {
        &self.broken_links
    }

    pub fn entity_count(&self) -> usize {
        self.types.values().map(TypeCollection::len).sum()
    }

    /// Collections in registration order
    pub fn collections(&self) -> impl Iterator<Item = &TypeCollection> {
        self.types.values()
    }

    pub fn collection(&self, content_type: &str) -> std::result::Result<&TypeCollection, QueryError> {
        self.types
            .get(content_type)
            .ok_or_else(|| QueryError::UnknownType(content_type.to_string()))
    }

    /// Every entity of every type, in registration then file order
    pub fn entities(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.types.values().flat_map(|c| c.entities.iter())
    }

    /// Exactly one entity matching the filter
    pub fn get_entity(&self, request: &GetEntityRequest) -> std::result::Result<Record, QueryError> {
        let collection = self.collection(&request.content_type)?;
        let positions = collection.select(&request.filter)?;

        match positions.as_slice() {
            [] => Err(QueryError::NotFound(format!(
                "no {} entity matches the filter",
                request.content_type
            ))),
            [position] => Ok(collection.entities[*position].to_record(true)),
            many => Err(QueryError::AmbiguousResult {
                content_type: request.content_type.clone(),
                count: many.len(),
            }),
        }
    }

    /// One page of matching entities
    pub fn get_entities(
        &self,
        request: &GetEntitiesRequest,
        pagination: &PaginationConfig,
    ) -> std::result::Result<PaginatedResult<Record>, QueryError> {
        let collection = self.collection(&request.content_type)?;
        let positions = collection.select(&request.filter)?;
        let total = positions.len();

        // Without an explicit sort, file order is the sort key
        let direction = match &request.sort {
            Some(sort) => {
                collection.check_sortable(&sort.property)?;
                sort.direction
            }
            None => SortDirection::Asc,
        };
        let mut ordered: Vec<(Option<ScalarValue>, &Arc<Entity>)> = positions
            .into_iter()
            .map(|position| {
                let entity = &collection.entities[position];
                let key = match &request.sort {
                    Some(sort) => entity.sort_key(&sort.property),
                    None => Some(ScalarValue::Number(position as f64)),
                };
                (key, entity)
            })
            .collect();
        ordered.sort_by(|a, b| {
            compare_entries((&a.0, a.1.slug.as_str()), (&b.0, b.1.slug.as_str()), direction)
        });

        let start = match &request.page_token {
            Some(token) => {
                let cursor = PageCursor::decode(token)?;
                ordered.partition_point(|(key, entity)| {
                    compare_entries(
                        (key, entity.slug.as_str()),
                        (&cursor.key, cursor.id.as_str()),
                        direction,
                    )
                        != Ordering::Greater
                })
            }
            None => 0,
        };

        let page_size = pagination.clamp(request.page_size);
        let end = (start + page_size).min(ordered.len());
        let page = &ordered[start.min(end)..end];
        let has_more = end < ordered.len();

        let next_page_token = match page.last() {
            Some((key, entity)) if has_more => Some(
                PageCursor {
                    id: entity.slug.clone(),
                    key: key.clone(),
                }
                .encode(),
            ),
            _ => None,
        };

        Ok(PaginatedResult {
            items: page
                .iter()
                .map(|(_, entity)| entity.to_record(request.include_content))
                .collect(),
            has_more,
            next_page_token,
            total,
        })
    }

    /// Distinct values of a property with the number of entities holding each
    pub fn count_property_values(
        &self,
        request: &CountPropertyValuesRequest,
    ) -> std::result::Result<Vec<CountPropertyRow>, QueryError> {
        let collection = self.collection(&request.content_type)?;
        collection.indexable_kind(&request.property)?;

        let mut rows: Vec<CountPropertyRow> = if request.filter.is_empty() {
            collection
                .index
                .buckets(&request.property)
                .map(|buckets| {
                    buckets
                        .iter()
                        .map(|(value, positions)| CountPropertyRow {
                            value: value.clone(),
                            count: positions.len(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        } else {
            let mut counts: HashMap<ScalarValue, usize> = HashMap::new();
            for position in collection.select(&request.filter)? {
                if let Some(value) = collection.entities[position].get(&request.property) {
                    for key in value.index_values() {
                        *counts.entry(key).or_insert(0) += 1;
                    }
                }
            }
            counts
                .into_iter()
                .map(|(value, count)| CountPropertyRow { value, count })
                .collect()
        };

        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        Ok(rows)
    }

    /// Child sections of `root_path` (or of the top level)
    pub fn get_sections(
        &self,
        request: &GetSectionsRequest,
    ) -> std::result::Result<Vec<SectionItem>, QueryError> {
        let collection = self.collection(&request.content_type)?;
        let root = request.root_path.as_deref().unwrap_or("");
        collection
            .sections
            .children(&split_section_path(root))
            .ok_or_else(|| QueryError::NotFound(format!("section {}", root)))
    }
}
