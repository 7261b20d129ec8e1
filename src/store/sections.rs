//! Section tree derived from folder structure

use indexmap::IndexMap;
use serde::Serialize;

use crate::content::Entity;

/// A section as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    pub path: String,
    pub label: String,
    /// Entities directly in this section
    pub entity_count: usize,
    /// Entities in this section and all descendants
    pub total_count: usize,
    pub children: Vec<SectionItem>,
}

#[derive(Debug, Clone, Default)]
struct SectionNode {
    path: Vec<String>,
    entity_count: usize,
    total_count: usize,
    children: IndexMap<String, SectionNode>,
}

impl SectionNode {
    fn to_item(&self) -> SectionItem {
        SectionItem {
            path: self.path.join("/"),
            label: self.path.last().map(|s| label_for(s)).unwrap_or_default(),
            entity_count: self.entity_count,
            total_count: self.total_count,
            children: self.children.values().map(SectionNode::to_item).collect(),
        }
    }
}

/// Hierarchy of sections for one content type; children keep first-seen order
#[derive(Debug, Clone, Default)]
pub struct SectionTree {
    root: SectionNode,
}

impl SectionTree {
    pub fn build<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut root = SectionNode::default();

        for entity in entities {
            let mut node = &mut root;
            node.total_count += 1;
            for segment in &entity.section {
                let path = node.path.clone();
                node = node
                    .children
                    .entry(segment.clone())
                    .or_insert_with(|| SectionNode {
                        path: path.into_iter().chain([segment.clone()]).collect(),
                        ..SectionNode::default()
                    });
                node.total_count += 1;
            }
            node.entity_count += 1;
        }

        Self { root }
    }

    /// Children of the section at `path`; `None` if no such section exists
    pub fn children(&self, path: &[&str]) -> Option<Vec<SectionItem>> {
        let mut node = &self.root;
        for segment in path {
            node = node.children.get(*segment)?;
        }
        Some(node.children.values().map(SectionNode::to_item).collect())
    }

    /// Number of entities at the root, outside any section
    pub fn root_entity_count(&self) -> usize {
        self.root.entity_count
    }
}

/// Split a `a/b/c` section path into segments, ignoring stray slashes
pub fn split_section_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Display label for a folder segment: `getting-started` → `Getting started`
fn label_for(segment: &str) -> String {
    let spaced = segment.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
