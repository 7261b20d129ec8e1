//! Per-type value index

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::content::{Entity, ScalarValue};
use crate::schema::ContentTypeSchema;

/// Maps property value → entity positions, for every indexable property.
///
/// Positions refer to the type's entity list (file order). Array properties
/// record one position per element, so a position may repeat when an array
/// holds the same value twice.
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    values: HashMap<String, BTreeMap<ScalarValue, Vec<usize>>>,
}

impl TypeIndex {
    pub fn build(schema: &ContentTypeSchema, entities: &[Arc<Entity>]) -> Self {
        let mut values: HashMap<String, BTreeMap<ScalarValue, Vec<usize>>> = schema
            .properties
            .iter()
            .filter(|p| p.kind.is_indexable())
            .map(|p| (p.name.clone(), BTreeMap::new()))
            .collect();

        for (position, entity) in entities.iter().enumerate() {
            for (name, buckets) in values.iter_mut() {
                let Some(value) = entity.get(name) else {
                    continue;
                };
                for key in value.index_values() {
                    buckets.entry(key).or_default().push(position);
                }
            }
        }

        Self { values }
    }

    /// Positions holding `value` for `property`, ascending
    pub fn lookup(&self, property: &str, value: &ScalarValue) -> &[usize] {
        self.values
            .get(property)
            .and_then(|buckets| buckets.get(value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All value buckets of a property, in value order
    pub fn buckets(&self, property: &str) -> Option<&BTreeMap<ScalarValue, Vec<usize>>> {
        self.values.get(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PropertyValue;
    use crate::schema::{PropertyDefinition, PropertyKind};
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn entity(slug: &str, tags: &[&str]) -> Arc<Entity> {
        let mut properties = IndexMap::new();
        properties.insert(
            "tags".to_string(),
            PropertyValue::StringArray(tags.iter().map(|t| t.to_string()).collect()),
        );
        Arc::new(Entity {
            slug: slug.into(),
            content_type: "blog".into(),
            properties,
            content: String::new(),
            section: Vec::new(),
            source: PathBuf::from(format!("{}.md", slug)),
            created_at: None,
            updated_at: None,
            modified: None,
        })
    }

    #[test]
    fn test_index_array_elements() {
        let schema = ContentTypeSchema::new("blog")
            .property(PropertyDefinition::required("tags", PropertyKind::StringArray))
            .property(PropertyDefinition::optional("title", PropertyKind::String));
        let entities = vec![entity("a", &["x", "y"]), entity("b", &["x"])];
        let index = TypeIndex::build(&schema, &entities);

        assert_eq!(index.lookup("tags", &"x".into()), &[0, 1]);
        assert_eq!(index.lookup("tags", &"y".into()), &[0]);
        assert!(index.lookup("tags", &"z".into()).is_empty());
        assert!(index.buckets("title").unwrap().is_empty());
        assert!(index.buckets("missing").is_none());
    }
}
